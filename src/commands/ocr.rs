use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::OcrError;
use crate::models::image_input::ImageInput;
use crate::models::roi::PixelRect;
use crate::services::ocr::presets::{restriction_for, PRESET_NAMES};
use crate::services::ocr::BatchOcr;
use crate::services::roi_extractor::{FixedLayout, RoiExtractor};

/// Placeholder for "no preset" in positional preset lists
pub const NO_PRESET: &str = "-";

/// Recognized text of one layout region
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegionText {
    pub name: String,
    pub text: String,
    pub rect: PixelRect,
}

/// Turn positional preset names into per-item configs; `-` means no restriction
pub fn presets_to_configs(presets: &[String]) -> Vec<Option<String>> {
    presets
        .iter()
        .map(|name| {
            if name == NO_PRESET {
                return None;
            }
            if !PRESET_NAMES.contains(&name.as_str()) {
                warn!(preset = %name, "unknown preset, using base configuration");
            }
            Some(restriction_for(name))
        })
        .collect()
}

/// Recognize image files, one preset per image in order
pub fn run_batch(
    ocr: &BatchOcr,
    images: &[PathBuf],
    presets: &[String],
) -> Result<Vec<String>, OcrError> {
    let inputs: Vec<ImageInput> = images.iter().cloned().map(ImageInput::from).collect();
    let configs = presets_to_configs(presets);

    info!(images = inputs.len(), workers = ocr.max_workers(), "running batch");
    ocr.recognize_inputs(inputs, &configs)
}

/// Recognize the regions of `layout` in one image, optionally saving the debug overlay
pub fn run_roi(
    ocr: Arc<BatchOcr>,
    image: &Path,
    layout: &Path,
    overlay: Option<&Path>,
) -> Result<Vec<RegionText>, OcrError> {
    let source: DynamicImage = ImageInput::from(image).load()?;
    let layout = FixedLayout::load(layout)?;
    let names = layout.names();

    let extractor = RoiExtractor::new(layout, ocr).with_debug_overlay(overlay.is_some());
    let result = extractor.run_detailed(&source)?;

    if let (Some(path), Some(canvas)) = (overlay, result.overlay.as_ref()) {
        canvas.save(path).map_err(|source| OcrError::ImageSave {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = ?path, "overlay written");
    }

    Ok(names
        .into_iter()
        .zip(result.texts)
        .zip(result.rects)
        .map(|((name, text), rect)| RegionText { name, text, rect })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::OcrConfig;
    use crate::services::ocr::OcrEngine;
    use image::{Rgb, RgbImage};

    struct DimsEngine;

    impl OcrEngine for DimsEngine {
        fn name(&self) -> &'static str {
            "dims"
        }

        fn recognize_text(&self, image: &DynamicImage, config: &str) -> Result<String, OcrError> {
            let restricted = config.contains("whitelist");
            Ok(format!("{}x{} {}", image.width(), image.height(), restricted))
        }
    }

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ocr-dispatch-cmd-{}-{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
            .save(&path)
            .unwrap();
        path
    }

    fn ocr() -> Arc<BatchOcr> {
        Arc::new(BatchOcr::new(Arc::new(DimsEngine), &OcrConfig::default()).unwrap())
    }

    #[test]
    fn test_presets_to_configs() {
        let presets = vec!["num".to_string(), "-".to_string(), "bogus".to_string()];
        let configs = presets_to_configs(&presets);

        assert_eq!(configs[0].as_deref(), Some("tessedit_char_whitelist=0123456789"));
        assert_eq!(configs[1], None);
        assert_eq!(configs[2].as_deref(), Some(""));
    }

    #[test]
    fn test_run_batch_from_files() {
        let dir = test_dir("batch");
        let images = vec![
            write_image(&dir, "a.png", 12, 4),
            write_image(&dir, "b.png", 7, 3),
        ];

        let texts = run_batch(&ocr(), &images, &["num".to_string()]).unwrap();
        assert_eq!(texts, vec!["12x4 true", "7x3 false"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_batch_rejects_no_images() {
        let err = run_batch(&ocr(), &[], &[]).unwrap_err();
        assert!(matches!(err, OcrError::EmptyBatch));
    }

    #[test]
    fn test_run_roi_with_overlay() {
        let dir = test_dir("roi");
        let image = write_image(&dir, "page.png", 100, 50);
        let layout = dir.join("layout.json");
        std::fs::write(
            &layout,
            r#"{ "regions": [
                { "name": "id", "bbox": [[0.0, 0.0], [0.5, 0.5]], "preset": "num" },
                { "bbox": [[0.5, 0.5], [1.0, 1.0]] }
            ] }"#,
        )
        .unwrap();
        let overlay = dir.join("overlay.png");

        let regions = run_roi(ocr(), &image, &layout, Some(&overlay)).unwrap();

        assert_eq!(
            regions,
            vec![
                RegionText {
                    name: "id".into(),
                    text: "50x25 true".into(),
                    rect: PixelRect::new(0, 0, 50, 25),
                },
                RegionText {
                    name: "region_1".into(),
                    text: "50x25 false".into(),
                    rect: PixelRect::new(50, 25, 50, 25),
                },
            ]
        );
        assert!(overlay.exists(), "overlay should be written");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
