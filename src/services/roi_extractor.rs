use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::OcrError;
use crate::models::roi::{PixelRect, RatioBox};
use crate::services::ocr::dispatcher::BatchOcr;
use crate::services::ocr::presets::resolve_presets;

const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Source of text regions and the preset applied to each.
///
/// Assumes text sits at the same relative position in every image it is used on.
pub trait RegionDetector: Send + Sync {
    /// Regions as ratios of the image size, in output order
    fn regions(&self) -> Vec<RatioBox>;

    /// Preset name per region (see [`crate::services::ocr::presets`]); may be shorter
    /// than `regions()`
    fn config_names(&self) -> Vec<String>;
}

/// One named region of a [`FixedLayout`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutRegion {
    #[serde(default)]
    pub name: Option<String>,
    pub bbox: RatioBox,
    #[serde(default)]
    pub preset: Option<String>,
}

/// Region detector backed by a static list, usually loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FixedLayout {
    pub regions: Vec<LayoutRegion>,
}

impl FixedLayout {
    pub fn new(regions: Vec<LayoutRegion>) -> Self {
        Self { regions }
    }

    /// Load a layout file
    pub fn load(path: &Path) -> Result<Self, OcrError> {
        let content = std::fs::read_to_string(path).map_err(|source| OcrError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Region names, falling back to `region_<index>`
    pub fn names(&self) -> Vec<String> {
        self.regions
            .iter()
            .enumerate()
            .map(|(i, r)| r.name.clone().unwrap_or_else(|| format!("region_{i}")))
            .collect()
    }
}

impl RegionDetector for FixedLayout {
    fn regions(&self) -> Vec<RatioBox> {
        self.regions.iter().map(|r| r.bbox).collect()
    }

    fn config_names(&self) -> Vec<String> {
        self.regions
            .iter()
            .map(|r| r.preset.clone().unwrap_or_default())
            .collect()
    }
}

/// Cropped regions ready for dispatch
pub struct RoiCrops {
    pub rects: Vec<PixelRect>,
    pub images: Vec<DynamicImage>,
    /// Source image with every rectangle outlined, when the debug overlay is on
    pub overlay: Option<RgbImage>,
}

/// Texts per region together with where they were read
#[derive(Debug)]
pub struct RoiRecognition {
    pub texts: Vec<String>,
    pub rects: Vec<PixelRect>,
    pub overlay: Option<RgbImage>,
}

/// Crops detector regions out of an image and recognizes them as one batch
pub struct RoiExtractor<D: RegionDetector> {
    detector: D,
    ocr: Arc<BatchOcr>,
    draw: bool,
}

impl<D: RegionDetector> RoiExtractor<D> {
    pub fn new(detector: D, ocr: Arc<BatchOcr>) -> Self {
        Self {
            detector,
            ocr,
            draw: false,
        }
    }

    /// Outline each region on a copy of the source image
    pub fn with_debug_overlay(mut self, draw: bool) -> Self {
        self.draw = draw;
        self
    }

    /// Compute pixel rectangles and crop them from `image`
    pub fn crop_regions(&self, image: &DynamicImage) -> RoiCrops {
        let (width, height) = (image.width(), image.height());

        let rects: Vec<PixelRect> = self
            .detector
            .regions()
            .iter()
            .map(|region| region.to_pixel_rect(width, height))
            .collect();

        let images = rects
            .iter()
            .map(|r| image.crop_imm(r.x, r.y, r.width, r.height))
            .collect();

        let overlay = self.draw.then(|| draw_overlay(image, &rects));

        RoiCrops {
            rects,
            images,
            overlay,
        }
    }

    /// Recognize every region; results follow the detector's region order
    pub fn run(&self, image: &DynamicImage) -> Result<Vec<String>, OcrError> {
        Ok(self.run_detailed(image)?.texts)
    }

    /// Like [`run`](Self::run), also returning rectangles and the debug overlay
    pub fn run_detailed(&self, image: &DynamicImage) -> Result<RoiRecognition, OcrError> {
        let crops = self.crop_regions(image);

        let preset_names = self.detector.config_names();
        if preset_names.len() != crops.rects.len() {
            warn!(
                regions = crops.rects.len(),
                presets = preset_names.len(),
                "region and preset counts differ"
            );
        }
        let configs = resolve_presets(&preset_names);
        debug!(regions = crops.rects.len(), "recognizing regions");

        let texts = self.ocr.recognize(&crops.images, &configs)?;

        Ok(RoiRecognition {
            texts,
            rects: crops.rects,
            overlay: crops.overlay,
        })
    }
}

fn draw_overlay(image: &DynamicImage, rects: &[PixelRect]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for r in rects.iter().filter(|r| !r.is_empty()) {
        let rect = Rect::at(r.x as i32, r.y as i32).of_size(r.width, r.height);
        draw_hollow_rect_mut(&mut canvas, rect, OVERLAY_COLOR);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::OcrConfig;
    use crate::services::ocr::engine::OcrEngine;
    use parking_lot::Mutex;

    /// Reports crop size and whatever restriction it was given
    struct SizeEngine {
        configs: Mutex<Vec<String>>,
    }

    impl OcrEngine for SizeEngine {
        fn name(&self) -> &'static str {
            "size"
        }

        fn recognize_text(&self, image: &DynamicImage, config: &str) -> Result<String, OcrError> {
            self.configs.lock().push(config.to_string());
            Ok(format!("{}x{}", image.width(), image.height()))
        }
    }

    fn extractor(layout: FixedLayout) -> (RoiExtractor<FixedLayout>, Arc<SizeEngine>) {
        let engine = Arc::new(SizeEngine {
            configs: Mutex::new(Vec::new()),
        });
        let ocr = Arc::new(BatchOcr::new(engine.clone(), &OcrConfig::default()).unwrap());
        (RoiExtractor::new(layout, ocr), engine)
    }

    fn region(bbox: RatioBox, preset: Option<&str>) -> LayoutRegion {
        LayoutRegion {
            name: None,
            bbox,
            preset: preset.map(str::to_string),
        }
    }

    fn white_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    #[test]
    fn test_crop_regions_exact_pixels() {
        let layout = FixedLayout::new(vec![
            region(RatioBox::from_corners((0.1, 0.2), (0.5, 0.6)), None),
            region(RatioBox::from_corners((-0.1, 0.0), (1.2, 1.0)), None),
        ]);
        let (extractor, _) = extractor(layout);

        let crops = extractor.crop_regions(&white_image(100, 100));

        assert_eq!(crops.rects[0].bounds(), (10, 20, 50, 60));
        assert_eq!(crops.rects[1].bounds(), (0, 0, 100, 100));
        assert_eq!(crops.images[0].width(), 40);
        assert_eq!(crops.images[0].height(), 40);
        assert!(crops.overlay.is_none());
    }

    #[test]
    fn test_run_uses_presets_per_region() {
        let layout = FixedLayout::new(vec![
            region(RatioBox::from_corners((0.0, 0.0), (0.5, 0.5)), Some("num")),
            region(RatioBox::from_corners((0.5, 0.5), (1.0, 1.0)), Some("unknown")),
        ]);
        let (extractor, engine) = extractor(layout);
        let base = extractor.ocr.base_config().to_string();

        let texts = extractor.run(&white_image(80, 40)).unwrap();

        assert_eq!(texts, vec!["40x20", "40x20"]);
        let mut configs = engine.configs.lock().clone();
        configs.sort();
        let mut expected = vec![
            format!("{base} -c 'tessedit_char_whitelist=0123456789'"),
            base.clone(),
        ];
        expected.sort();
        assert_eq!(configs, expected);
    }

    #[test]
    fn test_run_keeps_region_order() {
        let regions = (0..6)
            .map(|i| {
                let right = 0.1 * (i + 1) as f64;
                region(RatioBox::new(0.0, 0.0, right, 1.0), None)
            })
            .collect();
        let (extractor, _) = extractor(FixedLayout::new(regions));

        let texts = extractor.run(&white_image(100, 10)).unwrap();

        assert_eq!(texts, vec!["10x10", "20x10", "30x10", "40x10", "50x10", "60x10"]);
    }

    #[test]
    fn test_degenerate_region_yields_empty_text() {
        let layout = FixedLayout::new(vec![region(RatioBox::new(0.7, 0.7, 0.2, 0.2), Some("num"))]);
        let (extractor, engine) = extractor(layout);

        let texts = extractor.run(&white_image(50, 50)).unwrap();

        assert_eq!(texts, vec![""]);
        assert!(engine.configs.lock().is_empty());
    }

    #[test]
    fn test_debug_overlay_does_not_touch_crops() {
        let layout = FixedLayout::new(vec![region(RatioBox::new(0.2, 0.2, 0.8, 0.8), None)]);
        let (extractor, _) = extractor(layout);
        let extractor = extractor.with_debug_overlay(true);
        let source = white_image(50, 50);

        let crops = extractor.crop_regions(&source);
        let overlay = crops.overlay.expect("overlay should be drawn");

        assert_eq!(overlay.get_pixel(10, 10), &OVERLAY_COLOR);
        assert_eq!(overlay.get_pixel(25, 25), &Rgb([255, 255, 255]));
        for pixel in crops.images[0].to_rgb8().pixels() {
            assert_eq!(pixel, &Rgb([255, 255, 255]), "crop must come from the clean source");
        }
        assert_eq!(source.to_rgb8().get_pixel(10, 10), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_run_detailed_returns_rects() {
        let layout = FixedLayout::new(vec![region(RatioBox::new(0.0, 0.5, 1.0, 1.0), None)]);
        let (extractor, _) = extractor(layout);

        let result = extractor.run_detailed(&white_image(20, 20)).unwrap();

        assert_eq!(result.texts, vec!["20x10"]);
        assert_eq!(result.rects, vec![PixelRect::new(0, 10, 20, 10)]);
        assert!(result.overlay.is_none());
    }

    #[test]
    fn test_layout_from_json() {
        let json = r#"{
            "regions": [
                { "name": "order", "bbox": [[0.14, 0.0], [0.59, 0.18]], "preset": "alphanum_space" },
                { "bbox": [[0.0, 0.5], [0.3, 0.6]] }
            ]
        }"#;
        let layout: FixedLayout = serde_json::from_str(json).unwrap();

        assert_eq!(layout.regions().len(), 2);
        assert_eq!(layout.config_names(), vec!["alphanum_space", ""]);
        assert_eq!(layout.names(), vec!["order", "region_1"]);
        assert_eq!(layout.regions()[0], RatioBox::new(0.14, 0.0, 0.59, 0.18));
    }

    #[test]
    fn test_layout_load_missing_file() {
        let err = FixedLayout::load(Path::new("/no/such/layout.json")).unwrap_err();
        assert!(matches!(err, OcrError::ConfigIo { .. }));
    }
}
