use image::{imageops, DynamicImage, GenericImageView, ImageBuffer, Luma};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::models::config::{PreprocessMode, PreprocessingConfig};

/// Upper bound on the pixel count of a rescaled image
const MAX_SCALED_PIXELS: f64 = (1u64 << 26) as f64;

/// Single-image normalization applied to every batch item before recognition.
///
/// Implementations must not fail: when a step does not apply they hand back
/// the input unchanged.
pub trait ImageTransform: Send + Sync {
    fn apply(&self, image: &DynamicImage) -> DynamicImage;
}

/// Leaves images untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ImageTransform for Identity {
    fn apply(&self, image: &DynamicImage) -> DynamicImage {
        image.clone()
    }
}

#[derive(Debug, Error, PartialEq)]
enum PreprocessError {
    #[error("image has no pixels ({0}x{1})")]
    EmptyImage(u32, u32),
    #[error("scale factor {0} is out of range for this image")]
    InvalidScale(f64),
}

/// Grayscale → scale → Otsu threshold (→ optional invert)
#[derive(Debug, Clone)]
pub struct Binarize {
    config: PreprocessingConfig,
}

impl Binarize {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    fn try_apply(&self, image: &DynamicImage) -> Result<DynamicImage, PreprocessError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PreprocessError::EmptyImage(width, height));
        }

        let gray = self.to_grayscale(image);
        let scaled = self.scale(&gray, self.config.scale_factor)?;
        let binary = self.threshold(&scaled);

        if self.config.invert {
            Ok(self.invert(&binary))
        } else {
            Ok(binary)
        }
    }

    /// Convert image to grayscale
    pub fn to_grayscale(&self, image: &DynamicImage) -> DynamicImage {
        DynamicImage::ImageLuma8(image.to_luma8())
    }

    /// Scale image by factor; a factor of 1.0 is a no-op
    fn scale(&self, image: &DynamicImage, factor: f64) -> Result<DynamicImage, PreprocessError> {
        if factor == 1.0 {
            return Ok(image.clone());
        }
        if !factor.is_finite() || factor <= 0.0 {
            return Err(PreprocessError::InvalidScale(factor));
        }

        let (width, height) = image.dimensions();
        let new_width = (width as f64 * factor).floor();
        let new_height = (height as f64 * factor).floor();
        if new_width < 1.0 || new_height < 1.0 || new_width * new_height > MAX_SCALED_PIXELS {
            return Err(PreprocessError::InvalidScale(factor));
        }

        Ok(image.resize_exact(
            new_width as u32,
            new_height as u32,
            imageops::FilterType::Lanczos3,
        ))
    }

    /// Apply binary thresholding (Otsu's method)
    pub fn threshold(&self, image: &DynamicImage) -> DynamicImage {
        use imageproc::contrast::otsu_level;

        let gray_img = image.to_luma8();
        let threshold_value = otsu_level(&gray_img);

        let binary = ImageBuffer::from_fn(gray_img.width(), gray_img.height(), |x, y| {
            if gray_img.get_pixel(x, y)[0] > threshold_value {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        DynamicImage::ImageLuma8(binary)
    }

    /// White text becomes black, black becomes white
    pub fn invert(&self, image: &DynamicImage) -> DynamicImage {
        let mut img = image.clone();
        img.invert();
        img
    }
}

impl ImageTransform for Binarize {
    fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match self.try_apply(image) {
            Ok(processed) => processed,
            Err(e) => {
                debug!(error = %e, "preprocessing skipped, using original image");
                image.clone()
            }
        }
    }
}

/// Transform selected by configuration
pub fn transform_from_config(config: &PreprocessingConfig) -> Arc<dyn ImageTransform> {
    match config.mode {
        PreprocessMode::Identity => Arc::new(Identity),
        PreprocessMode::Binarize => Arc::new(Binarize::new(config.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn create_test_rgb_image() -> DynamicImage {
        let img = RgbImage::from_fn(100, 50, |x, y| {
            let val = ((x + y) % 256) as u8;
            Rgb([val, val, val])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn binarize(scale_factor: f64, invert: bool) -> Binarize {
        Binarize::new(PreprocessingConfig {
            mode: PreprocessMode::Binarize,
            scale_factor,
            invert,
        })
    }

    #[test]
    fn test_identity_returns_same_pixels() {
        let image = create_test_rgb_image();
        assert_eq!(Identity.apply(&image), image);
    }

    #[test]
    fn test_binarize_output_is_binary() {
        let processed = binarize(1.0, false).apply(&create_test_rgb_image());

        match processed {
            DynamicImage::ImageLuma8(ref img) => {
                for pixel in img.pixels() {
                    let val = pixel[0];
                    assert!(val == 0 || val == 255, "Pixel value should be 0 or 255, got {}", val);
                }
            }
            _ => panic!("Expected Luma8 image after thresholding"),
        }
        assert_eq!(processed.dimensions(), (100, 50), "Dimensions should be preserved");
    }

    #[test]
    fn test_binarize_scales() {
        let processed = binarize(2.0, false).apply(&create_test_rgb_image());
        assert_eq!(processed.width(), 200, "Should be scaled 2x");
        assert_eq!(processed.height(), 100, "Should be scaled 2x");
    }

    #[test]
    fn test_binarize_invert_flips_pixels() {
        let image = create_test_rgb_image();
        let plain = binarize(1.0, false).apply(&image).to_luma8();
        let inverted = binarize(1.0, true).apply(&image).to_luma8();

        for (a, b) in plain.pixels().zip(inverted.pixels()) {
            assert_eq!(a[0], 255 - b[0]);
        }
    }

    #[test]
    fn test_binarize_fails_open_on_empty_image() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let processed = binarize(1.0, false).apply(&empty);
        assert_eq!(processed, empty);
    }

    #[test]
    fn test_binarize_fails_open_on_invalid_scale() {
        let image = create_test_rgb_image();
        for factor in [0.0, -1.0, f64::NAN, 0.001] {
            let processed = binarize(factor, false).apply(&image);
            assert_eq!(processed, image, "factor {} should leave the image untouched", factor);
        }
    }

    #[test]
    fn test_binarize_fails_open_on_oversized_scale() {
        let image = create_test_rgb_image();
        for factor in [1e12, 1e6, f64::MAX] {
            let processed = binarize(factor, false).apply(&image);
            assert_eq!(processed, image, "factor {} should leave the image untouched", factor);
        }
    }

    #[test]
    fn test_binarize_accepts_scale_within_budget() {
        let processed = binarize(10.0, false).apply(&create_test_rgb_image());
        assert_eq!(processed.dimensions(), (1000, 500));
    }

    #[test]
    fn test_transform_does_not_mutate_input() {
        let image = create_test_rgb_image();
        let before = image.clone();
        let _ = binarize(2.0, true).apply(&image);
        assert_eq!(image, before);
    }

    #[test]
    fn test_transform_from_config() {
        let image = create_test_rgb_image();

        let identity = transform_from_config(&PreprocessingConfig::default());
        assert!(matches!(identity.apply(&image), DynamicImage::ImageRgb8(_)));

        let config = PreprocessingConfig {
            mode: PreprocessMode::Binarize,
            ..PreprocessingConfig::default()
        };
        let binary = transform_from_config(&config);
        assert!(matches!(binary.apply(&image), DynamicImage::ImageLuma8(_)));
    }
}
