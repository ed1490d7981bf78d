use image::DynamicImage;

use crate::error::OcrError;

/// OCR Engine trait - abstraction over the external recognizer
pub trait OcrEngine: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Recognize text in `image` using an engine-specific configuration string
    fn recognize_text(&self, image: &DynamicImage, config: &str) -> Result<String, OcrError>;

    /// Check if the engine can be invoked at all
    fn is_available(&self) -> bool {
        true
    }
}
