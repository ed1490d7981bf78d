pub mod commands;
pub mod error;
pub mod models;
pub mod services;

pub use error::OcrError;
pub use models::config::OcrConfig;
pub use models::image_input::ImageInput;
pub use models::roi::{PixelRect, RatioBox};
pub use services::ocr::{BatchOcr, ImageTransform, OcrEngine, TesseractCli};
pub use services::roi_extractor::{FixedLayout, RegionDetector, RoiExtractor};
