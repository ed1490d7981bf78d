pub mod config;
pub mod ocr;
pub mod roi_extractor;
