pub mod config;
pub mod ocr;
