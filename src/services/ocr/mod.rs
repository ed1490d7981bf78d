pub mod config_resolver;
pub mod dispatcher;
pub mod engine;
pub mod preprocessing;
pub mod presets;
pub mod tesseract;

// Re-export main types
pub use config_resolver::ConfigResolver;
pub use dispatcher::BatchOcr;
pub use engine::OcrEngine;
pub use preprocessing::{Binarize, Identity, ImageTransform};
pub use tesseract::TesseractCli;
