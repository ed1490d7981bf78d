pub mod config;
pub mod image_input;
pub mod roi;
