use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::error::OcrError;

/// One batch input: an already decoded image or a path to decode.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Decoded(DynamicImage),
    Path(PathBuf),
}

impl ImageInput {
    /// Decode (if needed) into an image ready for dispatch
    pub fn load(self) -> Result<DynamicImage, OcrError> {
        match self {
            Self::Decoded(image) => Ok(image),
            Self::Path(path) => {
                image::open(&path).map_err(|source| OcrError::ImageLoad { path, source })
            }
        }
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        Self::Decoded(image)
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageInput {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for ImageInput {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}
