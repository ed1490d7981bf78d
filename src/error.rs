use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the batch OCR pipeline.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("batch is empty: pass at least one image")]
    EmptyBatch,

    #[error("failed to load image {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image {path:?}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode image for the engine: {0}")]
    Encode(#[source] image::ImageError),

    #[error("OCR engine {binary:?} could not be started: {source}")]
    EngineUnavailable {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine I/O failed: {0}")]
    EngineIo(#[source] std::io::Error),

    #[error("OCR engine exited with status {status:?}: {stderr}")]
    EngineFailed { status: Option<i32>, stderr: String },

    #[error("OCR engine did not answer within {timeout:?}")]
    EngineTimeout { timeout: Duration },

    #[error("recognition failed for batch item {index}: {source}")]
    Recognition {
        index: usize,
        #[source]
        source: Box<OcrError>,
    },

    #[error("batch finished with {missing} unfilled result slot(s)")]
    IncompleteBatch { missing: usize },

    #[error("invalid {kind} {value}: expected 0..={max}")]
    InvalidMode {
        kind: &'static str,
        value: u8,
        max: u8,
    },

    #[error("failed to build OCR worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("background recognition task failed: {0}")]
    TaskJoin(String),

    #[error("config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("could not determine the platform config directory")]
    NoConfigDir,

    #[error("unterminated {quote} quote in engine config {config:?}")]
    UnterminatedQuote { config: String, quote: char },

    #[error("engine error: {message}")]
    Engine { message: String },
}

impl OcrError {
    /// Free-form engine failure, for engine implementations without a richer error type.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Wrap a per-item failure with the index of the batch item that produced it.
    pub fn at_index(self, index: usize) -> Self {
        Self::Recognition {
            index,
            source: Box::new(self),
        }
    }

    /// Index of the failing batch item, when the error came out of a batch.
    pub fn item_index(&self) -> Option<usize> {
        match self {
            Self::Recognition { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_index_reports_item() {
        let err = OcrError::engine("boom").at_index(4);
        assert_eq!(err.item_index(), Some(4));
        assert_eq!(
            err.to_string(),
            "recognition failed for batch item 4: engine error: boom"
        );
    }

    #[test]
    fn test_plain_error_has_no_index() {
        assert_eq!(OcrError::EmptyBatch.item_index(), None);
    }
}
