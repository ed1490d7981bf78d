use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::OcrError;

/// OCR engine mode (`--oem`)
///
/// 0 legacy only, 1 LSTM only, 2 legacy + LSTM, 3 whatever is available.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub struct EngineMode(u8);

impl EngineMode {
    pub const MAX: u8 = 3;
    pub const DEFAULT: EngineMode = EngineMode(3);

    pub fn new(value: u8) -> Result<Self, OcrError> {
        if value > Self::MAX {
            return Err(OcrError::InvalidMode {
                kind: "engine mode",
                value,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for EngineMode {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for EngineMode {
    type Error = OcrError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EngineMode> for u8 {
    fn from(mode: EngineMode) -> Self {
        mode.0
    }
}

/// Page segmentation mode (`--psm`)
///
/// Modes 6 (uniform block) and 7 (single line) suit cropped regions; 3 is the
/// engine's own default for full pages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub struct SegmentationMode(u8);

impl SegmentationMode {
    pub const MAX: u8 = 13;
    pub const DEFAULT: SegmentationMode = SegmentationMode(6);

    pub fn new(value: u8) -> Result<Self, OcrError> {
        if value > Self::MAX {
            return Err(OcrError::InvalidMode {
                kind: "segmentation mode",
                value,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for SegmentationMode {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for SegmentationMode {
    type Error = OcrError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SegmentationMode> for u8 {
    fn from(mode: SegmentationMode) -> Self {
        mode.0
    }
}

/// External engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub binary: PathBuf,
    pub lang: String,
    pub engine_mode: EngineMode,
    pub segmentation_mode: SegmentationMode,
    /// Adds `-c tessedit_do_invert=0` to the base configuration
    pub disable_invert: bool,
    /// Per-call limit; `None` waits forever
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            lang: "eng".to_string(),
            engine_mode: EngineMode::DEFAULT,
            segmentation_mode: SegmentationMode::DEFAULT,
            disable_invert: true,
            timeout_ms: Some(30_000),
        }
    }
}

/// What a batch does when one item fails recognition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the batch on the first failure
    #[default]
    FailFast,
    /// Log the failure and return an empty string for that item
    Isolate,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on concurrent engine calls. `None` uses one worker per CPU.
    pub max_workers: Option<usize>,
    pub failure_policy: FailurePolicy,
}

/// Text post-processing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PostprocessConfig {
    /// Drop every character whose code point is >= 128
    pub ascii_only: bool,
}

/// Image transform selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessMode {
    #[default]
    Identity,
    Binarize,
}

/// Image preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub mode: PreprocessMode,
    pub scale_factor: f64,
    pub invert: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            mode: PreprocessMode::Identity,
            scale_factor: 1.0,
            invert: false,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: EngineConfig,
    pub dispatch: DispatchConfig,
    pub postprocess: PostprocessConfig,
    pub preprocessing: PreprocessingConfig,
}
