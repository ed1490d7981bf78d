use crate::models::config::EngineConfig;

/// Builds the per-item configuration string handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigResolver {
    base: String,
}

impl ConfigResolver {
    fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// `--oem <mode> --psm <mode>` plus the invert switch when enabled
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        let mut base = format!(
            "--oem {} --psm {}",
            config.engine_mode.value(),
            config.segmentation_mode.value()
        );
        if config.disable_invert {
            base.push_str(" -c tessedit_do_invert=0");
        }
        Self::new(base)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Configuration for item `index`.
    ///
    /// A missing, `None` or empty entry falls back to the base configuration.
    pub fn resolve<S: AsRef<str>>(&self, per_item: &[Option<S>], index: usize) -> String {
        match per_item.get(index).and_then(Option::as_ref) {
            Some(restriction) if !restriction.as_ref().is_empty() => {
                format!("{} -c '{}'", self.base, restriction.as_ref())
            }
            _ => self.base.clone(),
        }
    }
}
