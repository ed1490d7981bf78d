use image::DynamicImage;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::config_resolver::ConfigResolver;
use super::engine::OcrEngine;
use super::preprocessing::{transform_from_config, ImageTransform};
use super::tesseract::TesseractCli;
use crate::error::OcrError;
use crate::models::config::{FailurePolicy, OcrConfig};
use crate::models::image_input::ImageInput;

/// One slot per batch item, filled exactly once by the worker owning that index
struct ResultSlots {
    slots: Mutex<Vec<Option<String>>>,
}

impl ResultSlots {
    fn new(len: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; len]),
        }
    }

    fn fill(&self, index: usize, text: String) {
        let mut slots = self.slots.lock();
        debug_assert!(slots[index].is_none(), "slot {index} filled twice");
        slots[index] = Some(text);
    }

    /// Results in input order; errors if any slot is still empty
    fn into_ordered(self) -> Result<Vec<String>, OcrError> {
        let slots = self.slots.into_inner();
        let missing = slots.iter().filter(|slot| slot.is_none()).count();
        if missing > 0 {
            return Err(OcrError::IncompleteBatch { missing });
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

/// Parallel batch recognizer.
///
/// Each call transforms every image, resolves its configuration, runs one engine
/// call per image on a bounded worker pool and returns the texts in input order.
/// Nothing is kept between calls.
pub struct BatchOcr {
    engine: Arc<dyn OcrEngine>,
    transform: Arc<dyn ImageTransform>,
    resolver: ConfigResolver,
    pool: ThreadPool,
    failure_policy: FailurePolicy,
    ascii_only: bool,
}

impl BatchOcr {
    /// Create a batch recognizer around `engine`, configured from `config`
    pub fn new(engine: Arc<dyn OcrEngine>, config: &OcrConfig) -> Result<Self, OcrError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.dispatch.max_workers.unwrap_or(0))
            .thread_name(|i| format!("ocr-worker-{i}"))
            .build()?;

        Ok(Self {
            engine,
            transform: transform_from_config(&config.preprocessing),
            resolver: ConfigResolver::from_engine_config(&config.engine),
            pool,
            failure_policy: config.dispatch.failure_policy,
            ascii_only: config.postprocess.ascii_only,
        })
    }

    /// Batch recognizer backed by the tesseract command line
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let engine = TesseractCli::from_config(&config.engine);
        Self::new(Arc::new(engine), config)
    }

    /// Replace the configured image transform
    pub fn with_transform(mut self, transform: Arc<dyn ImageTransform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn engine(&self) -> &dyn OcrEngine {
        self.engine.as_ref()
    }

    pub fn base_config(&self) -> &str {
        self.resolver.base()
    }

    pub fn max_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Recognize every image; `per_item[i]` restricts image `i`.
    ///
    /// `per_item` may be shorter than `images`; missing entries use the base
    /// configuration. An empty batch returns an empty vector.
    pub fn recognize(
        &self,
        images: &[DynamicImage],
        per_item: &[Option<String>],
    ) -> Result<Vec<String>, OcrError> {
        if images.is_empty() {
            debug!("empty batch, nothing to recognize");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let batch_len = images.len();
        debug!(
            batch_len,
            configs = per_item.len(),
            engine = self.engine.name(),
            "dispatching batch"
        );

        let configs: Vec<String> = (0..batch_len)
            .map(|index| self.resolver.resolve(per_item, index))
            .collect();

        let slots = ResultSlots::new(batch_len);
        let aborted = AtomicBool::new(false);
        let first_error: Mutex<Option<OcrError>> = Mutex::new(None);

        self.pool.install(|| {
            let transformed: Vec<DynamicImage> = images
                .par_iter()
                .map(|image| self.transform.apply(image))
                .collect();

            // Err(()) only short-circuits rayon; the real error sits in `first_error`
            let _ = transformed
                .par_iter()
                .zip(configs.par_iter())
                .enumerate()
                .try_for_each(|(index, (image, config))| {
                    if aborted.load(Ordering::Acquire) {
                        return Err(());
                    }

                    match self.recognize_one(image, config) {
                        Ok(text) => {
                            slots.fill(index, text);
                            Ok(())
                        }
                        Err(e) => match self.failure_policy {
                            FailurePolicy::FailFast => {
                                aborted.store(true, Ordering::Release);
                                first_error.lock().get_or_insert(e.at_index(index));
                                Err(())
                            }
                            FailurePolicy::Isolate => {
                                warn!(index, error = %e, "recognition failed, substituting empty text");
                                slots.fill(index, String::new());
                                Ok(())
                            }
                        },
                    }
                });
        });

        if let Some(e) = first_error.into_inner() {
            warn!(error = %e, "batch aborted");
            return Err(e);
        }

        let results = slots.into_ordered()?;
        info!(
            batch_len,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch recognized"
        );
        Ok(results)
    }

    /// Decode every input, then [`recognize`](Self::recognize) them.
    ///
    /// Unlike `recognize`, an empty batch is rejected.
    pub fn recognize_inputs(
        &self,
        inputs: Vec<ImageInput>,
        per_item: &[Option<String>],
    ) -> Result<Vec<String>, OcrError> {
        if inputs.is_empty() {
            return Err(OcrError::EmptyBatch);
        }

        let images = inputs
            .into_iter()
            .map(ImageInput::load)
            .collect::<Result<Vec<_>, _>>()?;

        self.recognize(&images, per_item)
    }

    /// Run [`recognize`](Self::recognize) on tokio's blocking pool
    pub async fn recognize_async(
        self: Arc<Self>,
        images: Vec<DynamicImage>,
        per_item: Vec<Option<String>>,
    ) -> Result<Vec<String>, OcrError> {
        tokio::task::spawn_blocking(move || self.recognize(&images, &per_item))
            .await
            .map_err(|e| OcrError::TaskJoin(e.to_string()))?
    }

    fn recognize_one(&self, image: &DynamicImage, config: &str) -> Result<String, OcrError> {
        // Degenerate crops carry no text; the engine would reject them anyway
        if image.width() == 0 || image.height() == 0 {
            return Ok(String::new());
        }

        let raw = self.engine.recognize_text(image, config)?;
        Ok(postprocess(&raw, self.ascii_only))
    }
}

/// Trim surrounding whitespace, then optionally drop non-ASCII characters
pub fn postprocess(raw: &str, ascii_only: bool) -> String {
    let trimmed = raw.trim();
    if ascii_only {
        trimmed.chars().filter(char::is_ascii).collect()
    } else {
        trimmed.to_string()
    }
}
