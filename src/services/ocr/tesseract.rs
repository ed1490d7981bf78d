use image::DynamicImage;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::engine::OcrEngine;
use crate::error::OcrError;
use crate::models::config::EngineConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Tesseract OCR engine driven through its command line.
///
/// Every call spawns its own process, so one instance is safe to share across workers.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    lang: String,
    timeout: Option<Duration>,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, lang: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            lang: lang.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.binary.clone(), config.lang.clone())
            .with_timeout(config.timeout_ms.map(Duration::from_millis))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full argument list: read the image from stdin, write text to stdout
    fn build_args(&self, config: &str) -> Result<Vec<String>, OcrError> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.lang.clone(),
        ];
        args.extend(split_config_args(config)?);
        Ok(args)
    }

    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, OcrError> {
        let mut img_bytes: Vec<u8> = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut img_bytes), image::ImageFormat::Png)
            .map_err(OcrError::Encode)?;
        Ok(img_bytes)
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, OcrError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(OcrError::EngineIo);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(OcrError::EngineIo)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // Already-exited races are fine: kill then reap
                let _ = child.kill();
                let _ = child.wait();
                return Err(OcrError::EngineTimeout { timeout });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize_text(&self, image: &DynamicImage, config: &str) -> Result<String, OcrError> {
        let args = self.build_args(config)?;
        let img_bytes = Self::encode_png(image)?;
        trace!(binary = ?self.binary, ?args, "spawning tesseract");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OcrError::EngineUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        // Feed and drain on helper threads so a full pipe never blocks the child
        let mut stdin = child.stdin.take().ok_or_else(|| OcrError::engine("stdin not captured"))?;
        let writer = thread::spawn(move || stdin.write_all(&img_bytes));

        let mut stdout = child.stdout.take().ok_or_else(|| OcrError::engine("stdout not captured"))?;
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let mut stderr = child.stderr.take().ok_or_else(|| OcrError::engine("stderr not captured"))?;
        let err_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        });

        let status = self.wait(&mut child)?;

        let write_result = writer
            .join()
            .map_err(|_| OcrError::engine("stdin writer panicked"))?;
        let out = reader
            .join()
            .map_err(|_| OcrError::engine("stdout reader panicked"))?
            .map_err(OcrError::EngineIo)?;
        let err = err_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(OcrError::EngineFailed {
                status: status.code(),
                stderr: String::from_utf8_lossy(&err).trim().to_string(),
            });
        }
        // A broken pipe only matters when the engine also failed
        if let Err(e) = write_result {
            debug!(error = %e, "tesseract closed stdin early");
        }

        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Split a configuration string into arguments the way a POSIX shell would for
/// plain words and quoted groups: `-c 'a=b c'` yields `["-c", "a=b c"]`.
///
/// An unterminated quote is an error.
pub fn split_config_args(config: &str) -> Result<Vec<String>, OcrError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in config.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if let Some(quote) = quote {
        return Err(OcrError::UnterminatedQuote {
            config: config.to_string(),
            quote,
        });
    }
    if in_token {
        args.push(current);
    }

    Ok(args)
}
