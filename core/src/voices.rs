//! Voice asset store.
//!
//! A voice is ready iff both its model (`<name>.onnx`) and metadata
//! (`<name>.onnx.json`) files exist under the storage directory. Disk
//! presence is the cache-validity test; there is no in-memory layer and
//! no refresh path. Concurrent first-use requests for the same voice may
//! race to fetch it; the end state is idempotent, so the duplicate
//! download is accepted rather than serialized.

use crate::process::{tail, ToolRunner};
use crate::{NarratorError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fallback when the voice metadata does not state a sample rate
/// (piper's medium-quality voices emit 22050 Hz).
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

const FETCH_STDERR_TAIL: usize = 1200;

pub struct VoiceStore {
    dir: PathBuf,
    python_bin: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl VoiceStore {
    pub fn new(dir: PathBuf, python_bin: PathBuf, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            dir,
            python_bin,
            runner,
        }
    }

    /// Create the storage directory if it does not exist yet.
    pub fn init(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    pub fn model_path(&self, voice: &str) -> PathBuf {
        self.dir.join(format!("{voice}.onnx"))
    }

    pub fn metadata_path(&self, voice: &str) -> PathBuf {
        self.dir.join(format!("{voice}.onnx.json"))
    }

    fn is_ready(&self, voice: &str) -> bool {
        self.model_path(voice).exists() && self.metadata_path(voice).exists()
    }

    /// Ensure `voice` is present locally, fetching it on first use.
    ///
    /// Returns the model path. Both files must exist afterwards; a fetch
    /// that exits zero but leaves either file missing still fails.
    pub async fn ensure(&self, voice: &str) -> Result<PathBuf> {
        let model = self.model_path(voice);
        if self.is_ready(voice) {
            debug!(target: "voices", voice, "Voice cache hit");
            return Ok(model);
        }

        info!(target: "voices", voice, dir = %self.dir.display(), "Fetching voice");
        let args = vec![
            "-m".to_string(),
            "piper.download_voices".to_string(),
            "--output-dir".to_string(),
            self.dir.display().to_string(),
            "--voice".to_string(),
            voice.to_string(),
        ];
        let out = self.runner.run(&self.python_bin, &args, None).await?;

        if !out.success() {
            warn!(target: "voices", voice, status = ?out.status_code, "Voice download tool failed");
            return Err(NarratorError::VoiceDownloadFailed {
                voice: voice.to_string(),
                details: tail(&out.stderr_lossy(), FETCH_STDERR_TAIL),
            });
        }
        if !self.is_ready(voice) {
            return Err(NarratorError::VoiceDownloadFailed {
                voice: voice.to_string(),
                details: "files not found after download".to_string(),
            });
        }

        info!(target: "voices", voice, "Voice ready");
        Ok(model)
    }

    /// Sample rate declared in the voice metadata (`audio.sample_rate`),
    /// or [`DEFAULT_SAMPLE_RATE`] when the file is unreadable.
    pub fn sample_rate(&self, voice: &str) -> u32 {
        read_sample_rate(&self.metadata_path(voice)).unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

fn read_sample_rate(path: &Path) -> Option<u32> {
    let raw = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
    value
        .pointer("/audio/sample_rate")
        .and_then(|n| n.as_u64())
        .map(|n| n as u32)
}
