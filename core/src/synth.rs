//! Synthesis invoker: runs piper against a resolved voice model, feeding
//! the input text on stdin and collecting a raw WAV at a caller-chosen
//! path.

use crate::options::ShapingParams;
use crate::process::{tail, ToolRunner};
use crate::{NarratorError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Success requires a zero exit AND at least this many bytes of output;
/// the tool can exit zero while writing a truncated or empty file.
pub const MIN_WAV_BYTES: u64 = 256;

const SYNTH_STDERR_TAIL: usize = 1600;

pub struct Synthesizer {
    piper_bin: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl Synthesizer {
    pub fn new(piper_bin: PathBuf, runner: Arc<dyn ToolRunner>) -> Self {
        Self { piper_bin, runner }
    }

    /// Synthesize `text` with the model at `model`, writing the raw
    /// waveform to `out_wav`.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        model: &Path,
        params: &ShapingParams,
        out_wav: &Path,
    ) -> Result<()> {
        let args = vec![
            "--model".to_string(),
            model.display().to_string(),
            "--output_file".to_string(),
            out_wav.display().to_string(),
            "--length_scale".to_string(),
            format!("{:.2}", params.length_scale),
            "--noise_scale".to_string(),
            format!("{:.2}", params.noise_scale),
        ];
        debug!(target: "synth", voice, chars = text.len(), "Running piper");
        let out = self
            .runner
            .run(&self.piper_bin, &args, Some(text.as_bytes()))
            .await?;

        if !out.success() {
            return Err(NarratorError::SynthesisFailed {
                voice: voice.to_string(),
                details: tail(&out.stderr_lossy(), SYNTH_STDERR_TAIL),
            });
        }
        if !has_min_size(out_wav, MIN_WAV_BYTES) {
            return Err(NarratorError::SynthesisFailed {
                voice: voice.to_string(),
                details: "output file missing or too small".to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn has_min_size(path: &Path, floor: u64) -> bool {
    std::fs::metadata(path).map(|m| m.len() >= floor).unwrap_or(false)
}
