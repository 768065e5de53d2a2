//! Audio shaper: builds the fixed robotic filter chain and runs ffmpeg
//! over the raw synthesis output.
//!
//! Chain order: pitch pair (`asetrate` + inverse `atempo`, shifting pitch
//! without changing duration), high-pass, low-pass, compressor, bit-crush
//! mixed at the grit level.

use crate::options::ShapingParams;
use crate::process::{tail, ToolRunner};
use crate::synth::{has_min_size, MIN_WAV_BYTES};
use crate::{NarratorError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const HIGHPASS_HZ: u32 = 170;
const SHAPE_STDERR_TAIL: usize = 1600;

/// Render the filter-graph expression for the resolved knobs.
/// `sample_rate` is the source rate of the raw waveform.
pub fn filter_graph(params: &ShapingParams, sample_rate: u32) -> String {
    let rate = (sample_rate as f32 * params.pitch).round() as u32;
    let tempo = 1.0 / params.pitch;
    format!(
        "asetrate={rate},atempo={tempo:.4},highpass=f={HIGHPASS_HZ},lowpass=f={lowpass:.0},\
         acompressor=threshold=-18dB:ratio=4:attack=10:release=80:makeup=6,\
         acrusher=bits=12:mix={grit:.3}",
        lowpass = params.lowpass,
        grit = params.grit,
    )
}

pub struct Shaper {
    ffmpeg_bin: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl Shaper {
    pub fn new(ffmpeg_bin: PathBuf, runner: Arc<dyn ToolRunner>) -> Self {
        Self { ffmpeg_bin, runner }
    }

    /// Apply `filter` to `raw_wav`, writing the shaped waveform to
    /// `out_wav`.
    pub async fn shape(&self, raw_wav: &Path, out_wav: &Path, filter: &str) -> Result<()> {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            raw_wav.display().to_string(),
            "-af".to_string(),
            filter.to_string(),
            out_wav.display().to_string(),
        ];
        debug!(target: "shape", filter, "Running ffmpeg");
        let out = self.runner.run(&self.ffmpeg_bin, &args, None).await?;

        if !out.success() {
            return Err(NarratorError::ShapingFailed {
                filter: filter.to_string(),
                details: tail(&out.stderr_lossy(), SHAPE_STDERR_TAIL),
            });
        }
        if !has_min_size(out_wav, MIN_WAV_BYTES) {
            return Err(NarratorError::ShapingFailed {
                filter: filter.to_string(),
                details: "output file missing or too small".to_string(),
            });
        }
        Ok(())
    }
}
