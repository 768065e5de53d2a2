//! Per-request option resolution.
//!
//! Resolution order for every parameter: explicit request value >
//! persisted options file value > hard-coded default. Numeric shaping
//! parameters are clamped to safe ranges; out-of-range input is never an
//! error.

use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Fallback voice when neither the request nor the options file names one.
pub const DEFAULT_VOICE: &str = "en_US-ryan-medium";

/// One `/tts` request after HTTP decoding.
#[derive(Debug, Clone, Default)]
pub struct TtsRequest {
    pub text: String,
    pub voice: Option<String>,
    pub length_scale: Option<f32>,
    pub noise_scale: Option<f32>,
    pub grit: Option<f32>,
    pub lowpass: Option<f32>,
    pub pitch: Option<f32>,
}

/// Persisted options file, a JSON object at a fixed path. Read fresh on
/// every request, never cached; an absent or malformed file is an empty
/// mapping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionsFile {
    pub voice: Option<String>,
    pub length_scale: Option<f32>,
    pub noise_scale: Option<f32>,
    pub grit: Option<f32>,
    pub lowpass: Option<f32>,
    pub pitch: Option<f32>,
}

impl OptionsFile {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(target: "options", path = %path.display(), error = %e, "Malformed options file; using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

/// Effective shaping knobs after resolution and clamping.
///
/// | knob         | default | range        |
/// |--------------|---------|--------------|
/// | length_scale | 1.1     | 0.5 - 2.0    |
/// | noise_scale  | 0.45    | 0.0 - 1.0    |
/// | grit         | 0.08    | 0.0 - 0.10   |
/// | lowpass      | 3200    | 2000 - 5000  |
/// | pitch        | 1.0     | 0.85 - 1.05  |
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingParams {
    pub length_scale: f32,
    pub noise_scale: f32,
    pub grit: f32,
    pub lowpass: f32,
    pub pitch: f32,
}

impl Default for ShapingParams {
    fn default() -> Self {
        Self {
            length_scale: 1.1,
            noise_scale: 0.45,
            grit: 0.08,
            lowpass: 3200.0,
            pitch: 1.0,
        }
    }
}

impl ShapingParams {
    pub fn resolve(request: &TtsRequest, opts: &OptionsFile) -> Self {
        let d = Self::default();
        Self {
            length_scale: request
                .length_scale
                .or(opts.length_scale)
                .unwrap_or(d.length_scale)
                .clamp(0.5, 2.0),
            noise_scale: request
                .noise_scale
                .or(opts.noise_scale)
                .unwrap_or(d.noise_scale)
                .clamp(0.0, 1.0),
            grit: request.grit.or(opts.grit).unwrap_or(d.grit).clamp(0.0, 0.10),
            lowpass: request
                .lowpass
                .or(opts.lowpass)
                .unwrap_or(d.lowpass)
                .clamp(2000.0, 5000.0),
            pitch: request
                .pitch
                .or(opts.pitch)
                .unwrap_or(d.pitch)
                .clamp(0.85, 1.05),
        }
    }
}

/// Effective voice name: request > options file > [`DEFAULT_VOICE`].
/// Empty strings count as unset.
pub fn resolve_voice(request: &TtsRequest, opts: &OptionsFile) -> String {
    non_empty(request.voice.as_deref())
        .or_else(|| non_empty(opts.voice.as_deref()))
        .unwrap_or(DEFAULT_VOICE)
        .to_string()
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}
