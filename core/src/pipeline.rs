//! Request pipeline: resolve options, ensure the voice asset, synthesize,
//! shape, return the shaped bytes.
//!
//! One [`Narrator`] serves all requests. Per-request state lives on the
//! stack and in a scoped temp directory, so concurrent requests share
//! nothing but the read-fresh options file and the on-disk voice cache.

use crate::config::ServiceConfig;
use crate::options::{resolve_voice, OptionsFile, ShapingParams, TtsRequest};
use crate::process::{ExecRunner, ToolRunner};
use crate::shape::{filter_graph, Shaper};
use crate::synth::Synthesizer;
use crate::voices::VoiceStore;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct Narrator {
    config: ServiceConfig,
    voices: VoiceStore,
    synth: Synthesizer,
    shaper: Shaper,
}

impl Narrator {
    pub fn new(config: ServiceConfig) -> std::io::Result<Self> {
        let runner: Arc<dyn ToolRunner> = Arc::new(ExecRunner {
            timeout: config.tool_timeout_ms.map(Duration::from_millis),
        });
        Self::with_runner(config, runner)
    }

    /// Build with a caller-supplied runner; tests substitute a fake here.
    pub fn with_runner(config: ServiceConfig, runner: Arc<dyn ToolRunner>) -> std::io::Result<Self> {
        let voices = VoiceStore::new(
            config.voices_dir.clone(),
            config.python_bin.clone(),
            Arc::clone(&runner),
        );
        voices.init()?;
        let synth = Synthesizer::new(config.piper_bin.clone(), Arc::clone(&runner));
        let shaper = Shaper::new(config.ffmpeg_bin.clone(), runner);
        Ok(Self {
            config,
            voices,
            synth,
            shaper,
        })
    }

    /// Run the full pipeline for one request and return the shaped WAV
    /// bytes. Strictly sequential; any stage failure short-circuits.
    /// The raw and shaped temp files are removed on every exit path.
    pub async fn narrate(&self, request: &TtsRequest) -> Result<Vec<u8>> {
        let opts = OptionsFile::load(&self.config.options_path);
        let voice = resolve_voice(request, &opts);
        let params = ShapingParams::resolve(request, &opts);
        debug!(target: "pipeline", voice, ?params, "Resolved request options");

        let model = self.voices.ensure(&voice).await?;

        let workdir = tempfile::tempdir_in(&self.config.temp_dir)?;
        let raw_wav = workdir.path().join("raw.wav");
        let shaped_wav = workdir.path().join("shaped.wav");

        self.synth
            .synthesize(&request.text, &voice, &model, &params, &raw_wav)
            .await?;

        let filter = filter_graph(&params, self.voices.sample_rate(&voice));
        self.shaper.shape(&raw_wav, &shaped_wav, &filter).await?;

        let bytes = std::fs::read(&shaped_wav)?;
        info!(target: "pipeline", voice, bytes = bytes.len(), "Request narrated");
        Ok(bytes)
        // workdir drops here, deleting both temp WAVs
    }
}
