// Narrator Core Library
// Text -> piper synthesis -> ffmpeg shaping pipeline

pub mod config;
pub mod options;
pub mod pipeline;
pub mod process;
pub mod shape;
pub mod synth;
pub mod voices;

// Export core types
pub use config::ServiceConfig;
pub use options::{OptionsFile, ShapingParams, TtsRequest, DEFAULT_VOICE};
pub use pipeline::Narrator;
pub use process::{ExecRunner, ToolOutput, ToolRunner};
pub use voices::VoiceStore;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarratorError {
    #[error("text parameter is missing or empty")]
    MissingText,

    #[error("voice download failed for '{voice}': {details}")]
    VoiceDownloadFailed { voice: String, details: String },

    #[error("synthesis failed for '{voice}': {details}")]
    SynthesisFailed { voice: String, details: String },

    #[error("shaping failed ({filter}): {details}")]
    ShapingFailed { filter: String, details: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NarratorError>;
