use std::path::PathBuf;

/// Process-wide service configuration.
///
/// Values come from environment variables with hard-coded fallbacks.
/// Per-request tuning (voice, shaping knobs) lives in the options file
/// instead, see [`crate::options::OptionsFile`].
///
/// Env overrides:
/// - NARRATOR_OPTIONS_PATH, NARRATOR_VOICES_DIR, NARRATOR_TEMP_DIR
/// - NARRATOR_PIPER_BIN, NARRATOR_FFMPEG_BIN, NARRATOR_PYTHON_BIN
/// - NARRATOR_TOOL_TIMEOUT_MS (unset = external tools may block forever)
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Options file read fresh on every request.
    pub options_path: PathBuf,
    /// Directory holding `<voice>.onnx` / `<voice>.onnx.json` pairs.
    pub voices_dir: PathBuf,
    /// Root for per-request scratch directories.
    pub temp_dir: PathBuf,
    /// piper CLI binary.
    pub piper_bin: PathBuf,
    /// ffmpeg binary.
    pub ffmpeg_bin: PathBuf,
    /// Python interpreter used to run the piper voice downloader.
    pub python_bin: PathBuf,
    /// Optional deadline for each external tool invocation.
    pub tool_timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let options_path = std::env::var("NARRATOR_OPTIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/data/options.json"));
        let voices_dir = std::env::var("NARRATOR_VOICES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/data/voices"));
        let temp_dir = std::env::var("NARRATOR_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());
        let piper_bin = std::env::var("NARRATOR_PIPER_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("piper"));
        let ffmpeg_bin = std::env::var("NARRATOR_FFMPEG_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("ffmpeg"));
        let python_bin = std::env::var("NARRATOR_PYTHON_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("python"));
        let tool_timeout_ms = std::env::var("NARRATOR_TOOL_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok());

        Self {
            options_path,
            voices_dir,
            temp_dir,
            piper_bin,
            ffmpeg_bin,
            python_bin,
            tool_timeout_ms,
        }
    }
}
