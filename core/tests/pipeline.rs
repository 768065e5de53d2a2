//! End-to-end pipeline tests against a scripted tool runner.
//!
//! These cover the request pipeline's observable properties: cold-cache
//! fetch then synth then shape, warm-cache idempotence, the minimum
//! output size guard, error mapping per stage, options-file resolution
//! with clamping, and unconditional temp-file cleanup.

use async_trait::async_trait;
use narrator_core::{Narrator, NarratorError, ServiceConfig, ToolOutput, ToolRunner, TtsRequest};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Plays all three external tools. The downloader seeds voice files, the
/// synthesis stand-in writes the raw WAV, the filter stand-in writes the
/// shaped WAV; each stage's exit status and output size are scriptable.
struct FakeTools {
    voices_dir: PathBuf,
    sample_rate: u32,
    piper_status: i32,
    piper_bytes: usize,
    piper_stderr: Vec<u8>,
    ffmpeg_status: i32,
    ffmpeg_bytes: usize,
    ffmpeg_stderr: Vec<u8>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    scratch_dir: Mutex<Option<PathBuf>>,
}

impl FakeTools {
    fn new(voices_dir: PathBuf) -> Self {
        Self {
            voices_dir,
            sample_rate: 22_050,
            piper_status: 0,
            piper_bytes: 4096,
            piper_stderr: Vec::new(),
            ffmpeg_status: 0,
            ffmpeg_bytes: 2048,
            ffmpeg_stderr: Vec::new(),
            calls: Mutex::new(Vec::new()),
            scratch_dir: Mutex::new(None),
        }
    }

    fn tool_names(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    fn args_of(&self, tool: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, args)| args.clone())
            .unwrap_or_default()
    }

    /// Parent directory of the raw WAV the synthesis stage was asked to
    /// write; used to check cleanup.
    fn scratch_dir(&self) -> Option<PathBuf> {
        self.scratch_dir.lock().unwrap().clone()
    }
}

fn arg_after(args: &[String], flag: &str) -> String {
    let idx = args.iter().position(|a| a == flag).unwrap();
    args[idx + 1].clone()
}

#[async_trait]
impl ToolRunner for FakeTools {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> std::io::Result<ToolOutput> {
        let name = program
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        self.calls.lock().unwrap().push((name.clone(), args.to_vec()));

        match name.as_str() {
            "python" => {
                let voice = arg_after(args, "--voice");
                std::fs::write(self.voices_dir.join(format!("{voice}.onnx")), b"model")?;
                std::fs::write(
                    self.voices_dir.join(format!("{voice}.onnx.json")),
                    format!("{{\"audio\":{{\"sample_rate\":{}}}}}", self.sample_rate),
                )?;
                Ok(ToolOutput {
                    status_code: Some(0),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                })
            }
            "piper" => {
                assert!(stdin.is_some(), "piper must receive text on stdin");
                let out = PathBuf::from(arg_after(args, "--output_file"));
                *self.scratch_dir.lock().unwrap() =
                    Some(out.parent().unwrap().to_path_buf());
                if self.piper_bytes > 0 {
                    std::fs::write(&out, vec![0u8; self.piper_bytes])?;
                }
                Ok(ToolOutput {
                    status_code: Some(self.piper_status),
                    stdout: Vec::new(),
                    stderr: self.piper_stderr.clone(),
                })
            }
            "ffmpeg" => {
                if self.ffmpeg_status == 0 && self.ffmpeg_bytes > 0 {
                    std::fs::write(args.last().unwrap(), vec![1u8; self.ffmpeg_bytes])?;
                }
                Ok(ToolOutput {
                    status_code: Some(self.ffmpeg_status),
                    stdout: Vec::new(),
                    stderr: self.ffmpeg_stderr.clone(),
                })
            }
            other => panic!("unexpected tool invocation: {other}"),
        }
    }
}

fn test_config(root: &Path) -> ServiceConfig {
    ServiceConfig {
        options_path: root.join("options.json"),
        voices_dir: root.join("voices"),
        temp_dir: root.to_path_buf(),
        piper_bin: PathBuf::from("piper"),
        ffmpeg_bin: PathBuf::from("ffmpeg"),
        python_bin: PathBuf::from("python"),
        tool_timeout_ms: None,
    }
}

fn request(text: &str) -> TtsRequest {
    TtsRequest {
        text: text.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_cold_cache_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let tools = Arc::new(FakeTools::new(config.voices_dir.clone()));
    let narrator =
        Narrator::with_runner(config, Arc::clone(&tools) as Arc<dyn ToolRunner>).unwrap();

    let bytes = narrator.narrate(&request("Hello World")).await.unwrap();
    assert_eq!(bytes.len(), 2048);
    assert_eq!(tools.tool_names(), vec!["python", "piper", "ffmpeg"]);

    // Scratch WAVs are gone once the response bytes exist.
    let scratch = tools.scratch_dir().unwrap();
    assert!(!scratch.exists());
}

#[tokio::test]
async fn test_warm_cache_skips_fetch_and_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let tools = Arc::new(FakeTools::new(config.voices_dir.clone()));
    let narrator =
        Narrator::with_runner(config.clone(), Arc::clone(&tools) as Arc<dyn ToolRunner>).unwrap();

    // Seed the cache directly.
    std::fs::write(config.voices_dir.join("en_US-ryan-medium.onnx"), b"model").unwrap();
    std::fs::write(
        config.voices_dir.join("en_US-ryan-medium.onnx.json"),
        b"{\"audio\":{\"sample_rate\":22050}}",
    )
    .unwrap();

    let first = narrator.narrate(&request("again")).await.unwrap();
    let second = narrator.narrate(&request("again")).await.unwrap();
    assert!(!first.is_empty());
    assert_eq!(first.len(), second.len());
    assert!(!tools.tool_names().contains(&"python".to_string()));
}

#[tokio::test]
async fn test_zero_exit_undersized_output_is_synthesis_failure() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let mut tools = FakeTools::new(config.voices_dir.clone());
    tools.piper_bytes = 10; // exits zero, writes a stub
    let tools = Arc::new(tools);
    let narrator =
        Narrator::with_runner(config, Arc::clone(&tools) as Arc<dyn ToolRunner>).unwrap();

    let err = narrator.narrate(&request("hi")).await.unwrap_err();
    match err {
        NarratorError::SynthesisFailed { details, .. } => {
            assert_eq!(details, "output file missing or too small");
        }
        other => panic!("expected SynthesisFailed, got {other:?}"),
    }

    // Shaping never ran, scratch dir still cleaned up.
    assert!(!tools.tool_names().contains(&"ffmpeg".to_string()));
    assert!(!tools.scratch_dir().unwrap().exists());
}

#[tokio::test]
async fn test_shaping_failure_reports_filter_expression() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let mut tools = FakeTools::new(config.voices_dir.clone());
    tools.ffmpeg_status = 1;
    tools.ffmpeg_stderr = b"Error initializing filters".to_vec();
    let tools = Arc::new(tools);
    let narrator =
        Narrator::with_runner(config, Arc::clone(&tools) as Arc<dyn ToolRunner>).unwrap();

    let err = narrator.narrate(&request("hi")).await.unwrap_err();
    match err {
        NarratorError::ShapingFailed { filter, details } => {
            assert!(filter.contains("acrusher=bits=12"));
            assert!(details.contains("Error initializing filters"));
        }
        other => panic!("expected ShapingFailed, got {other:?}"),
    }
    assert!(!tools.scratch_dir().unwrap().exists());
}

#[tokio::test]
async fn test_synthesis_stderr_is_truncated() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let mut tools = FakeTools::new(config.voices_dir.clone());
    tools.piper_status = 1;
    tools.piper_stderr = vec![b'x'; 5000];
    let tools = Arc::new(tools);
    let narrator = Narrator::with_runner(config, tools as Arc<dyn ToolRunner>).unwrap();

    let err = narrator.narrate(&request("hi")).await.unwrap_err();
    match err {
        NarratorError::SynthesisFailed { details, .. } => assert_eq!(details.len(), 1600),
        other => panic!("expected SynthesisFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_options_file_resolves_and_clamps() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    std::fs::write(
        &config.options_path,
        b"{\"voice\":\"en_GB-alan-low\",\"grit\":0.5,\"length_scale\":0.9}",
    )
    .unwrap();

    let tools = Arc::new(FakeTools::new(config.voices_dir.clone()));
    let narrator =
        Narrator::with_runner(config, Arc::clone(&tools) as Arc<dyn ToolRunner>).unwrap();
    narrator.narrate(&request("hi")).await.unwrap();

    let piper_args = tools.args_of("piper");
    assert!(arg_after(&piper_args, "--model").contains("en_GB-alan-low.onnx"));
    assert_eq!(arg_after(&piper_args, "--length_scale"), "0.90");

    // grit 0.5 clamps to the top of the safe range
    let filter = arg_after(&tools.args_of("ffmpeg"), "-af");
    assert!(filter.ends_with("acrusher=bits=12:mix=0.100"));
}

#[tokio::test]
async fn test_voice_sample_rate_feeds_pitch_stage() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    std::fs::write(&config.options_path, b"{\"pitch\":0.9}").unwrap();

    let mut tools = FakeTools::new(config.voices_dir.clone());
    tools.sample_rate = 16_000;
    let tools = Arc::new(tools);
    let narrator =
        Narrator::with_runner(config, Arc::clone(&tools) as Arc<dyn ToolRunner>).unwrap();
    narrator.narrate(&request("hi")).await.unwrap();

    let filter = arg_after(&tools.args_of("ffmpeg"), "-af");
    assert!(filter.starts_with("asetrate=14400,atempo=1.1111,"));
}

#[tokio::test]
async fn test_malformed_options_file_is_ignored() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    std::fs::write(&config.options_path, b"{not json").unwrap();

    let tools = Arc::new(FakeTools::new(config.voices_dir.clone()));
    let narrator =
        Narrator::with_runner(config, Arc::clone(&tools) as Arc<dyn ToolRunner>).unwrap();
    narrator.narrate(&request("hi")).await.unwrap();

    let piper_args = tools.args_of("piper");
    assert!(arg_after(&piper_args, "--model").contains("en_US-ryan-medium.onnx"));
}
