//! External render tool boundary
//!
//! Duration probing via ffprobe and rendering via ffmpeg. Every call works
//! inside its own temporary directory (`birdcast-<timestamp>-XXXX`) that is
//! removed when the call returns, on success or failure.

use super::filter_graph::FilterGraph;
use crate::error::RenderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

const MAX_STDERR_CHARS: usize = 2000;

/// Measures the playing time of encoded audio
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe(&self, bytes: &[u8]) -> Result<f64, RenderError>;
}

/// Renders a compiled filter graph over raw inputs
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Whether the tool can be run at all
    async fn is_available(&self) -> bool;

    /// `inputs` are in graph input order
    async fn render(&self, graph: &FilterGraph, inputs: &[&[u8]]) -> Result<Vec<u8>, RenderError>;
}

fn scratch_dir() -> Result<TempDir, RenderError> {
    let prefix = format!("birdcast-{}-", chrono::Utc::now().format("%Y%m%d%H%M%S"));
    Ok(tempfile::Builder::new().prefix(&prefix).tempdir()?)
}

fn tool_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn truncate_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.chars().count() > MAX_STDERR_CHARS {
        let tail: String = text
            .chars()
            .rev()
            .take(MAX_STDERR_CHARS)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    } else {
        text.to_string()
    }
}

/// Run a command with a deadline, mapping every failure to [`RenderError`]
async fn run_tool(
    mut command: Command,
    tool: &str,
    timeout: Duration,
) -> Result<std::process::Output, RenderError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => return Err(RenderError::Timeout(tool.to_string())),
        Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
            return Err(RenderError::ToolMissing(tool.to_string()))
        }
        Ok(Err(e)) => {
            return Err(RenderError::Spawn {
                tool: tool.to_string(),
                message: e.to_string(),
            })
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        return Err(RenderError::NonZeroExit {
            tool: tool.to_string(),
            code: output.status.code(),
            stderr: truncate_stderr(&output.stderr),
        });
    }
    Ok(output)
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse the `format.duration` field of ffprobe's JSON output
pub fn parse_probe_output(stdout: &[u8]) -> Result<f64, RenderError> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| RenderError::InvalidOutput(format!("ffprobe JSON: {}", e)))?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| RenderError::InvalidOutput("ffprobe reported no duration".to_string()))?;

    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(RenderError::InvalidOutput(format!(
            "ffprobe reported duration {}",
            duration
        )))
    }
}

/// ffprobe-backed duration probe
#[derive(Debug, Clone)]
pub struct FfprobeDurationProbe {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeDurationProbe {
    pub fn new(ffprobe_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe(&self, bytes: &[u8]) -> Result<f64, RenderError> {
        if bytes.is_empty() {
            return Err(RenderError::InvalidOutput("empty audio".to_string()));
        }

        let dir = scratch_dir()?;
        let input = dir.path().join("probe_input");
        tokio::fs::write(&input, bytes).await?;

        let mut command = Command::new(&self.ffprobe_path);
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(&input);

        let tool = tool_name(&self.ffprobe_path);
        let output = run_tool(command, &tool, self.timeout).await?;
        let duration = parse_probe_output(&output.stdout)?;
        debug!(seconds = duration, bytes = bytes.len(), "Probed audio duration");
        Ok(duration)
    }
}

/// ffmpeg-backed renderer
#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    ffmpeg_path: PathBuf,
    timeout: Duration,
}

impl FfmpegRenderer {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn is_available(&self) -> bool {
        let mut command = Command::new(&self.ffmpeg_path);
        command.arg("-version");
        let tool = tool_name(&self.ffmpeg_path);
        match run_tool(command, &tool, Duration::from_secs(5)).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Render tool unavailable");
                false
            }
        }
    }

    async fn render(&self, graph: &FilterGraph, inputs: &[&[u8]]) -> Result<Vec<u8>, RenderError> {
        if inputs.len() != graph.inputs.len() {
            return Err(RenderError::InvalidOutput(format!(
                "graph expects {} inputs, got {}",
                graph.inputs.len(),
                inputs.len()
            )));
        }

        let dir = scratch_dir()?;
        let mut paths = Vec::with_capacity(inputs.len());
        for (i, bytes) in inputs.iter().enumerate() {
            let path = dir.path().join(format!("input_{}.mp3", i));
            tokio::fs::write(&path, bytes).await?;
            paths.push(path);
        }
        let output_path = dir.path().join("mix.mp3");

        let path_refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(graph.ffmpeg_args(&path_refs, &output_path));

        debug!(
            inputs = inputs.len(),
            total_seconds = graph.total_duration_seconds,
            "Rendering composition"
        );

        let tool = tool_name(&self.ffmpeg_path);
        run_tool(command, &tool, self.timeout).await?;

        let rendered = tokio::fs::read(&output_path).await?;
        if rendered.is_empty() {
            return Err(RenderError::InvalidOutput("renderer produced no audio".to_string()));
        }
        Ok(rendered)
    }
}
