//! Error types for birdcast-daily
//!
//! Most failures in the program pipeline are recovered locally by falling
//! back to a lower tier; only exhausted fallbacks reach the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for birdcast-daily
#[derive(Error, Debug)]
pub enum Error {
    /// Observation, recording, encyclopedia or synthesis source failed
    #[error("Upstream {source_name} unavailable: {message}")]
    UpstreamUnavailable {
        source_name: &'static str,
        message: String,
    },

    /// Static ambience/chime/voice asset absent
    #[error("Asset missing: {}", .0.display())]
    AssetMissing(PathBuf),

    /// External renderer absent or exited unsuccessfully
    #[error("Render tool failure: {0}")]
    RenderToolFailure(String),

    /// Every fallback tier failed; nothing left to degrade to
    #[error("All fallbacks exhausted: {0}")]
    ExhaustedFallback(String),

    /// Speech synthesis produced no usable audio
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// birdcast-common error
    #[error("Common error: {0}")]
    Common(#[from] birdcast_common::Error),
}

/// Convenience Result type using birdcast-daily Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by HTTP collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl UpstreamError {
    /// Wrap a reqwest failure, keeping timeouts distinguishable
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Parse(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }

    /// Promote to a pipeline error attributed to `source_name`
    pub fn into_pipeline(self, source_name: &'static str) -> Error {
        Error::UpstreamUnavailable {
            source_name,
            message: self.to_string(),
        }
    }
}

/// Errors from the external render/probe tool boundary
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Render tool not found: {0}")]
    ToolMissing(String),

    #[error("Failed to spawn {tool}: {message}")]
    Spawn { tool: String, message: String },

    #[error("{0} timed out")]
    Timeout(String),

    #[error("{tool} exited with {code:?}: {stderr}")]
    NonZeroExit {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid tool output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Error::RenderToolFailure(err.to_string())
    }
}
