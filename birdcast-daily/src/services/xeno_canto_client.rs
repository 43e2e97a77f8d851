//! xeno-canto recordings client
//!
//! Audio source for bird song. Queries the recordings API by species name,
//! prefers quality A then B, and among those the shortest clip that is at
//! least a few seconds long (a short clip loops cleanly under the outro).
//!
//! - Endpoint: https://xeno-canto.org/api/3/recordings?query=...&key=...

use crate::error::UpstreamError;
use crate::services::rate_limiter::RateLimiter;
use crate::types::{AudioSource, Recording};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const XENO_CANTO_BASE_URL: &str = "https://xeno-canto.org/api/3";
const USER_AGENT: &str = "Birdcast/0.1.0";
const RATE_LIMIT_MS: u64 = 1000;
const MIN_CLIP_SECONDS: u32 = 5;

#[derive(Debug, Deserialize)]
struct RecordingsResponse {
    #[serde(default)]
    recordings: Vec<XcRecording>,
}

#[derive(Debug, Clone, Deserialize)]
struct XcRecording {
    id: String,
    file: String,
    #[serde(default)]
    rec: String,
    #[serde(default)]
    lic: String,
    #[serde(default)]
    q: String,
    #[serde(default)]
    length: String,
}

impl XcRecording {
    fn quality_rank(&self) -> u8 {
        match self.q.as_str() {
            "A" => 0,
            "B" => 1,
            "C" => 2,
            _ => 3,
        }
    }

    fn length_seconds(&self) -> Option<u32> {
        parse_clip_length(&self.length)
    }

    fn file_url(&self) -> String {
        if self.file.starts_with("//") {
            format!("https:{}", self.file)
        } else {
            self.file.clone()
        }
    }

    fn attribution(&self) -> String {
        let license = if self.lic.starts_with("//") {
            format!("https:{}", self.lic)
        } else {
            self.lic.clone()
        };
        format!("XC{} by {} ({})", self.id, self.rec, license)
    }
}

/// Parse "m:ss" or "h:mm:ss" clip lengths into seconds
fn parse_clip_length(text: &str) -> Option<u32> {
    text.split(':')
        .map(|part| part.trim().parse::<u32>().ok())
        .try_fold(0u32, |acc, part| acc.checked_mul(60)?.checked_add(part?))
        .filter(|_| !text.trim().is_empty())
}

/// Pick the best recording: quality first, then shortest usable clip
fn best_of(recordings: &[XcRecording]) -> Option<&XcRecording> {
    recordings
        .iter()
        .filter(|r| !r.file.is_empty() && r.quality_rank() <= 2)
        .min_by_key(|r| {
            let length = r.length_seconds().unwrap_or(u32::MAX);
            let too_short = length < MIN_CLIP_SECONDS;
            (r.quality_rank(), too_short, length)
        })
}

/// xeno-canto API client
pub struct XenoCantoClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: Arc<RateLimiter>,
}

impl XenoCantoClient {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| XENO_CANTO_BASE_URL.to_string()),
            api_key,
            rate_limiter: Arc::new(RateLimiter::new(
                "xeno-canto",
                Duration::from_millis(RATE_LIMIT_MS),
            )),
        })
    }
}

#[async_trait]
impl AudioSource for XenoCantoClient {
    async fn best_recording(&self, name: &str) -> Result<Recording, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::NotConfigured("xeno-canto API key".to_string()))?;

        self.rate_limiter.acquire().await;

        let query = format!("sp:\"{}\"", name);
        tracing::debug!(species = %name, "Querying xeno-canto recordings");

        let response = self
            .http_client
            .get(format!("{}/recordings", self.base_url))
            .query(&[("query", query.as_str()), ("key", api_key)])
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api(status.as_u16(), error_text));
        }

        let body: RecordingsResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        let best = best_of(&body.recordings)
            .ok_or_else(|| UpstreamError::NotFound(format!("no usable recording for {}", name)))?;

        Ok(Recording {
            file_url: best.file_url(),
            attribution: best.attribution(),
        })
    }

    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>, UpstreamError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(UpstreamError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(UpstreamError::Api(status.as_u16(), url.to_string()));
        }

        let bytes = response.bytes().await.map_err(UpstreamError::from_reqwest)?;
        if bytes.is_empty() {
            return Err(UpstreamError::Parse(format!("empty audio at {}", url)));
        }
        Ok(bytes.to_vec())
    }
}
