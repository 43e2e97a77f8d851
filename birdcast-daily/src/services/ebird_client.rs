//! eBird API client
//!
//! Observation source backed by the eBird "recent observations near a
//! point" endpoint. Requires an API token in the `X-eBirdApiToken` header.
//!
//! - Endpoint: https://api.ebird.org/v2/data/obs/geo/recent
//! - `dist` is capped at 50 km and `back` at 30 days by the API; wider
//!   tiers are clamped here rather than rejected upstream.

use crate::error::UpstreamError;
use crate::services::rate_limiter::RateLimiter;
use crate::types::{Observation, ObservationSource};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const EBIRD_BASE_URL: &str = "https://api.ebird.org/v2";
const USER_AGENT: &str = "Birdcast/0.1.0";
const RATE_LIMIT_MS: u64 = 250;
const MAX_DIST_KM: u32 = 50;
const MAX_BACK_DAYS: u32 = 30;
const MAX_RESULTS: u32 = 200;

/// eBird observation client
pub struct EbirdClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: Arc<RateLimiter>,
}

impl EbirdClient {
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
            base_url: base_url.unwrap_or_else(|| EBIRD_BASE_URL.to_string()),
            api_key,
            rate_limiter: Arc::new(RateLimiter::new(
                "ebird",
                Duration::from_millis(RATE_LIMIT_MS),
            )),
        })
    }

    fn recent_url(&self, latitude: f64, longitude: f64, radius_km: u32, days: u32) -> String {
        format!(
            "{}/data/obs/geo/recent?lat={:.4}&lng={:.4}&dist={}&back={}&maxResults={}",
            self.base_url,
            latitude,
            longitude,
            radius_km.clamp(1, MAX_DIST_KM),
            days.clamp(1, MAX_BACK_DAYS),
            MAX_RESULTS
        )
    }
}

#[async_trait]
impl ObservationSource for EbirdClient {
    async fn recent_observations(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: u32,
        days: u32,
    ) -> Result<Vec<Observation>, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::NotConfigured("eBird API key".to_string()))?;

        self.rate_limiter.acquire().await;

        let url = self.recent_url(latitude, longitude, radius_km, days);
        tracing::debug!(radius_km, days, "Querying eBird recent observations");

        let response = self
            .http_client
            .get(&url)
            .header("X-eBirdApiToken", api_key)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(UpstreamError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api(status.as_u16(), error_text));
        }

        let observations: Vec<Observation> = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        tracing::debug!(count = observations.len(), radius_km, days, "eBird returned observations");
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EbirdClient::new(None, None, Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_recent_url_clamps_tiers() {
        let client = EbirdClient::new(None, None, Duration::from_secs(5)).unwrap();
        let url = client.recent_url(40.7128, -74.006, 150, 60);
        assert!(url.starts_with("https://api.ebird.org/v2/data/obs/geo/recent?"));
        assert!(url.contains("lat=40.7128"));
        assert!(url.contains("lng=-74.0060"));
        assert!(url.contains("dist=50"));
        assert!(url.contains("back=30"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = EbirdClient::new(None, None, Duration::from_secs(5)).unwrap();
        let result = client.recent_observations(0.0, 0.0, 50, 30).await;
        assert!(matches!(result, Err(UpstreamError::NotConfigured(_))));
    }
}
