//! Wikipedia summary client
//!
//! Encyclopedia collaborator using the REST page summary endpoint.
//! Disambiguation pages and empty extracts count as "no summary".

use crate::error::UpstreamError;
use crate::types::{Encyclopedia, Summary};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org/api/rest_v1";
const USER_AGENT: &str = "Birdcast/0.1.0 (daily bird program)";

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    page_type: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

/// Wikipedia REST client
pub struct WikipediaClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl WikipediaClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| WIKIPEDIA_BASE_URL.to_string()),
        })
    }

    fn summary_url(&self, name: &str) -> Result<reqwest::Url, UpstreamError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| UpstreamError::NotConfigured(format!("bad Wikipedia URL: {}", e)))?;
        let title = name.trim().replace(' ', "_");
        url.path_segments_mut()
            .map_err(|_| UpstreamError::NotConfigured("Wikipedia URL cannot be a base".to_string()))?
            .extend(["page", "summary", title.as_str()]);
        Ok(url)
    }
}

fn into_summary(page: PageSummary, name: &str) -> Result<Summary, UpstreamError> {
    if page.page_type == "disambiguation" || page.extract.trim().is_empty() {
        return Err(UpstreamError::NotFound(format!("no summary for {}", name)));
    }
    let page_url = page
        .content_urls
        .and_then(|u| u.desktop)
        .map(|d| d.page)
        .unwrap_or_default();
    Ok(Summary {
        extract: page.extract,
        page_url,
    })
}

#[async_trait]
impl Encyclopedia for WikipediaClient {
    async fn summary(&self, name: &str) -> Result<Summary, UpstreamError> {
        let url = self.summary_url(name)?;
        tracing::debug!(name = %name, "Fetching Wikipedia summary");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(UpstreamError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api(status.as_u16(), error_text));
        }

        let page: PageSummary = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        into_summary(page, name)
    }
}
