//! ElevenLabs text-to-speech client
//!
//! Speech synthesis collaborator. The request body is a typed struct built
//! from [`VoiceSettings`]; the response is MPEG audio.

use crate::error::UpstreamError;
use crate::types::{SpeechSynthesizer, VoiceSettings};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: RequestVoiceSettings,
}

#[derive(Debug, Serialize)]
struct RequestVoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    speed: f32,
    use_speaker_boost: bool,
}

impl From<&VoiceSettings> for RequestVoiceSettings {
    fn from(settings: &VoiceSettings) -> Self {
        let s = settings.validated();
        Self {
            stability: s.stability,
            similarity_boost: s.similarity_boost,
            style: s.style,
            speed: s.speed,
            use_speaker_boost: s.use_speaker_boost,
        }
    }
}

/// ElevenLabs API client
pub struct ElevenLabsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model_id: String,
}

impl ElevenLabsClient {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        model_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| ELEVENLABS_BASE_URL.to_string()),
            api_key,
            model_id: model_id.into(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> Result<Vec<u8>, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::NotConfigured("ElevenLabs API key".to_string()))?;

        if text.trim().is_empty() {
            return Err(UpstreamError::Parse("empty narration text".to_string()));
        }
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(UpstreamError::Api(
                400,
                format!("text exceeds {} characters", MAX_TEXT_CHARS),
            ));
        }

        let body = SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: settings.into(),
        };

        tracing::debug!(voice_id = %voice_id, chars = text.len(), "Requesting speech synthesis");

        let response = self
            .http_client
            .post(format!("{}/text-to-speech/{}", self.base_url, voice_id))
            .header("xi-api-key", api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
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

        let audio = response.bytes().await.map_err(UpstreamError::from_reqwest)?;
        if audio.is_empty() {
            return Err(UpstreamError::Parse("synthesis returned no audio".to_string()));
        }

        tracing::info!(voice_id = %voice_id, bytes = audio.len(), "Speech synthesized");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let settings = VoiceSettings::default();
        let body = SynthesisRequest {
            text: "Hello birds",
            model_id: "eleven_multilingual_v2",
            voice_settings: (&settings).into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text"], "Hello birds");
        assert_eq!(json["voice_settings"]["use_speaker_boost"], true);
        assert!((json["voice_settings"]["similarity_boost"].as_f64().unwrap() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_request_settings_are_clamped() {
        let settings = VoiceSettings {
            speed: 3.0,
            ..VoiceSettings::default()
        };
        let request: RequestVoiceSettings = (&settings).into();
        assert_eq!(request.speed, 1.2);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client =
            ElevenLabsClient::new(None, None, "m", Duration::from_secs(5)).unwrap();
        let result = client
            .synthesize("hi", "voice", &VoiceSettings::default())
            .await;
        assert!(matches!(result, Err(UpstreamError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let client =
            ElevenLabsClient::new(Some("k".to_string()), None, "m", Duration::from_secs(5)).unwrap();
        let result = client
            .synthesize("   ", "voice", &VoiceSettings::default())
            .await;
        assert!(matches!(result, Err(UpstreamError::Parse(_))));
    }
}
