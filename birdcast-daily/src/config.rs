//! birdcast-daily configuration
//!
//! Loaded from the shared TOML file; every field has a default so an empty
//! or missing file still yields a working (if voice-only) configuration.
//! API keys can be overridden from the environment.

use crate::types::{VoiceProfile, VoiceSettings};
use birdcast_common::config::{load_toml_file, TomlConfig};
use birdcast_common::{FadeCurve, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const EBIRD_KEY_ENV: &str = "BIRDCAST_EBIRD_API_KEY";
pub const XENO_CANTO_KEY_ENV: &str = "BIRDCAST_XENO_CANTO_API_KEY";
pub const ELEVENLABS_KEY_ENV: &str = "BIRDCAST_ELEVENLABS_API_KEY";

/// One step of the cascading regional search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SearchTier {
    pub radius_km: u32,
    pub days: u32,
}

impl SearchTier {
    pub const fn new(radius_km: u32, days: u32) -> Self {
        Self { radius_km, days }
    }
}

/// Bird resolution settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub tiers: Vec<SearchTier>,
    pub max_candidate_attempts: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                SearchTier::new(50, 30),
                SearchTier::new(100, 30),
                SearchTier::new(150, 60),
            ],
            max_candidate_attempts: 5,
        }
    }
}

/// External renderer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub render_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub fade_curve: FadeCurve,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            render_timeout_secs: 30,
            probe_timeout_secs: 10,
            fade_curve: FadeCurve::default(),
        }
    }
}

impl AudioConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// API credentials for one upstream service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Speech synthesis section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_id: String,
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model_id: "eleven_multilingual_v2".to_string(),
        }
    }
}

/// Complete birdcast-daily configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DailyConfig {
    /// Root of the static asset tree (defaults to `<root>/assets`)
    pub assets_dir: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub ebird: ApiSection,
    pub xeno_canto: ApiSection,
    pub wikipedia: ApiSection,
    pub elevenlabs: SynthesisSection,
    pub voice_settings: VoiceSettings,
    pub voices: Vec<VoiceProfile>,
    pub default_voice: String,
    pub resolver: ResolverConfig,
    pub audio: AudioConfig,
    #[serde(flatten)]
    pub common: TomlConfig,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            assets_dir: None,
            http_timeout_secs: 15,
            ebird: ApiSection::default(),
            xeno_canto: ApiSection::default(),
            wikipedia: ApiSection::default(),
            elevenlabs: SynthesisSection::default(),
            voice_settings: VoiceSettings::default(),
            voices: default_voices(),
            default_voice: "Rachel".to_string(),
            resolver: ResolverConfig::default(),
            audio: AudioConfig::default(),
            common: TomlConfig::default(),
        }
    }
}

/// Stock voices used when the config lists none
pub fn default_voices() -> Vec<VoiceProfile> {
    vec![
        VoiceProfile::new("Rachel", "21m00Tcm4TlvDq8ikWAM"),
        VoiceProfile::new("Bella", "EXAVITQu4vr4xnSDxMaL"),
        VoiceProfile::new("Antoni", "ErXwobaYiR2Wcj3uUO7O"),
        VoiceProfile::new("Josh", "TxGEqnHWrfWFTfGW9XjX"),
    ]
}

impl DailyConfig {
    /// Load from a file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: DailyConfig = load_toml_file(path)?;
        config.apply_env_overrides();
        config.normalize();
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.normalize();
        config
    }

    /// Environment variables win over TOML values
    pub fn apply_env_overrides(&mut self) {
        override_key(&mut self.ebird.api_key, EBIRD_KEY_ENV);
        override_key(&mut self.xeno_canto.api_key, XENO_CANTO_KEY_ENV);
        override_key(&mut self.elevenlabs.api_key, ELEVENLABS_KEY_ENV);
    }

    fn normalize(&mut self) {
        if self.voices.is_empty() {
            warn!("No voices configured, using stock voices");
            self.voices = default_voices();
        }
        if !self.voices.iter().any(|v| v.name == self.default_voice) {
            warn!(default_voice = %self.default_voice, "Default voice not in voice list, using first voice");
            self.default_voice = self.voices[0].name.clone();
        }
        if self.resolver.max_candidate_attempts == 0 {
            self.resolver.max_candidate_attempts = 1;
        }
        self.voice_settings = self.voice_settings.validated();
    }

    /// Asset root for a resolved root folder
    pub fn assets_dir(&self, root_folder: &Path) -> PathBuf {
        self.assets_dir
            .clone()
            .unwrap_or_else(|| root_folder.join("assets"))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// The configured default voice profile
    pub fn default_voice_profile(&self) -> VoiceProfile {
        self.voices
            .iter()
            .find(|v| v.name == self.default_voice)
            .cloned()
            .unwrap_or_else(|| self.voices[0].clone())
    }
}

fn override_key(slot: &mut Option<String>, env_var: &str) {
    if let Ok(value) = std::env::var(env_var) {
        if value.trim().is_empty() {
            return;
        }
        if slot.is_some() {
            warn!("{} set in both TOML and environment; using environment", env_var);
        }
        *slot = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: DailyConfig = toml::from_str("").unwrap();
        assert_eq!(config.resolver.tiers.len(), 3);
        assert_eq!(config.resolver.tiers[0], SearchTier::new(50, 30));
        assert_eq!(config.resolver.max_candidate_attempts, 5);
        assert_eq!(config.audio.render_timeout_secs, 30);
        assert_eq!(config.voices.len(), 4);
    }

    #[test]
    fn test_full_toml() {
        let text = r#"
            root_folder = "/srv/birdcast"
            default_voice = "Ada"
            http_timeout_secs = 20

            [ebird]
            api_key = "ebird-key"

            [voice_settings]
            stability = 0.4
            speed = 1.0

            [[voices]]
            name = "Ada"
            voice_id = "v-ada"

            [resolver]
            tiers = [{ radius_km = 25, days = 7 }]

            [audio]
            fade_curve = "linear"
        "#;
        let config: DailyConfig = toml::from_str(text).unwrap();
        assert_eq!(config.common.root_folder, Some(PathBuf::from("/srv/birdcast")));
        assert_eq!(config.ebird.api_key.as_deref(), Some("ebird-key"));
        assert_eq!(config.voice_settings.stability, 0.4);
        assert_eq!(config.voice_settings.similarity_boost, 0.75);
        assert_eq!(config.voices, vec![VoiceProfile::new("Ada", "v-ada")]);
        assert_eq!(config.resolver.tiers, vec![SearchTier::new(25, 7)]);
        assert_eq!(config.resolver.max_candidate_attempts, 5);
        assert_eq!(config.audio.fade_curve, FadeCurve::Linear);
        assert_eq!(config.default_voice_profile().voice_id, "v-ada");
    }

    #[test]
    fn test_normalize_repairs_default_voice() {
        let mut config = DailyConfig {
            default_voice: "Nobody".to_string(),
            ..DailyConfig::default()
        };
        config.normalize();
        assert_eq!(config.default_voice, "Rachel");
    }

    #[test]
    #[serial]
    fn test_env_overrides_toml_key() {
        std::env::set_var(ELEVENLABS_KEY_ENV, "from-env");
        let mut config = DailyConfig::default();
        config.elevenlabs.api_key = Some("from-toml".to_string());
        config.apply_env_overrides();
        assert_eq!(config.elevenlabs.api_key.as_deref(), Some("from-env"));
        std::env::remove_var(ELEVENLABS_KEY_ENV);
    }

    #[test]
    fn test_assets_dir_default() {
        let config = DailyConfig::default();
        assert_eq!(
            config.assets_dir(Path::new("/data")),
            PathBuf::from("/data/assets")
        );
    }
}
