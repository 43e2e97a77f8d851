//! Core types and collaborator traits for birdcast-daily
//!
//! The external data sources (observations, recordings, encyclopedia,
//! speech synthesis, fact text) sit behind the traits defined here so the
//! resolver and pipeline can be exercised with in-process stubs.

use crate::error::UpstreamError;
use async_trait::async_trait;
use birdcast_common::Location;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ============================================================================
// Randomness
// ============================================================================

/// Process-wide RNG for genuinely random choices
///
/// Only the candidate retry order in bird resolution draws from this.
/// Day-seeded selection never touches it.
pub type SharedRng = Arc<Mutex<StdRng>>;

/// RNG seeded from OS entropy
pub fn entropy_rng() -> SharedRng {
    Arc::new(Mutex::new(StdRng::from_entropy()))
}

/// RNG with a fixed seed, for reproducible tests
pub fn seeded_rng(seed: u64) -> SharedRng {
    Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))
}

// ============================================================================
// Birds
// ============================================================================

/// A single recent sighting from the observation source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "speciesCode")]
    pub species_code: String,
    #[serde(rename = "comName")]
    pub common_name: String,
    #[serde(rename = "sciName")]
    pub scientific_name: String,
    #[serde(rename = "lat", default)]
    pub latitude: f64,
    #[serde(rename = "lng", default)]
    pub longitude: f64,
    #[serde(rename = "obsDt", default)]
    pub obs_date: String,
    #[serde(rename = "locName", default)]
    pub location_name: String,
    #[serde(rename = "howMany", default)]
    pub how_many: Option<u32>,
}

/// A species eligible to be the bird of the day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirdCandidate {
    pub common_name: String,
    pub scientific_name: String,
    pub family: Option<String>,
    pub order: Option<String>,
    pub region: String,
}

impl BirdCandidate {
    /// Candidate built from a sighting
    pub fn from_observation(obs: &Observation, region: &str) -> Self {
        Self {
            common_name: obs.common_name.clone(),
            scientific_name: obs.scientific_name.clone(),
            family: None,
            order: None,
            region: region.to_string(),
        }
    }
}

/// A playable recording of a species
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub file_url: String,
    pub attribution: String,
}

/// Encyclopedia summary for a species
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub extract: String,
    pub page_url: String,
}

/// Where a resolved bird came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionSource {
    /// Local observations within the given search tier
    Regional { radius_km: u32, days: u32 },
    /// Day-rotated well-known species list
    GlobalFallback,
    /// Earlier resolution for the same card/date/location
    Cached,
    /// Location-independent bird of the day
    GlobalDaily,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionSource::Regional { radius_km, days } => {
                write!(f, "regional ({} km, {} days)", radius_km, days)
            }
            ResolutionSource::GlobalFallback => f.write_str("global fallback"),
            ResolutionSource::Cached => f.write_str("cached"),
            ResolutionSource::GlobalDaily => f.write_str("global daily"),
        }
    }
}

/// Bird of the day with everything the narration needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBird {
    pub candidate: BirdCandidate,
    pub recording: Option<Recording>,
    pub description: String,
    pub source: ResolutionSource,
}

// ============================================================================
// Voices
// ============================================================================

/// A synthesis voice and the name used in pre-rendered file names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub name: String,
    pub voice_id: String,
}

impl VoiceProfile {
    pub fn new(name: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voice_id: voice_id.into(),
        }
    }
}

/// Recognised speech synthesis settings
///
/// Ranges: `stability`, `similarity_boost` and `style` in 0.0..=1.0,
/// `speed` in 0.7..=1.2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub speed: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            speed: 0.9,
            use_speaker_boost: true,
        }
    }
}

impl VoiceSettings {
    /// Clamp every field into its documented range
    pub fn validated(self) -> Self {
        Self {
            stability: self.stability.clamp(0.0, 1.0),
            similarity_boost: self.similarity_boost.clamp(0.0, 1.0),
            style: self.style.clamp(0.0, 1.0),
            speed: self.speed.clamp(0.7, 1.2),
            use_speaker_boost: self.use_speaker_boost,
        }
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Recent bird sightings near a point
///
/// An empty result is a normal outcome, not an error.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn recent_observations(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: u32,
        days: u32,
    ) -> Result<Vec<Observation>, UpstreamError>;
}

/// Species recordings
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Best playable recording for a scientific or common name
    async fn best_recording(&self, name: &str) -> Result<Recording, UpstreamError>;

    /// Download the audio bytes behind a recording URL
    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>, UpstreamError>;
}

/// Encyclopedia lookups; a missing summary is never fatal
#[async_trait]
pub trait Encyclopedia: Send + Sync {
    async fn summary(&self, name: &str) -> Result<Summary, UpstreamError>;
}

/// Text-to-speech
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> Result<Vec<u8>, UpstreamError>;
}

/// Narration text for a bird at a location
#[async_trait]
pub trait FactGenerator: Send + Sync {
    async fn generate(
        &self,
        bird: &BirdCandidate,
        description: &str,
        location: &Location,
        date: NaiveDate,
    ) -> Result<String, UpstreamError>;
}
