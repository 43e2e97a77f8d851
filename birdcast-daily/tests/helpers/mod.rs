//! Test Helper Utilities
//!
//! In-process stand-ins for every external collaborator. Each stub records
//! its calls so tests can assert on what the pipeline asked for.

#![allow(dead_code)]

use async_trait::async_trait;
use birdcast_daily::audio::{DurationProbe, FilterGraph, Renderer};
use birdcast_daily::error::{RenderError, UpstreamError};
use birdcast_daily::program::Collaborators;
use birdcast_daily::services::TemplateFactGenerator;
use birdcast_daily::types::{
    AudioSource, Encyclopedia, Observation, ObservationSource, Recording, SpeechSynthesizer,
    Summary, VoiceSettings,
};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn obs(code: &str, common: &str, scientific: &str) -> Observation {
    Observation {
        species_code: code.to_string(),
        common_name: common.to_string(),
        scientific_name: scientific.to_string(),
        latitude: 0.0,
        longitude: 0.0,
        obs_date: "2024-05-01 07:00".to_string(),
        location_name: "Test marsh".to_string(),
        how_many: Some(1),
    }
}

// ============================================================================
// Observation source
// ============================================================================

/// Responds per search radius; unknown radii return no observations
#[derive(Default)]
pub struct StubObservations {
    responses: HashMap<u32, Result<Vec<Observation>, UpstreamError>>,
    pub calls: Mutex<Vec<(u32, u32)>>,
}

impl StubObservations {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, radius_km: u32, observations: Vec<Observation>) -> Self {
        self.responses.insert(radius_km, Ok(observations));
        self
    }

    pub fn failing_tier(mut self, radius_km: u32, error: UpstreamError) -> Self {
        self.responses.insert(radius_km, Err(error));
        self
    }

    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObservationSource for StubObservations {
    async fn recent_observations(
        &self,
        _latitude: f64,
        _longitude: f64,
        radius_km: u32,
        days: u32,
    ) -> Result<Vec<Observation>, UpstreamError> {
        self.calls.lock().unwrap().push((radius_km, days));
        self.responses
            .get(&radius_km)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ============================================================================
// Audio source
// ============================================================================

/// Finds recordings only for the listed names
#[derive(Default)]
pub struct StubAudio {
    playable: HashSet<String>,
    pub lookups: Mutex<Vec<String>>,
    pub downloads: AtomicUsize,
}

impl StubAudio {
    pub fn playable<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            playable: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSource for StubAudio {
    async fn best_recording(&self, name: &str) -> Result<Recording, UpstreamError> {
        self.lookups.lock().unwrap().push(name.to_string());
        if self.playable.contains(name) {
            Ok(Recording {
                file_url: format!("https://audio.test/{}.mp3", name.replace(' ', "_")),
                attribution: "Test recordist".to_string(),
            })
        } else {
            Err(UpstreamError::NotFound(name.to_string()))
        }
    }

    async fn fetch_audio(&self, _url: &str) -> Result<Vec<u8>, UpstreamError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(b"birdsong".to_vec())
    }
}

// ============================================================================
// Encyclopedia
// ============================================================================

/// Serves one extract for every name; the default fails every lookup
#[derive(Default)]
pub struct StubEncyclopedia {
    pub extract: Option<String>,
    pub calls: AtomicUsize,
}

impl StubEncyclopedia {
    pub fn with_extract(text: &str) -> Self {
        Self {
            extract: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Encyclopedia for StubEncyclopedia {
    async fn summary(&self, name: &str) -> Result<Summary, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.extract {
            Some(text) => Ok(Summary {
                extract: text.clone(),
                page_url: format!("https://wiki.test/{}", name),
            }),
            None => Err(UpstreamError::NotFound(name.to_string())),
        }
    }
}

// ============================================================================
// Speech synthesis
// ============================================================================

/// Returns `speech:<text>` as the audio bytes
#[derive(Default)]
pub struct StubSynthesizer {
    pub texts: Mutex<Vec<String>>,
}

impl StubSynthesizer {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        _voice_id: &str,
        _settings: &VoiceSettings,
    ) -> Result<Vec<u8>, UpstreamError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(format!("speech:{}", text).into_bytes())
    }
}

// ============================================================================
// Probe and renderer
// ============================================================================

pub struct FixedProbe(pub Option<f64>);

#[async_trait]
impl DurationProbe for FixedProbe {
    async fn probe(&self, _bytes: &[u8]) -> Result<f64, RenderError> {
        self.0
            .ok_or_else(|| RenderError::InvalidOutput("no duration".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderMode {
    /// `is_available` reports false
    Absent,
    /// Every render exits non-zero
    Failing,
    /// Renders `mix:<n inputs>`
    Working,
}

pub struct StubRenderer {
    mode: RenderMode,
    pub renders: Mutex<Vec<FilterGraph>>,
}

impl StubRenderer {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            renders: Mutex::new(Vec::new()),
        }
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn is_available(&self) -> bool {
        self.mode != RenderMode::Absent
    }

    async fn render(&self, graph: &FilterGraph, inputs: &[&[u8]]) -> Result<Vec<u8>, RenderError> {
        self.renders.lock().unwrap().push(graph.clone());
        match self.mode {
            RenderMode::Working => Ok(format!("mix:{}", inputs.len()).into_bytes()),
            _ => Err(RenderError::NonZeroExit {
                tool: "ffmpeg".to_string(),
                code: Some(1),
                stderr: "Invalid data found when processing input".to_string(),
            }),
        }
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub struct Stubs {
    pub observations: Arc<StubObservations>,
    pub audio: Arc<StubAudio>,
    pub encyclopedia: Arc<StubEncyclopedia>,
    pub synthesizer: Arc<StubSynthesizer>,
    pub renderer: Arc<StubRenderer>,
}

impl Stubs {
    pub fn new(observations: StubObservations, audio: StubAudio, mode: RenderMode) -> Self {
        Self {
            observations: Arc::new(observations),
            audio: Arc::new(audio),
            encyclopedia: Arc::new(StubEncyclopedia::with_extract(
                "A familiar songbird (family Turdidae). It sings at dawn. It eats worms.",
            )),
            synthesizer: Arc::new(StubSynthesizer::default()),
            renderer: Arc::new(StubRenderer::new(mode)),
        }
    }

    pub fn with_encyclopedia(mut self, encyclopedia: StubEncyclopedia) -> Self {
        self.encyclopedia = Arc::new(encyclopedia);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            observations: self.observations.clone(),
            audio: self.audio.clone(),
            encyclopedia: self.encyclopedia.clone(),
            synthesizer: self.synthesizer.clone(),
            facts: Arc::new(TemplateFactGenerator::new()),
            probe: Arc::new(FixedProbe(Some(5.0))),
            renderer: self.renderer.clone(),
        }
    }
}
