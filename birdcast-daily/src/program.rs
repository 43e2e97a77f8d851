//! Daily program pipeline
//!
//! Wires bird resolution, the content cache, voice and variant selection,
//! narration text, speech synthesis and composition into the three tracks
//! of a daily program. The pipeline runs strictly in order:
//! bird → text → speech → composition.

use crate::audio::{
    AudioLayer, AudioTimelineComposer, CompositionTemplate, DurationProbe, FfmpegRenderer,
    FfprobeDurationProbe, LayerRole, Renderer,
};
use crate::config::DailyConfig;
use crate::error::{Error, Result};
use crate::services::bird_resolver::{fallback_for_day, with_taxonomy};
use crate::services::content_cache::{spawn_daily_sweep, CacheEntry, DailyContentCache};
use crate::services::intro_outro::{select_variant, DailyIntroOutroSelector};
use crate::services::{
    EbirdClient, ElevenLabsClient, RegionalBirdResolver, TemplateFactGenerator, WikipediaClient,
    XenoCantoClient,
};
use crate::types::{
    AudioSource, BirdCandidate, Encyclopedia, FactGenerator, ObservationSource, Recording,
    ResolutionSource, ResolvedBird, SharedRng, SpeechSynthesizer, VoiceProfile, VoiceSettings,
};
use birdcast_common::selector::{select_from, SelectionDomain};
use birdcast_common::time::{
    date_at_offset, listener_dates, now, until_midnight_at_offset, EASTERNMOST_OFFSET_MINUTES,
};
use birdcast_common::Location;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

const INTRO_GREETING: &str =
    "Good morning, bird explorers! It's time to meet today's bird of the day. Are you ready? Let's listen!";

/// One program request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRequest {
    pub device_id: String,
    pub location: Location,
    /// Listener's offset from UTC; determines the program date
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// The three finished tracks plus what went into them
#[derive(Debug, Clone)]
pub struct DailyProgram {
    pub request_id: Uuid,
    pub date: NaiveDate,
    pub voice: VoiceProfile,
    pub bird: ResolvedBird,
    pub narration_text: String,
    pub intro: Vec<u8>,
    pub narration: Vec<u8>,
    pub outro: Vec<u8>,
}

/// External collaborators of the pipeline
#[derive(Clone)]
pub struct Collaborators {
    pub observations: Arc<dyn ObservationSource>,
    pub audio: Arc<dyn AudioSource>,
    pub encyclopedia: Arc<dyn Encyclopedia>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub facts: Arc<dyn FactGenerator>,
    pub probe: Arc<dyn DurationProbe>,
    pub renderer: Arc<dyn Renderer>,
}

impl Collaborators {
    /// HTTP clients and ffmpeg tools built from configuration
    pub fn from_config(config: &DailyConfig) -> Result<Self> {
        let timeout = config.http_timeout();

        let ebird = EbirdClient::new(
            config.ebird.api_key.clone(),
            config.ebird.base_url.clone(),
            timeout,
        )
        .map_err(|e| e.into_pipeline("ebird"))?;
        let xeno_canto = XenoCantoClient::new(
            config.xeno_canto.api_key.clone(),
            config.xeno_canto.base_url.clone(),
            timeout,
        )
        .map_err(|e| e.into_pipeline("xeno-canto"))?;
        let wikipedia = WikipediaClient::new(config.wikipedia.base_url.clone(), timeout)
            .map_err(|e| e.into_pipeline("wikipedia"))?;
        let elevenlabs = ElevenLabsClient::new(
            config.elevenlabs.api_key.clone(),
            config.elevenlabs.base_url.clone(),
            config.elevenlabs.model_id.clone(),
            timeout,
        )
        .map_err(|e| e.into_pipeline("elevenlabs"))?;

        Ok(Self {
            observations: Arc::new(ebird),
            audio: Arc::new(xeno_canto),
            encyclopedia: Arc::new(wikipedia),
            synthesizer: Arc::new(elevenlabs),
            facts: Arc::new(TemplateFactGenerator::new()),
            probe: Arc::new(FfprobeDurationProbe::new(
                &config.audio.ffprobe_path,
                config.audio.probe_timeout(),
            )),
            renderer: Arc::new(FfmpegRenderer::new(
                &config.audio.ffmpeg_path,
                config.audio.render_timeout(),
            )),
        })
    }
}

/// Static asset locations under the asset root
#[derive(Debug, Clone)]
pub struct AssetLayout {
    pub ambience_dir: PathBuf,
    pub chime_path: PathBuf,
    pub voices_dir: PathBuf,
}

impl AssetLayout {
    pub fn new(assets_dir: &Path) -> Self {
        Self {
            ambience_dir: assets_dir.join("ambience"),
            chime_path: assets_dir.join("sfx").join("chime.mp3"),
            voices_dir: assets_dir.join("voices"),
        }
    }

    /// Sorted ambience tracks
    pub fn ambience_tracks(&self) -> Vec<PathBuf> {
        let mut tracks: Vec<PathBuf> = WalkDir::new(&self.ambience_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("mp3")))
            .collect();
        tracks.sort();
        tracks
    }
}

/// Read a static asset; absent or empty files are `AssetMissing`
pub async fn load_asset(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(Error::AssetMissing(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::AssetMissing(path.to_path_buf())),
        Err(e) => Err(Error::Io(e)),
    }
}

/// The daily program service
pub struct DailyProgramService {
    resolver: RegionalBirdResolver,
    cache: DailyContentCache,
    audio: Arc<dyn AudioSource>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    facts: Arc<dyn FactGenerator>,
    composer: AudioTimelineComposer,
    selector: DailyIntroOutroSelector,
    assets: AssetLayout,
    voices: Vec<VoiceProfile>,
    default_voice: VoiceProfile,
    voice_settings: VoiceSettings,
}

impl DailyProgramService {
    pub fn new(
        collaborators: Collaborators,
        config: &DailyConfig,
        assets_dir: &Path,
        rng: SharedRng,
    ) -> Self {
        let resolver = RegionalBirdResolver::new(
            collaborators.observations.clone(),
            collaborators.audio.clone(),
            collaborators.encyclopedia.clone(),
            config.resolver.clone(),
            rng,
        );
        let composer = AudioTimelineComposer::new(collaborators.probe, collaborators.renderer)
            .with_fade_curve(config.audio.fade_curve);
        let assets = AssetLayout::new(assets_dir);

        Self {
            resolver,
            cache: DailyContentCache::new(),
            audio: collaborators.audio,
            synthesizer: collaborators.synthesizer,
            facts: collaborators.facts,
            composer,
            selector: DailyIntroOutroSelector::new(assets.voices_dir.clone()),
            assets,
            voices: config.voices.clone(),
            default_voice: config.default_voice_profile(),
            voice_settings: config.voice_settings.validated(),
        }
    }

    /// Replace the resolver's fallback list
    pub fn with_fallback_list(mut self, fallback: Vec<BirdCandidate>) -> Self {
        self.resolver = self.resolver.with_fallback_list(fallback);
        self
    }

    pub fn cache(&self) -> &DailyContentCache {
        &self.cache
    }

    pub fn resolver(&self) -> &RegionalBirdResolver {
        &self.resolver
    }

    /// Bird of the day for a card at a location
    ///
    /// Cache first, then the resolver, then the global daily slot (or the
    /// day's rotation bird when no slot exists for `date`).
    pub async fn get_bird_for_location(
        &self,
        card_id: &str,
        location: &Location,
        date: NaiveDate,
    ) -> Result<ResolvedBird> {
        let key = location.key();

        if let Some(entry) = self.cache.get(card_id, date, &key).await {
            debug!(card = card_id, key = %key, bird = %entry.bird_name, "Cache hit");
            return Ok(self.from_cache_entry(entry).await);
        }

        match self.resolver.resolve(location, date).await {
            Ok(bird) => {
                let entry = CacheEntry {
                    bird_name: bird.candidate.common_name.clone(),
                    scientific_name: Some(bird.candidate.scientific_name.clone()),
                    bird_audio_url: bird.recording.as_ref().map(|r| r.file_url.clone()),
                    date,
                    updated_at: Utc::now(),
                    location_key: key.to_string(),
                    resolved: Some(bird.clone()),
                };
                self.cache.put_entry(card_id, entry).await;
                Ok(bird)
            }
            Err(e) => {
                warn!(card = card_id, error = %e, "Resolution failed; trying global daily bird");
                let name = match self.cache.get_global_daily(date).await {
                    Some(name) => Some(name),
                    None => fallback_for_day(self.resolver.fallback_list(), date)
                        .map(|b| b.common_name.clone()),
                };
                match name {
                    Some(name) => Ok(self.from_global_daily(&name).await),
                    None => Err(e),
                }
            }
        }
    }

    async fn from_cache_entry(&self, entry: CacheEntry) -> ResolvedBird {
        if let Some(bird) = entry.resolved {
            return ResolvedBird {
                source: ResolutionSource::Cached,
                ..bird
            };
        }

        // name-only entry
        let candidate = with_taxonomy(BirdCandidate {
            common_name: entry.bird_name,
            scientific_name: entry.scientific_name.unwrap_or_default(),
            family: None,
            order: None,
            region: String::new(),
        });
        let recording = entry.bird_audio_url.map(|url| Recording {
            file_url: url,
            attribution: String::new(),
        });
        let description = self.resolver.describe(&candidate).await;
        ResolvedBird {
            candidate,
            recording,
            description,
            source: ResolutionSource::Cached,
        }
    }

    async fn from_global_daily(&self, name: &str) -> ResolvedBird {
        let candidate = self
            .resolver
            .fallback_list()
            .iter()
            .find(|b| b.common_name == name)
            .cloned()
            .unwrap_or_else(|| BirdCandidate {
                common_name: name.to_string(),
                scientific_name: String::new(),
                family: None,
                order: None,
                region: "Global".to_string(),
            });

        let lookup = if candidate.scientific_name.is_empty() {
            &candidate.common_name
        } else {
            &candidate.scientific_name
        };
        let recording = match self.audio.best_recording(lookup).await {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(bird = %name, error = %e, "No recording for global daily bird");
                None
            }
        };
        let description = self.resolver.describe(&candidate).await;

        info!(bird = %name, "Using global daily bird");
        ResolvedBird {
            candidate,
            recording,
            description,
            source: ResolutionSource::GlobalDaily,
        }
    }

    /// Voice of the day
    pub fn get_daily_voice(&self, date: NaiveDate) -> VoiceProfile {
        select_from(SelectionDomain::Voice, date, &self.voices)
            .map(Clone::clone)
            .unwrap_or_else(|_| self.default_voice.clone())
    }

    /// Ambience track of the day, if any exist
    pub fn select_ambience(&self, date: NaiveDate) -> Option<PathBuf> {
        let tracks = self.assets.ambience_tracks();
        select_from(SelectionDomain::Ambience, date, &tracks).ok().cloned()
    }

    async fn optional_layer(&self, role: LayerRole, path: Option<PathBuf>) -> Option<AudioLayer> {
        let Some(path) = path else {
            warn!(layer = %role, "No asset available for layer");
            return None;
        };
        match load_asset(&path).await {
            Ok(bytes) => Some(AudioLayer::new(role, bytes)),
            Err(e) => {
                warn!(layer = %role, error = %e, "Asset unavailable; composition will degrade");
                None
            }
        }
    }

    /// Pre-rendered file for the voice, else for the default voice
    async fn prerendered(
        &self,
        voice: &VoiceProfile,
        pick: impl Fn(&str) -> Option<PathBuf>,
    ) -> Option<Vec<u8>> {
        let mut names = vec![voice.name.as_str()];
        if voice.name != self.default_voice.name {
            names.push(self.default_voice.name.as_str());
        }

        for name in names {
            if let Some(path) = pick(name) {
                match load_asset(&path).await {
                    Ok(bytes) => return Some(bytes),
                    Err(e) => warn!(voice = %name, error = %e, "Pre-rendered file unreadable"),
                }
            } else {
                debug!(voice = %name, "No pre-rendered file for voice");
            }
        }
        None
    }

    async fn speak(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        self.synthesizer
            .synthesize(text, &voice.voice_id, &self.voice_settings)
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))
    }

    /// Intro track: ambience, chime and the day's intro announcement
    pub async fn compose_intro(&self, voice: &VoiceProfile, date: NaiveDate) -> Result<Vec<u8>> {
        let announcement = match self
            .prerendered(voice, |name| self.selector.select_intro(name, date))
            .await
        {
            Some(bytes) => bytes,
            None => {
                info!(voice = %voice.name, "No pre-rendered intro; synthesizing greeting");
                self.speak(INTRO_GREETING, voice).await?
            }
        };

        let mut layers = vec![AudioLayer::new(LayerRole::Voice, announcement)];
        layers.extend(
            self.optional_layer(LayerRole::Ambience, self.select_ambience(date))
                .await,
        );
        layers.extend(
            self.optional_layer(LayerRole::Chime, Some(self.assets.chime_path.clone()))
                .await,
        );

        Ok(self.composer.compose(layers, &CompositionTemplate::intro()).await)
    }

    /// Outro track: the weekday's content over the bird's song
    pub async fn compose_outro(
        &self,
        voice: &VoiceProfile,
        weekday: Weekday,
        birdsong: Option<Vec<u8>>,
        date: NaiveDate,
    ) -> Result<Vec<u8>> {
        let content = select_variant(weekday);
        let announcement = match self
            .prerendered(voice, |name| self.selector.select_outro(weekday, name, date))
            .await
        {
            Some(bytes) => bytes,
            None => {
                info!(voice = %voice.name, content = content.file_prefix(), "No pre-rendered outro; synthesizing sign-off");
                self.speak(content.fallback_line(), voice).await?
            }
        };

        let mut layers = vec![AudioLayer::new(LayerRole::Voice, announcement)];
        match birdsong {
            Some(bytes) if !bytes.is_empty() => layers.push(AudioLayer::new(LayerRole::Birdsong, bytes)),
            _ => warn!("No bird song for outro; composition will degrade"),
        }

        Ok(self.composer.compose(layers, &CompositionTemplate::outro()).await)
    }

    /// Narration track: synthesized narration over the day's ambience
    pub async fn compose_narration(&self, voice_bytes: Vec<u8>, date: NaiveDate) -> Vec<u8> {
        let mut layers = vec![AudioLayer::new(LayerRole::Voice, voice_bytes)];
        layers.extend(
            self.optional_layer(LayerRole::Ambience, self.select_ambience(date))
                .await,
        );
        self.composer
            .compose(layers, &CompositionTemplate::narration())
            .await
    }

    /// Run the full pipeline for one request
    pub async fn generate_program(&self, request: &ProgramRequest) -> Result<DailyProgram> {
        let request_id = Uuid::new_v4();
        let date = date_at_offset(now(), request.utc_offset_minutes);
        info!(
            %request_id,
            device = %request.device_id,
            %date,
            location = %request.location.key(),
            "Generating daily program"
        );

        let voice = self.get_daily_voice(date);
        let bird = self
            .get_bird_for_location(&request.device_id, &request.location, date)
            .await?;

        let narration_text = self
            .facts
            .generate(&bird.candidate, &bird.description, &request.location, date)
            .await
            .map_err(|e| e.into_pipeline("facts"))?;
        let speech = self.speak(&narration_text, &voice).await?;

        let birdsong = match &bird.recording {
            Some(recording) => match self.audio.fetch_audio(&recording.file_url).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(%request_id, error = %e, "Bird song download failed");
                    None
                }
            },
            None => None,
        };

        let intro = self.compose_intro(&voice, date).await.unwrap_or_else(|e| {
            warn!(%request_id, error = %e, "Intro unavailable");
            Vec::new()
        });
        let narration = self.compose_narration(speech, date).await;
        let outro = self
            .compose_outro(&voice, date.weekday(), birdsong, date)
            .await
            .unwrap_or_else(|e| {
                warn!(%request_id, error = %e, "Outro unavailable");
                Vec::new()
            });

        info!(
            %request_id,
            bird = %bird.candidate.common_name,
            source = %bird.source,
            voice = %voice.name,
            intro_bytes = intro.len(),
            narration_bytes = narration.len(),
            outro_bytes = outro.len(),
            "Daily program ready"
        );

        Ok(DailyProgram {
            request_id,
            date,
            voice,
            bird,
            narration_text,
            intro,
            narration,
            outro,
        })
    }

    /// Start the midnight cache sweep and the global daily scheduler
    pub fn spawn_background_tasks(&self, token: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            spawn_daily_sweep(self.cache.clone(), token.clone()),
            spawn_global_daily_scheduler(
                self.cache.clone(),
                self.resolver.fallback_list().to_vec(),
                token,
            ),
        ]
    }
}

/// Store the day's fallback bird in the global daily slot
pub async fn refresh_global_daily(
    cache: &DailyContentCache,
    fallback: &[BirdCandidate],
    date: NaiveDate,
) -> Option<String> {
    let bird = fallback_for_day(fallback, date)?;
    cache.set_global_daily(date, &bird.common_name).await;
    Some(bird.common_name.clone())
}

/// Fill the global daily slot for every date that is current somewhere
pub async fn refresh_listener_days(
    cache: &DailyContentCache,
    fallback: &[BirdCandidate],
    at: DateTime<Utc>,
) -> Vec<String> {
    let mut stored = Vec::new();
    for date in listener_dates(at) {
        stored.extend(refresh_global_daily(cache, fallback, date).await);
    }
    stored
}

/// Refresh the global daily birds now and whenever a new date begins
///
/// A new date first appears at the easternmost offset.
pub fn spawn_global_daily_scheduler(
    cache: DailyContentCache,
    fallback: Vec<BirdCandidate>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if refresh_listener_days(&cache, &fallback, now()).await.is_empty() {
                warn!("Fallback list empty; no global daily bird");
            }

            let wait = until_midnight_at_offset(now(), EASTERNMOST_OFFSET_MINUTES);
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Global daily scheduler stopped");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    })
}
