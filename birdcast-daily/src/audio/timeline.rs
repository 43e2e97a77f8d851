//! Timing plans for multi-layer compositions
//!
//! Pure arithmetic: given layer durations, each template produces a
//! [`TimingPlan`] describing when every layer starts, how loud it is over
//! time, and where the final fade-out sits. The fade-out never starts
//! before the voice has finished, and the plan's total is always
//! `fade_out_start + fade_out_duration`.

use birdcast_common::FadeCurve;
use serde::{Deserialize, Serialize};

/// Voice duration assumed when probing is unavailable
pub const FALLBACK_VOICE_SECONDS: f64 = 4.0;

/// Chime duration assumed when probing is unavailable
pub const FALLBACK_CHIME_SECONDS: f64 = 1.5;

/// What a layer contributes to the mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    Ambience,
    Chime,
    Voice,
    Birdsong,
}

impl std::fmt::Display for LayerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LayerRole::Ambience => "ambience",
            LayerRole::Chime => "chime",
            LayerRole::Voice => "voice",
            LayerRole::Birdsong => "birdsong",
        };
        f.write_str(name)
    }
}

/// Raw audio for one layer
#[derive(Debug, Clone, PartialEq)]
pub struct AudioLayer {
    pub bytes: Vec<u8>,
    /// Measured duration, if known
    pub duration_seconds: Option<f64>,
    pub role: LayerRole,
}

impl AudioLayer {
    pub fn new(role: LayerRole, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            duration_seconds: None,
            role,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Gain of a layer over the plan's timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VolumeSchedule {
    Constant(f64),
    /// `before` until `at_seconds`, then `after`
    Ducked {
        before: f64,
        after: f64,
        at_seconds: f64,
    },
}

impl VolumeSchedule {
    /// Gain at a point on the timeline (fades not applied)
    pub fn gain_at(&self, seconds: f64) -> f64 {
        match *self {
            VolumeSchedule::Constant(v) => v,
            VolumeSchedule::Ducked {
                before,
                after,
                at_seconds,
            } => {
                if seconds < at_seconds {
                    before
                } else {
                    after
                }
            }
        }
    }
}

/// Placement of one layer in the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerTiming {
    pub role: LayerRole,
    pub delay_ms: u64,
    /// Audible length; for looped layers this is the span to fill
    pub duration_seconds: f64,
    pub volume: VolumeSchedule,
    /// Repeat the source until the plan ends
    pub looped: bool,
    /// Fade-in applied from the layer's start
    pub fade_in_seconds: f64,
}

impl LayerTiming {
    pub fn delay_seconds(&self) -> f64 {
        self.delay_ms as f64 / 1000.0
    }

    pub fn end_seconds(&self) -> f64 {
        self.delay_seconds() + self.duration_seconds
    }
}

/// Complete timing for one composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPlan {
    pub lead_in_seconds: f64,
    pub layers: Vec<LayerTiming>,
    pub duck_start_seconds: Option<f64>,
    pub fade_in_duration_seconds: f64,
    pub fade_out_start_seconds: f64,
    pub fade_out_duration_seconds: f64,
    pub total_duration_seconds: f64,
    pub fade_curve: FadeCurve,
}

impl TimingPlan {
    /// Delay of each layer in milliseconds, in layer order
    pub fn per_layer_delay_ms(&self) -> Vec<u64> {
        self.layers.iter().map(|l| l.delay_ms).collect()
    }

    pub fn layer(&self, role: LayerRole) -> Option<&LayerTiming> {
        self.layers.iter().find(|l| l.role == role)
    }

    /// End of the voice layer on the timeline
    pub fn voice_end_seconds(&self) -> Option<f64> {
        self.layer(LayerRole::Voice).map(LayerTiming::end_seconds)
    }
}

fn usable_duration(measured: Option<f64>, fallback: f64) -> f64 {
    match measured {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => fallback,
    }
}

fn to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

// ============================================================================
// Templates
// ============================================================================

/// Ambience + chime + voice opener
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntroTemplate {
    pub fade_in_seconds: f64,
    pub pre_voice_volume: f64,
    pub during_voice_volume: f64,
    pub chime_delay_seconds: f64,
    pub chime_volume: f64,
    pub voice_delay_seconds: f64,
    pub voice_boost: f64,
    pub fade_out_seconds: f64,
    pub fallback_voice_seconds: f64,
}

impl Default for IntroTemplate {
    fn default() -> Self {
        Self {
            fade_in_seconds: 2.5,
            pre_voice_volume: 0.35,
            during_voice_volume: 0.15,
            chime_delay_seconds: 0.5,
            chime_volume: 0.6,
            voice_delay_seconds: 3.0,
            voice_boost: 2.0,
            fade_out_seconds: 2.0,
            fallback_voice_seconds: FALLBACK_VOICE_SECONDS,
        }
    }
}

impl IntroTemplate {
    /// Ambience fades in, chime plays during the fade, ambience ducks as
    /// the voice starts, fade-out begins when the voice ends.
    pub fn plan(&self, voice_seconds: Option<f64>, chime_seconds: Option<f64>, curve: FadeCurve) -> TimingPlan {
        let voice = usable_duration(voice_seconds, self.fallback_voice_seconds);
        let chime = usable_duration(chime_seconds, FALLBACK_CHIME_SECONDS);

        let voice_end = self.voice_delay_seconds + voice;
        let chime_end = self.chime_delay_seconds + chime;
        let fade_out_start = voice_end.max(chime_end - self.fade_out_seconds);
        let total = fade_out_start + self.fade_out_seconds;

        TimingPlan {
            lead_in_seconds: self.voice_delay_seconds,
            layers: vec![
                LayerTiming {
                    role: LayerRole::Ambience,
                    delay_ms: 0,
                    duration_seconds: total,
                    volume: VolumeSchedule::Ducked {
                        before: self.pre_voice_volume,
                        after: self.during_voice_volume,
                        at_seconds: self.voice_delay_seconds,
                    },
                    looped: true,
                    fade_in_seconds: self.fade_in_seconds,
                },
                LayerTiming {
                    role: LayerRole::Chime,
                    delay_ms: to_ms(self.chime_delay_seconds),
                    duration_seconds: chime,
                    volume: VolumeSchedule::Constant(self.chime_volume),
                    looped: false,
                    fade_in_seconds: 0.0,
                },
                LayerTiming {
                    role: LayerRole::Voice,
                    delay_ms: to_ms(self.voice_delay_seconds),
                    duration_seconds: voice,
                    volume: VolumeSchedule::Constant(self.voice_boost),
                    looped: false,
                    fade_in_seconds: 0.0,
                },
            ],
            duck_start_seconds: Some(self.voice_delay_seconds),
            fade_in_duration_seconds: self.fade_in_seconds,
            fade_out_start_seconds: fade_out_start,
            fade_out_duration_seconds: self.fade_out_seconds,
            total_duration_seconds: total,
            fade_curve: curve,
        }
    }
}

/// Voice over a quiet bird-song bed, sized for a fixed-length card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutroTemplate {
    pub birdsong_volume: f64,
    pub voice_delay_seconds: f64,
    pub voice_boost: f64,
    pub padding_seconds: f64,
    pub fade_out_seconds: f64,
    pub max_total_seconds: f64,
    pub fallback_voice_seconds: f64,
}

impl Default for OutroTemplate {
    fn default() -> Self {
        Self {
            birdsong_volume: 0.15,
            voice_delay_seconds: 1.0,
            voice_boost: 2.0,
            padding_seconds: 4.0,
            fade_out_seconds: 2.0,
            max_total_seconds: 30.0,
            fallback_voice_seconds: FALLBACK_VOICE_SECONDS,
        }
    }
}

impl OutroTemplate {
    /// The cap shortens the padding after the voice; it never cuts speech.
    pub fn plan(&self, voice_seconds: Option<f64>, curve: FadeCurve) -> TimingPlan {
        let voice = usable_duration(voice_seconds, self.fallback_voice_seconds);
        let voice_end = self.voice_delay_seconds + voice;

        let floor = voice_end + self.fade_out_seconds;
        let cap = self.max_total_seconds.max(floor);
        let total = (voice_end + self.padding_seconds).clamp(floor, cap);
        let fade_out_start = total - self.fade_out_seconds;

        TimingPlan {
            lead_in_seconds: self.voice_delay_seconds,
            layers: vec![
                LayerTiming {
                    role: LayerRole::Birdsong,
                    delay_ms: 0,
                    duration_seconds: total,
                    volume: VolumeSchedule::Constant(self.birdsong_volume),
                    looped: true,
                    fade_in_seconds: 0.0,
                },
                LayerTiming {
                    role: LayerRole::Voice,
                    delay_ms: to_ms(self.voice_delay_seconds),
                    duration_seconds: voice,
                    volume: VolumeSchedule::Constant(self.voice_boost),
                    looped: false,
                    fade_in_seconds: 0.0,
                },
            ],
            duck_start_seconds: None,
            fade_in_duration_seconds: 0.0,
            fade_out_start_seconds: fade_out_start,
            fade_out_duration_seconds: self.fade_out_seconds,
            total_duration_seconds: total,
            fade_curve: curve,
        }
    }
}

/// Narration voice over an ambience bed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationTemplate {
    pub bed_volume: f64,
    pub fade_in_seconds: f64,
    pub voice_delay_seconds: f64,
    pub voice_boost: f64,
    pub fade_out_seconds: f64,
    pub fallback_voice_seconds: f64,
}

impl Default for NarrationTemplate {
    fn default() -> Self {
        Self {
            bed_volume: 0.12,
            fade_in_seconds: 1.5,
            voice_delay_seconds: 1.5,
            voice_boost: 1.6,
            fade_out_seconds: 2.5,
            fallback_voice_seconds: FALLBACK_VOICE_SECONDS,
        }
    }
}

impl NarrationTemplate {
    pub fn plan(&self, voice_seconds: Option<f64>, curve: FadeCurve) -> TimingPlan {
        let voice = usable_duration(voice_seconds, self.fallback_voice_seconds);
        let voice_end = self.voice_delay_seconds + voice;
        let total = voice_end + self.fade_out_seconds;

        TimingPlan {
            lead_in_seconds: self.voice_delay_seconds,
            layers: vec![
                LayerTiming {
                    role: LayerRole::Ambience,
                    delay_ms: 0,
                    duration_seconds: total,
                    volume: VolumeSchedule::Constant(self.bed_volume),
                    looped: true,
                    fade_in_seconds: self.fade_in_seconds,
                },
                LayerTiming {
                    role: LayerRole::Voice,
                    delay_ms: to_ms(self.voice_delay_seconds),
                    duration_seconds: voice,
                    volume: VolumeSchedule::Constant(self.voice_boost),
                    looped: false,
                    fade_in_seconds: 0.0,
                },
            ],
            duck_start_seconds: None,
            fade_in_duration_seconds: self.fade_in_seconds,
            fade_out_start_seconds: voice_end,
            fade_out_duration_seconds: self.fade_out_seconds,
            total_duration_seconds: total,
            fade_curve: curve,
        }
    }
}

/// The three composition shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CompositionTemplate {
    Intro(IntroTemplate),
    Outro(OutroTemplate),
    Narration(NarrationTemplate),
}

impl CompositionTemplate {
    pub fn intro() -> Self {
        CompositionTemplate::Intro(IntroTemplate::default())
    }

    pub fn outro() -> Self {
        CompositionTemplate::Outro(OutroTemplate::default())
    }

    pub fn narration() -> Self {
        CompositionTemplate::Narration(NarrationTemplate::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompositionTemplate::Intro(_) => "intro",
            CompositionTemplate::Outro(_) => "outro",
            CompositionTemplate::Narration(_) => "narration",
        }
    }

    /// Layers besides the voice that must be present to mix
    pub fn required_roles(&self) -> &'static [LayerRole] {
        match self {
            CompositionTemplate::Intro(_) => &[LayerRole::Ambience, LayerRole::Chime],
            CompositionTemplate::Outro(_) => &[LayerRole::Birdsong],
            CompositionTemplate::Narration(_) => &[LayerRole::Ambience],
        }
    }

    /// Plan from whatever durations the layers carry
    pub fn plan(&self, layers: &[AudioLayer], curve: FadeCurve) -> TimingPlan {
        let duration_of = |role: LayerRole| {
            layers
                .iter()
                .find(|l| l.role == role)
                .and_then(|l| l.duration_seconds)
        };
        let voice = duration_of(LayerRole::Voice);

        match self {
            CompositionTemplate::Intro(t) => t.plan(voice, duration_of(LayerRole::Chime), curve),
            CompositionTemplate::Outro(t) => t.plan(voice, curve),
            CompositionTemplate::Narration(t) => t.plan(voice, curve),
        }
    }
}
