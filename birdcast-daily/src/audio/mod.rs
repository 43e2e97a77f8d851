//! Audio timeline composition
//!
//! `timeline` computes timing plans, `filter_graph` compiles them for the
//! external renderer, `ffmpeg` runs the tools, and `composer` ties them
//! together with the degrade path.

pub mod composer;
pub mod ffmpeg;
pub mod filter_graph;
pub mod timeline;

pub use composer::{AudioTimelineComposer, ComposeOutcome, Composition};
pub use ffmpeg::{DurationProbe, FfmpegRenderer, FfprobeDurationProbe, Renderer};
pub use filter_graph::FilterGraph;
pub use timeline::{
    AudioLayer, CompositionTemplate, IntroTemplate, LayerRole, LayerTiming, NarrationTemplate,
    OutroTemplate, TimingPlan, VolumeSchedule,
};
