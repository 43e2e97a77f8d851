//! Multi-layer composition with graceful degrade
//!
//! Fallback tiers, checked in order, each a complete outcome:
//! 1. render tool absent: the voice alone
//! 2. a required layer missing or empty: the voice alone
//! 3. render failed: diagnostics logged, the voice alone
//! 4. rendered mix
//!
//! Composition never fails; the degraded result is always the voice
//! layer's bytes, unchanged.

use super::ffmpeg::{DurationProbe, Renderer};
use super::filter_graph::FilterGraph;
use super::timeline::{AudioLayer, CompositionTemplate, LayerRole, TimingPlan};
use crate::error::RenderError;
use birdcast_common::FadeCurve;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a composition ended
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeOutcome {
    Rendered,
    ToolMissing,
    LayerMissing(LayerRole),
    RenderFailed(String),
    /// No voice layer was supplied; nothing to fall back to
    NoVoice,
}

impl ComposeOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, ComposeOutcome::Rendered)
    }
}

/// Result of [`AudioTimelineComposer::compose_detailed`]
#[derive(Debug, Clone)]
pub struct Composition {
    pub bytes: Vec<u8>,
    pub outcome: ComposeOutcome,
    pub plan: Option<TimingPlan>,
}

/// Mixes voice, ambience, chime and bird-song layers into one track
pub struct AudioTimelineComposer {
    probe: Arc<dyn DurationProbe>,
    renderer: Arc<dyn Renderer>,
    fade_curve: FadeCurve,
}

impl AudioTimelineComposer {
    pub fn new(probe: Arc<dyn DurationProbe>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            probe,
            renderer,
            fade_curve: FadeCurve::default(),
        }
    }

    pub fn with_fade_curve(mut self, curve: FadeCurve) -> Self {
        self.fade_curve = curve;
        self
    }

    /// Compose the layers; degrades to the voice bytes
    pub async fn compose(&self, layers: Vec<AudioLayer>, template: &CompositionTemplate) -> Vec<u8> {
        self.compose_detailed(layers, template).await.bytes
    }

    pub async fn compose_detailed(
        &self,
        mut layers: Vec<AudioLayer>,
        template: &CompositionTemplate,
    ) -> Composition {
        let kind = template.name();

        let voice = match layers.iter().find(|l| l.role == LayerRole::Voice) {
            Some(layer) if !layer.is_empty() => layer.bytes.clone(),
            _ => {
                error!(template = kind, "No voice layer to compose");
                return Composition {
                    bytes: Vec::new(),
                    outcome: ComposeOutcome::NoVoice,
                    plan: None,
                };
            }
        };
        let degraded = |outcome: ComposeOutcome| Composition {
            bytes: voice.clone(),
            outcome,
            plan: None,
        };

        if !self.renderer.is_available().await {
            warn!(template = kind, "Render tool not available; returning voice only");
            return degraded(ComposeOutcome::ToolMissing);
        }

        for role in template.required_roles() {
            let present = layers.iter().any(|l| l.role == *role && !l.is_empty());
            if !present {
                warn!(template = kind, layer = %role, "Required layer missing; returning voice only");
                return degraded(ComposeOutcome::LayerMissing(*role));
            }
        }

        self.fill_durations(&mut layers).await;

        let plan = template.plan(&layers, self.fade_curve);
        let graph = FilterGraph::compile(&plan);

        let mut inputs: Vec<&[u8]> = Vec::with_capacity(plan.layers.len());
        for timing in &plan.layers {
            match layers.iter().find(|l| l.role == timing.role) {
                Some(layer) => inputs.push(&layer.bytes),
                None => {
                    warn!(template = kind, layer = %timing.role, "Planned layer not supplied; returning voice only");
                    return degraded(ComposeOutcome::LayerMissing(timing.role));
                }
            }
        }

        debug!(
            template = kind,
            total_seconds = plan.total_duration_seconds,
            fade_out_start = plan.fade_out_start_seconds,
            delays_ms = ?plan.per_layer_delay_ms(),
            "Timing plan computed"
        );

        match self.renderer.render(&graph, &inputs).await {
            Ok(bytes) if !bytes.is_empty() => {
                info!(
                    template = kind,
                    bytes = bytes.len(),
                    seconds = plan.total_duration_seconds,
                    "Composition rendered"
                );
                Composition {
                    bytes,
                    outcome: ComposeOutcome::Rendered,
                    plan: Some(plan),
                }
            }
            Ok(_) => {
                warn!(template = kind, "Renderer returned no audio; returning voice only");
                degraded(ComposeOutcome::RenderFailed("empty output".to_string()))
            }
            Err(e) => {
                match &e {
                    RenderError::NonZeroExit { stderr, code, .. } => {
                        warn!(template = kind, ?code, stderr = %stderr, "Render failed; returning voice only")
                    }
                    other => warn!(template = kind, error = %other, "Render failed; returning voice only"),
                }
                degraded(ComposeOutcome::RenderFailed(e.to_string()))
            }
        }
    }

    /// Probe voice and chime durations that are not yet known
    async fn fill_durations(&self, layers: &mut [AudioLayer]) {
        for layer in layers.iter_mut() {
            let needs_probe = matches!(layer.role, LayerRole::Voice | LayerRole::Chime)
                && layer.duration_seconds.is_none();
            if !needs_probe {
                continue;
            }
            match self.probe.probe(&layer.bytes).await {
                Ok(seconds) => layer.duration_seconds = Some(seconds),
                Err(e) => {
                    debug!(layer = %layer.role, error = %e, "Duration probe failed; using template default")
                }
            }
        }
    }
}
