//! Cascading regional bird resolver
//!
//! Resolution order:
//! 1. Search tiers from tight to wide; stop at the first tier with any
//!    observations. Upstream failures count as "no observations".
//! 2. Deduplicate by species code, first occurrence wins, upstream order kept.
//! 3. Draw up to `max_candidate_attempts` species at random (injected RNG)
//!    and keep the first one with a playable recording.
//! 4. Otherwise rotate through the global fallback list starting at the
//!    day's slot, `(year*365 + dayOfYear) % len`.
//! 5. Enrich the winner with an encyclopedia summary, or a synthetic one.
//!
//! Only a fallback list with no playable species at all is an error.

use crate::config::{ResolverConfig, SearchTier};
use crate::error::{Error, Result, UpstreamError};
use crate::services::fallback_birds::{fallback_birds, known_taxonomy};
use crate::types::{
    AudioSource, BirdCandidate, Encyclopedia, Observation, ObservationSource, Recording,
    ResolutionSource, ResolvedBird, SharedRng,
};
use birdcast_common::time::fallback_day_index;
use birdcast_common::Location;
use chrono::NaiveDate;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves the bird of the day for a location
pub struct RegionalBirdResolver {
    observations: Arc<dyn ObservationSource>,
    audio: Arc<dyn AudioSource>,
    encyclopedia: Arc<dyn Encyclopedia>,
    config: ResolverConfig,
    fallback: Vec<BirdCandidate>,
    rng: SharedRng,
}

impl RegionalBirdResolver {
    pub fn new(
        observations: Arc<dyn ObservationSource>,
        audio: Arc<dyn AudioSource>,
        encyclopedia: Arc<dyn Encyclopedia>,
        config: ResolverConfig,
        rng: SharedRng,
    ) -> Self {
        Self {
            observations,
            audio,
            encyclopedia,
            config,
            fallback: fallback_birds(),
            rng,
        }
    }

    /// Replace the global fallback list
    pub fn with_fallback_list(mut self, fallback: Vec<BirdCandidate>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback_list(&self) -> &[BirdCandidate] {
        &self.fallback
    }

    /// The day's slot in the fallback rotation, without any upstream checks
    pub fn fallback_bird(&self, date: NaiveDate) -> Option<BirdCandidate> {
        fallback_for_day(&self.fallback, date).cloned()
    }

    /// Resolve the bird for a location and day
    pub async fn resolve(&self, location: &Location, date: NaiveDate) -> Result<ResolvedBird> {
        let regional = match self.search_tiers(location).await {
            Some((tier, observations)) => {
                let pool = dedupe_by_species(observations);
                debug!(
                    radius_km = tier.radius_km,
                    days = tier.days,
                    species = pool.len(),
                    "Candidate pool built"
                );
                self.pick_with_recording(location, pool)
                    .await
                    .map(|(candidate, recording)| {
                        let source = ResolutionSource::Regional {
                            radius_km: tier.radius_km,
                            days: tier.days,
                        };
                        (candidate, recording, source)
                    })
            }
            None => None,
        };

        let (candidate, recording, source) = match regional {
            Some(found) => found,
            None => {
                let (candidate, recording) = self.pick_fallback(date).await?;
                (candidate, recording, ResolutionSource::GlobalFallback)
            }
        };

        let candidate = with_taxonomy(candidate);
        let description = self.describe(&candidate).await;

        info!(
            bird = %candidate.common_name,
            scientific = %candidate.scientific_name,
            source = %source,
            "Bird of the day resolved"
        );

        Ok(ResolvedBird {
            candidate,
            recording: Some(recording),
            description,
            source,
        })
    }

    /// Walk the tiers in order; each tier is queried exactly once
    async fn search_tiers(&self, location: &Location) -> Option<(SearchTier, Vec<Observation>)> {
        for tier in &self.config.tiers {
            let result = self
                .observations
                .recent_observations(
                    location.latitude,
                    location.longitude,
                    tier.radius_km,
                    tier.days,
                )
                .await;

            match result {
                Ok(observations) if !observations.is_empty() => {
                    debug!(
                        radius_km = tier.radius_km,
                        days = tier.days,
                        count = observations.len(),
                        "Observations found"
                    );
                    return Some((*tier, observations));
                }
                Ok(_) => {
                    debug!(radius_km = tier.radius_km, days = tier.days, "No observations in tier");
                }
                Err(e) => {
                    warn!(
                        radius_km = tier.radius_km,
                        days = tier.days,
                        error = %e,
                        "Observation lookup failed; treating tier as empty"
                    );
                }
            }
        }
        None
    }

    /// Random draws over the pool until a species has a playable recording
    async fn pick_with_recording(
        &self,
        location: &Location,
        mut pool: Vec<Observation>,
    ) -> Option<(BirdCandidate, Recording)> {
        let region = region_label(location);
        let mut attempts = 0;

        while !pool.is_empty() && attempts < self.config.max_candidate_attempts {
            attempts += 1;
            let index = self.draw_index(pool.len());
            let observation = pool.swap_remove(index);
            let candidate = BirdCandidate::from_observation(&observation, &region);

            match self.recording_for(&candidate).await {
                Ok(recording) => return Some((candidate, recording)),
                Err(e) => {
                    warn!(
                        attempt = attempts,
                        species = %candidate.common_name,
                        error = %e,
                        "No recording for candidate; trying another"
                    );
                }
            }
        }

        warn!(attempts, "Regional candidates exhausted; using global fallback");
        None
    }

    /// Rotate through the fallback list from the day's slot
    async fn pick_fallback(&self, date: NaiveDate) -> Result<(BirdCandidate, Recording)> {
        let len = self.fallback.len();
        if len == 0 {
            return Err(Error::ExhaustedFallback("fallback list is empty".to_string()));
        }

        let start = (fallback_day_index(date) % len as u64) as usize;
        for offset in 0..len {
            let candidate = &self.fallback[(start + offset) % len];
            match self.recording_for(candidate).await {
                Ok(recording) => {
                    if offset > 0 {
                        info!(offset, species = %candidate.common_name, "Fallback advanced past unplayable species");
                    }
                    return Ok((candidate.clone(), recording));
                }
                Err(e) => {
                    warn!(species = %candidate.common_name, error = %e, "Fallback species has no recording");
                }
            }
        }

        Err(Error::ExhaustedFallback(format!(
            "none of the {} fallback species has a playable recording",
            len
        )))
    }

    /// Recording lookup by scientific name, then common name
    async fn recording_for(&self, candidate: &BirdCandidate) -> std::result::Result<Recording, UpstreamError> {
        match self.audio.best_recording(&candidate.scientific_name).await {
            Ok(recording) => Ok(recording),
            Err(first) => {
                debug!(species = %candidate.scientific_name, error = %first, "Retrying recording lookup by common name");
                self.audio.best_recording(&candidate.common_name).await
            }
        }
    }

    /// Encyclopedia text for a candidate, or a synthetic description
    pub async fn describe(&self, candidate: &BirdCandidate) -> String {
        for name in [&candidate.scientific_name, &candidate.common_name] {
            if name.trim().is_empty() {
                continue;
            }
            match self.encyclopedia.summary(name).await {
                Ok(summary) => return summary.extract,
                Err(e) => debug!(name = %name, error = %e, "No encyclopedia summary"),
            }
        }
        synthetic_description(candidate)
    }

    fn draw_index(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..len)
    }
}

/// The day's slot in a fallback list: `(year*365 + dayOfYear) % len`
///
/// Consecutive days within one year step through the list, so the
/// rotation repeats every `len` days.
pub fn fallback_for_day(list: &[BirdCandidate], date: NaiveDate) -> Option<&BirdCandidate> {
    if list.is_empty() {
        return None;
    }
    list.get((fallback_day_index(date) % list.len() as u64) as usize)
}

/// Keep the first observation per species code, preserving upstream order
pub fn dedupe_by_species(observations: Vec<Observation>) -> Vec<Observation> {
    let mut seen = HashSet::new();
    observations
        .into_iter()
        .filter(|o| seen.insert(o.species_code.clone()))
        .collect()
}

fn region_label(location: &Location) -> String {
    if !location.region.trim().is_empty() {
        location.region.clone()
    } else {
        location.display_name()
    }
}

pub(crate) fn with_taxonomy(mut candidate: BirdCandidate) -> BirdCandidate {
    if candidate.family.is_none() {
        if let Some((family, order)) = known_taxonomy(&candidate.scientific_name) {
            candidate.family = Some(family.to_string());
            candidate.order = Some(order.to_string());
        }
    }
    candidate
}

/// Description used when no encyclopedia text is available
pub fn synthetic_description(candidate: &BirdCandidate) -> String {
    let mut text = format!(
        "The {} is a bird known to scientists as {}.",
        candidate.common_name, candidate.scientific_name
    );
    if let Some(family) = &candidate.family {
        text.push_str(&format!(" It belongs to the family {}.", family));
    }
    if !candidate.region.trim().is_empty() && candidate.region != "Global" {
        text.push_str(&format!(" It has been seen recently around {}.", candidate.region));
    }
    text
}
