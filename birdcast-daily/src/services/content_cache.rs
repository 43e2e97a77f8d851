//! Daily content cache
//!
//! In-memory map of (card, date, location bucket) → bird of the day, plus a
//! location-independent "global daily" slot per date. One `RwLock` guards the
//! whole map. Concurrent misses for the same key may both resolve and both
//! write; the last writer wins.
//!
//! Entries are keyed by the listener's date, so eviction follows the
//! westernmost listener: a background task wakes at each UTC-12 midnight and
//! evicts every entry dated before the oldest date still current anywhere.

use crate::types::ResolvedBird;
use birdcast_common::time::{
    earliest_listener_date, now, until_midnight_at_offset, yesterday, WESTERNMOST_OFFSET_MINUTES,
};
use birdcast_common::LocationKey;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const GLOBAL_DAILY_PREFIX: &str = "GLOBAL_DAILY_";

/// Cached bird of the day for one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub bird_name: String,
    pub scientific_name: Option<String>,
    pub bird_audio_url: Option<String>,
    pub date: NaiveDate,
    pub updated_at: DateTime<Utc>,
    pub location_key: String,
    /// Bird as first resolved, returned unchanged on later hits
    #[serde(default)]
    pub resolved: Option<ResolvedBird>,
}

/// Cache key for a card, date and location bucket
pub fn cache_key(card_id: &str, date: NaiveDate, location_key: &LocationKey) -> String {
    raw_key(card_id, date, location_key.as_str())
}

fn raw_key(card_id: &str, date: NaiveDate, location_key: &str) -> String {
    format!("{}_{}_{}", card_id, date.format("%Y-%m-%d"), location_key)
}

fn global_daily_key(date: NaiveDate) -> String {
    format!("{}{}", GLOBAL_DAILY_PREFIX, date.format("%Y-%m-%d"))
}

/// Mutex-guarded daily content cache
#[derive(Debug, Clone, Default)]
pub struct DailyContentCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl DailyContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the entry for a card/date/location
    pub async fn get(
        &self,
        card_id: &str,
        date: NaiveDate,
        location_key: &LocationKey,
    ) -> Option<CacheEntry> {
        let key = cache_key(card_id, date, location_key);
        self.entries.read().await.get(&key).cloned()
    }

    /// Store a bird name for a card/date/location (upsert)
    pub async fn put(
        &self,
        card_id: &str,
        date: NaiveDate,
        location_key: &LocationKey,
        bird_name: &str,
    ) {
        let entry = CacheEntry {
            bird_name: bird_name.to_string(),
            scientific_name: None,
            bird_audio_url: None,
            date,
            updated_at: Utc::now(),
            location_key: location_key.to_string(),
            resolved: None,
        };
        self.put_entry(card_id, entry).await;
    }

    /// Store a fully populated entry; key derived from the entry itself
    pub async fn put_entry(&self, card_id: &str, entry: CacheEntry) {
        let key = raw_key(card_id, entry.date, &entry.location_key);
        debug!(key = %key, bird = %entry.bird_name, "Caching bird of the day");
        self.entries.write().await.insert(key, entry);
    }

    /// Set the location-independent bird for a date
    pub async fn set_global_daily(&self, date: NaiveDate, bird_name: &str) {
        let entry = CacheEntry {
            bird_name: bird_name.to_string(),
            scientific_name: None,
            bird_audio_url: None,
            date,
            updated_at: Utc::now(),
            location_key: String::new(),
            resolved: None,
        };
        info!(%date, bird = %bird_name, "Global daily bird set");
        self.entries.write().await.insert(global_daily_key(date), entry);
    }

    /// Location-independent bird for a date, if one was set
    pub async fn get_global_daily(&self, date: NaiveDate) -> Option<String> {
        self.entries
            .read()
            .await
            .get(&global_daily_key(date))
            .map(|e| e.bird_name.clone())
    }

    /// Evict everything dated the day before `today` or earlier
    ///
    /// `today` must be the oldest date any listener is on.
    pub async fn sweep_at(&self, today: NaiveDate) -> usize {
        let cutoff = yesterday(today);
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.date > cutoff);
        let removed = before - entries.len();
        info!(%today, removed, remaining = entries.len(), "Daily cache sweep");
        removed
    }

    /// Sweep as of an instant, keeping every date still current somewhere
    pub async fn sweep_as_of(&self, at: DateTime<Utc>) -> usize {
        self.sweep_at(earliest_listener_date(at)).await
    }

    pub async fn sweep(&self) -> usize {
        self.sweep_as_of(now()).await
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Spawn the midnight sweep loop
///
/// Sleeps until the next midnight at the westernmost offset, sweeps,
/// repeats. Stops when the token is cancelled.
pub fn spawn_daily_sweep(cache: DailyContentCache, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = until_midnight_at_offset(now(), WESTERNMOST_OFFSET_MINUTES);
            debug!(seconds = wait.as_secs(), "Next cache sweep scheduled");
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Cache sweep task stopped");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    cache.sweep().await;
                }
            }
        }
    })
}
