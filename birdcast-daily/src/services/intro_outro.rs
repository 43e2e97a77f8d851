//! Daily intro/outro variant selection
//!
//! The outro's content type follows the day of the week. Pre-rendered files
//! live in one directory and are named `{type}_{index}_{voice}.mp3`; the
//! day's file is picked from the sorted pool by day seed. An empty pool for
//! a voice returns `None` and the caller retries with the default voice.

use birdcast_common::selector::{select, SelectionDomain};
use birdcast_common::time::day_seed;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Prefix of the intro pool
pub const INTRO_PREFIX: &str = "intro";

/// Outro content types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Joke,
    Wisdom,
    Teaser,
    Challenge,
    FunFact,
}

impl ContentType {
    /// File name prefix for this content type
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ContentType::Joke => "joke",
            ContentType::Wisdom => "wisdom",
            ContentType::Teaser => "teaser",
            ContentType::Challenge => "challenge",
            ContentType::FunFact => "funfact",
        }
    }

    /// Spoken stand-in when no pre-rendered file exists
    pub fn fallback_line(&self) -> &'static str {
        match self {
            ContentType::Joke => {
                "Why do birds fly south for the winter? Because it's too far to walk! See you tomorrow, bird friends."
            }
            ContentType::Wisdom => {
                "Like a bird building its nest one twig at a time, little steps make big things. See you tomorrow!"
            }
            ContentType::Teaser => {
                "Tomorrow we'll meet another amazing bird. Who could it be? Listen again to find out!"
            }
            ContentType::Challenge => {
                "Here's your challenge: step outside today and count how many different bird songs you can hear!"
            }
            ContentType::FunFact => {
                "Fun fact: some birds can sleep with one eye open! Thanks for listening, see you tomorrow."
            }
        }
    }
}

/// Content type for a weekday
///
/// Mon/Fri joke, Tue/Thu teaser, Wed wisdom, Sat challenge, Sun fun fact.
pub fn select_variant(weekday: Weekday) -> ContentType {
    match weekday {
        Weekday::Mon | Weekday::Fri => ContentType::Joke,
        Weekday::Tue | Weekday::Thu => ContentType::Teaser,
        Weekday::Wed => ContentType::Wisdom,
        Weekday::Sat => ContentType::Challenge,
        Weekday::Sun => ContentType::FunFact,
    }
}

/// Content type for a numeric day (0 = Sunday .. 6 = Saturday)
///
/// Anything outside that range gets a teaser.
pub fn select_variant_index(day: u32) -> ContentType {
    match day {
        0 => ContentType::FunFact,
        1 | 5 => ContentType::Joke,
        2 | 4 => ContentType::Teaser,
        3 => ContentType::Wisdom,
        6 => ContentType::Challenge,
        _ => ContentType::Teaser,
    }
}

/// Selects pre-rendered intro/outro files for a voice and day
#[derive(Debug, Clone)]
pub struct DailyIntroOutroSelector {
    voices_dir: PathBuf,
}

impl DailyIntroOutroSelector {
    pub fn new(voices_dir: impl Into<PathBuf>) -> Self {
        Self {
            voices_dir: voices_dir.into(),
        }
    }

    pub fn voices_dir(&self) -> &Path {
        &self.voices_dir
    }

    /// Sorted pool of `{prefix}_{variant}_{voice}.mp3` files
    pub fn pool(&self, prefix: &str, voice_name: &str) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.voices_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                is_variant_file(&entry.file_name().to_string_lossy(), prefix, voice_name)
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        files
    }

    /// The day's file for a prefix and voice, if the pool is non-empty
    pub fn select_file(&self, prefix: &str, voice_name: &str, date: NaiveDate) -> Option<PathBuf> {
        let pool = self.pool(prefix, voice_name);
        let domain = if prefix == INTRO_PREFIX {
            SelectionDomain::IntroVariant
        } else {
            SelectionDomain::OutroVariant
        };
        let seed = day_seed(date).decorrelate(domain);
        let index = select(seed, pool.len()).ok()?;
        debug!(prefix, voice = voice_name, pool = pool.len(), index, "Selected pre-rendered file");
        pool.into_iter().nth(index)
    }

    /// The day's outro file for a weekday's content type
    pub fn select_outro(&self, weekday: Weekday, voice_name: &str, date: NaiveDate) -> Option<PathBuf> {
        self.select_file(select_variant(weekday).file_prefix(), voice_name, date)
    }

    /// The day's intro file
    pub fn select_intro(&self, voice_name: &str, date: NaiveDate) -> Option<PathBuf> {
        self.select_file(INTRO_PREFIX, voice_name, date)
    }
}

/// `{prefix}_{variant}_{voice}.mp3` where the variant is one segment
fn is_variant_file(file_name: &str, prefix: &str, voice_name: &str) -> bool {
    let variant = file_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(".mp3"))
        .and_then(|rest| rest.strip_suffix(voice_name))
        .and_then(|rest| rest.strip_suffix('_'));
    matches!(variant, Some(v) if !v.is_empty() && !v.contains('_'))
}
