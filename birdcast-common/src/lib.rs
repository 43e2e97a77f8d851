//! # Birdcast Common Library
//!
//! Shared code for the Birdcast daily program crates including:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - Day seeds and calendar helpers
//! - Location bucketing for shared daily content
//! - Deterministic per-day selection
//! - Fade curve definitions used by the audio timeline

pub mod config;
pub mod error;
pub mod fade_curves;
pub mod location;
pub mod selector;
pub mod time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
pub use location::{location_key, Location, LocationKey};
pub use selector::{select, select_from, SelectionDomain};
pub use time::{day_seed, DaySeed};
