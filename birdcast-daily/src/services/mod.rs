//! Service modules for the daily program
//!
//! HTTP collaborators, bird resolution, the daily content cache,
//! intro/outro selection and narration text.

pub mod bird_resolver;
pub mod content_cache;
pub mod ebird_client;
pub mod elevenlabs_client;
pub mod fact_generator;
pub mod fallback_birds;
pub mod intro_outro;
pub mod rate_limiter;
pub mod wikipedia_client;
pub mod xeno_canto_client;

pub use bird_resolver::{
    dedupe_by_species, fallback_for_day, synthetic_description, RegionalBirdResolver,
};
pub use content_cache::{cache_key, spawn_daily_sweep, CacheEntry, DailyContentCache};
pub use ebird_client::EbirdClient;
pub use elevenlabs_client::ElevenLabsClient;
pub use fact_generator::TemplateFactGenerator;
pub use fallback_birds::fallback_birds;
pub use intro_outro::{select_variant, select_variant_index, ContentType, DailyIntroOutroSelector};
pub use rate_limiter::RateLimiter;
pub use wikipedia_client::WikipediaClient;
pub use xeno_canto_client::XenoCantoClient;
