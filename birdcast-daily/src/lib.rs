//! birdcast-daily library interface
//!
//! Daily bird program: regional bird resolution with cascading fallbacks,
//! per-day deterministic content selection, a daily content cache and
//! multi-layer audio composition through an external renderer.

pub mod audio;
pub mod config;
pub mod error;
pub mod program;
pub mod services;
pub mod types;

pub use crate::config::DailyConfig;
pub use crate::error::{Error, RenderError, Result, UpstreamError};
pub use crate::program::{Collaborators, DailyProgram, DailyProgramService, ProgramRequest};
