//! Fade curve definitions for the audio timeline
//!
//! Each curve has a gain formula (used to reason about layer loudness at a
//! point in time) and the name of the matching ffmpeg `afade` curve, so the
//! rendered fade follows the same shape the timeline assumes.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Fade curve types
///
/// - Linear: constant rate of change
/// - Exponential: slow start, fast finish (natural fade-in)
/// - Logarithmic: fast start, slow finish (natural fade-out)
/// - SCurve: smooth acceleration and deceleration
/// - EqualPower: constant perceived loudness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    Linear,
    /// v(t) = t²
    Exponential,
    /// v(t) = (1-t)² for fade-out
    Logarithmic,
    /// v(t) = 0.5 × (1 - cos(π × t))
    #[default]
    SCurve,
    /// v(t) = sin(t × π/2)
    EqualPower,
}

impl FadeCurve {
    /// Fade-in gain at normalized position `0.0..=1.0`
    pub fn calculate_fade_in(&self, position: f64) -> f64 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out gain at normalized position `0.0..=1.0`
    pub fn calculate_fade_out(&self, position: f64) -> f64 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Exponential | FadeCurve::Logarithmic => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::SCurve => 0.5 * (1.0 + (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// ffmpeg `afade` curve name with the same shape
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "tri",
            FadeCurve::Exponential => "exp",
            FadeCurve::Logarithmic => "log",
            FadeCurve::SCurve => "hsin",
            FadeCurve::EqualPower => "qsin",
        }
    }

    /// Parse from config strings
    ///
    /// Accepts `linear`, `exponential`, `logarithmic`, `cosine`/`s_curve`
    /// aliases and `equal_power`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Some(FadeCurve::Linear),
            "exponential" => Some(FadeCurve::Exponential),
            "logarithmic" => Some(FadeCurve::Logarithmic),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Some(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Some(FadeCurve::EqualPower),
            _ => None,
        }
    }

    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FadeCurve::Linear => "Linear",
            FadeCurve::Exponential => "Exponential",
            FadeCurve::Logarithmic => "Logarithmic",
            FadeCurve::SCurve => "S-Curve",
            FadeCurve::EqualPower => "Equal Power",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_in_bounds() {
        for curve in FadeCurve::all_variants() {
            let start_val = curve.calculate_fade_in(0.0);
            let end_val = curve.calculate_fade_in(1.0);
            assert!(start_val.abs() < 0.01, "{:?} fade-in at 0.0 = {}", curve, start_val);
            assert!((end_val - 1.0).abs() < 0.01, "{:?} fade-in at 1.0 = {}", curve, end_val);
        }
    }

    #[test]
    fn test_fade_out_bounds() {
        for curve in FadeCurve::all_variants() {
            let start_val = curve.calculate_fade_out(0.0);
            let end_val = curve.calculate_fade_out(1.0);
            assert!((start_val - 1.0).abs() < 0.01, "{:?} fade-out at 0.0 = {}", curve, start_val);
            assert!(end_val.abs() < 0.01, "{:?} fade-out at 1.0 = {}", curve, end_val);
        }
    }

    #[test]
    fn test_out_of_range_positions_clamp() {
        assert_eq!(FadeCurve::Linear.calculate_fade_in(-1.0), 0.0);
        assert_eq!(FadeCurve::Linear.calculate_fade_in(2.0), 1.0);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(FadeCurve::parse("cosine"), Some(FadeCurve::SCurve));
        assert_eq!(FadeCurve::parse("S-Curve"), Some(FadeCurve::SCurve));
        assert_eq!(FadeCurve::parse("EXPONENTIAL"), Some(FadeCurve::Exponential));
        assert_eq!(FadeCurve::parse("equalpower"), Some(FadeCurve::EqualPower));
        assert_eq!(FadeCurve::parse("bogus"), None);
    }

    #[test]
    fn test_ffmpeg_names_unique() {
        let names: std::collections::HashSet<_> =
            FadeCurve::all_variants().iter().map(|c| c.ffmpeg_name()).collect();
        assert_eq!(names.len(), FadeCurve::all_variants().len());
    }
}
