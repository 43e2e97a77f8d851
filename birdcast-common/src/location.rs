//! Listener locations and coarse location buckets
//!
//! Coordinates are rounded to one decimal place (roughly 11 km) so nearby
//! listeners share the same daily bird. This groups content; it is not a
//! privacy mechanism.

use serde::{Deserialize, Serialize};

/// Resolved listener location
///
/// Produced by an external geolocation lookup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub source_ip: Option<String>,
}

impl Location {
    /// Location from bare coordinates
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            city: String::new(),
            region: String::new(),
            country: String::new(),
            source_ip: None,
        }
    }

    /// Bucket key for this location
    pub fn key(&self) -> LocationKey {
        location_key(self.latitude, self.longitude)
    }

    /// Human-friendly place name, most specific first
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.city.as_str(), self.region.as_str(), self.country.as_str()]
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        if parts.is_empty() {
            format!("{:.2}, {:.2}", self.latitude, self.longitude)
        } else {
            parts.join(", ")
        }
    }
}

/// Coarse geographic bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Round a coordinate to one decimal place, folding -0.0 into 0.0
fn bucket(value: f64) -> f64 {
    (value * 10.0).round() / 10.0 + 0.0
}

/// Build the bucket key for a coordinate pair
///
/// ```
/// use birdcast_common::location::location_key;
///
/// assert_eq!(location_key(51.5074, -0.1278).as_str(), "51.5,-0.1");
/// assert_eq!(location_key(51.52, -0.13), location_key(51.48, -0.07));
/// ```
pub fn location_key(latitude: f64, longitude: f64) -> LocationKey {
    LocationKey(format!("{:.1},{:.1}", bucket(latitude), bucket(longitude)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_bucket_same_key() {
        let a = location_key(40.71, -74.01);
        let b = location_key(40.74, -73.96);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "40.7,-74.0");
    }

    #[test]
    fn test_different_bucket_different_key() {
        assert_ne!(location_key(40.71, -74.01), location_key(40.76, -74.01));
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(location_key(-0.04, 0.04).as_str(), "0.0,0.0");
        assert_eq!(location_key(-0.04, 0.0), location_key(0.04, -0.0));
    }

    #[test]
    fn test_display_name() {
        let mut loc = Location::from_coordinates(1.0, 2.0);
        assert_eq!(loc.display_name(), "1.00, 2.00");
        loc.city = "Leiden".to_string();
        loc.country = "Netherlands".to_string();
        assert_eq!(loc.display_name(), "Leiden, Netherlands");
    }
}
