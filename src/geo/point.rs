use serde::{Deserialize, Serialize};

/// A WGS-84 geographic point. Latitude in `[-90, 90]`, longitude in `[-180, 180]`.
///
/// Equality is bit-exact on the two doubles — never use it as a proximity
/// test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}
