//! Tunable thresholds for the matcher, predictor, and controller, with
//! defaults matching spec.md exactly. Each tree is `serde::Deserialize` so
//! an integrator can load overrides from a config file, the same shape
//! `butterfly-plan` uses for its own TOML config.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub search_radius_meters: f64,
    pub bearing_weight: f64,
    pub max_bearing_difference: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            search_radius_meters: 70.0,
            bearing_weight: 1.4,
            max_bearing_difference: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub next_distance_meters: f64,
    pub next_heading_tolerance: f64,
    pub link_penalty: f64,
    pub forward_probe_meters: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            next_distance_meters: 160.0,
            next_heading_tolerance: 50.0,
            link_penalty: 12.0,
            forward_probe_meters: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub min_update_interval_secs: f64,
    pub chunk_radius_meters: f64,
    pub switch_score_delta: f64,
    pub stable_count: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_update_interval_secs: 0.7,
            chunk_radius_meters: 1200.0,
            switch_score_delta: 6.0,
            stable_count: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 256 * 1024 * 1024,
        }
    }
}
