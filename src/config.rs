use serde::Deserialize;

use crate::proximity::DEFAULT_THRESHOLD_M;

/// Where and how wide to load road data. Parsed from the host's JSON; missing fields take defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub base_url: String,
    pub overpass_url: String,
    pub search_radius_m: u32,
    pub safety_radius_m: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            base_url: "http://localhost:5000".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            search_radius_m: 500,
            safety_radius_m: 200,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Coverage threshold for the known-road check.
    pub threshold_m: f64,
    /// Per-tick offset of the simulated walk, in degrees.
    pub simulation_step_lat: f64,
    pub simulation_step_lng: f64,
    /// How often the host should call `tick` while simulating.
    pub simulation_interval_ms: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            threshold_m: DEFAULT_THRESHOLD_M,
            // roughly 11 m north and a little east
            simulation_step_lat: 0.0001,
            simulation_step_lng: 0.00005,
            simulation_interval_ms: 2000,
        }
    }
}

impl TrackerConfig {
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}

impl LoaderConfig {
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}
