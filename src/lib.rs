use wasm_bindgen::prelude::*;
use log::Level;
use wasm_bindgen_futures::future_to_promise;
use wasm_bindgen_futures::js_sys;
use serde::Serialize;
use std::str::FromStr;

pub mod config;
pub mod error;
pub mod messages;
pub mod overlay;
pub mod proximity;
pub mod road_loader;
pub mod safety;
pub mod tracker;
pub mod types;

pub use self::error::Error;
use self::config::{LoaderConfig, TrackerConfig};
use self::messages::BridgeMessage;
use self::proximity::{find_nearest_road, is_within_known_roads, DEFAULT_THRESHOLD_M};
use self::road_loader::RoadSafetyClient;
use self::safety::{score_roads, AreaResources, AreaSafety, PointFeature};
use self::tracker::{LocationTracker, LocationUpdate};
use self::types::{GeoPoint, Road, RoadSafetyData};

/// Installs the browser console logger. `level` is a `log` level name; unknown names mean "info".
#[wasm_bindgen]
pub fn rust_init(level: Option<String>) {
    let level = level
        .and_then(|l| Level::from_str(&l).ok())
        .unwrap_or(Level::Info);
    // A second call finds the logger already set; nothing to do then.
    if console_log::init_with_level(level).is_ok() {
        log::info!("Logger initialized from library");
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error(e: Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_roads(roads_json: &str) -> error::Result<Vec<Road>> {
    Ok(serde_json::from_str(roads_json)?)
}

/// `roads_json` is the `roads` array of a road safety response.
#[wasm_bindgen]
pub fn is_within_known_roads_js(lat: f64, lng: f64, roads_json: &str, threshold_m: Option<f64>) -> Result<bool, JsValue> {
    let roads = parse_roads(roads_json).map_err(js_error)?;
    Ok(is_within_known_roads(GeoPoint::new(lat, lng), &roads, threshold_m.unwrap_or(DEFAULT_THRESHOLD_M)))
}

#[derive(Serialize)]
struct NearestRoad<'a> {
    road: &'a Road,
    distance: f64,
}

/// `{ road, distance }` for the closest road, or `null`.
#[wasm_bindgen]
pub fn find_nearest_road_js(lat: f64, lng: f64, roads_json: &str) -> Result<JsValue, JsValue> {
    let roads = parse_roads(roads_json).map_err(js_error)?;
    match find_nearest_road(GeoPoint::new(lat, lng), &roads) {
        Some(nearest) => to_js(&NearestRoad { road: nearest.road, distance: nearest.distance_m }),
        None => Ok(JsValue::NULL),
    }
}

/// GeoJSON string of the road overlay.
#[wasm_bindgen]
pub fn roads_geojson(roads_json: &str) -> Result<String, JsValue> {
    let roads = parse_roads(roads_json).map_err(js_error)?;
    let geojson = overlay::roads_to_geojson(&roads);
    serde_json::to_string(&geojson).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Area resources grouped by kind, flattened into the summary the map header shows.
#[wasm_bindgen]
pub fn summarize_area(resources_json: &str) -> Result<JsValue, JsValue> {
    let area: AreaResources = serde_json::from_str(resources_json).map_err(|e| js_error(e.into()))?;
    to_js(&AreaSafety::from(area))
}

pub async fn load_road_safety_data_async(lat: f64, lng: f64, config_json: &str) -> error::Result<RoadSafetyData> {
    let client = RoadSafetyClient::new(LoaderConfig::from_json(config_json)?);
    client.fetch_nearby_roads(GeoPoint::new(lat, lng)).await
}

/// Resolves to the parsed road safety response; rejects with the error message.
#[wasm_bindgen]
pub fn load_road_safety_data(lat: f64, lng: f64, config_json: String) -> js_sys::Promise {
    future_to_promise(async move {
        match load_road_safety_data_async(lat, lng, &config_json).await {
            Ok(data) => to_js(&data),
            Err(e) => {
                log::error!("Loading road safety data failed: {}", e);
                Err(js_error(e))
            }
        }
    })
}

/// Score `roads_json` against `features_json` (`[{type, name, lat, lng}]`) around a center.
#[wasm_bindgen]
pub fn score_roads_js(lat: f64, lng: f64, roads_json: &str, features_json: &str, config_json: &str) -> Result<JsValue, JsValue> {
    let roads = parse_roads(roads_json).map_err(js_error)?;
    let features: Vec<PointFeature> = serde_json::from_str(features_json).map_err(|e| js_error(e.into()))?;
    let config = LoaderConfig::from_json(config_json).map_err(js_error)?;
    let data = score_roads(GeoPoint::new(lat, lng), roads, &features, config.search_radius_m, config.safety_radius_m);
    to_js(&data)
}

pub async fn load_overpass_road_safety_async(
    lat: f64,
    lng: f64,
    features_json: &str,
    config_json: &str,
) -> error::Result<RoadSafetyData> {
    let features: Vec<PointFeature> = serde_json::from_str(features_json)?;
    let client = RoadSafetyClient::new(LoaderConfig::from_json(config_json)?);
    client.fetch_scored_roads(GeoPoint::new(lat, lng), &features).await
}

/// Like `load_road_safety_data`, but scores Overpass roads locally.
#[wasm_bindgen]
pub fn load_overpass_road_safety(lat: f64, lng: f64, features_json: String, config_json: String) -> js_sys::Promise {
    future_to_promise(async move {
        match load_overpass_road_safety_async(lat, lng, &features_json, &config_json).await {
            Ok(data) => to_js(&data),
            Err(e) => {
                log::error!("Scoring Overpass roads failed: {}", e);
                Err(js_error(e))
            }
        }
    })
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum UpdateForJs {
    Refetch,
    Covered { road_name: String, distance_m: f64 },
    Ignored,
}

impl From<Option<LocationUpdate>> for UpdateForJs {
    fn from(update: Option<LocationUpdate>) -> Self {
        match update {
            Some(LocationUpdate::Refetch) => UpdateForJs::Refetch,
            Some(LocationUpdate::Covered { road_name, distance_m }) => UpdateForJs::Covered { road_name, distance_m },
            None => UpdateForJs::Ignored,
        }
    }
}

/// Browser handle around `LocationTracker`. Freeing it drops the simulation with it.
#[wasm_bindgen]
pub struct SafetyMapSession {
    tracker: LocationTracker,
}

#[wasm_bindgen]
impl SafetyMapSession {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<SafetyMapSession, JsValue> {
        let config = TrackerConfig::from_json(config_json).map_err(js_error)?;
        Ok(SafetyMapSession { tracker: LocationTracker::new(config) })
    }

    /// `{ action: "refetch" }` or `{ action: "covered", road_name, distance_m }`.
    pub fn update_location(&mut self, lat: f64, lng: f64, force: bool) -> Result<JsValue, JsValue> {
        let update = self.tracker.update_location(GeoPoint::new(lat, lng), force);
        to_js(&UpdateForJs::from(Some(update)))
    }

    /// Raw string from the shell's message channel. Non-location messages come back as `ignored`.
    pub fn handle_bridge_message(&mut self, raw: &str) -> Result<JsValue, JsValue> {
        let message = BridgeMessage::decode(raw).map_err(js_error)?;
        to_js(&UpdateForJs::from(self.tracker.handle_bridge_message(&message)))
    }

    pub fn replace_roads(&mut self, data_json: &str) -> Result<(), JsValue> {
        let data: RoadSafetyData = serde_json::from_str(data_json).map_err(|e| js_error(e.into()))?;
        self.tracker.replace_roads(data);
        Ok(())
    }

    pub fn path(&self) -> Result<JsValue, JsValue> {
        to_js(&self.tracker.path())
    }

    pub fn clear_path(&mut self) {
        self.tracker.clear_path();
    }

    pub fn start_simulation(&mut self) -> bool {
        self.tracker.start_simulation()
    }

    pub fn stop_simulation(&mut self) {
        self.tracker.stop_simulation();
    }

    pub fn is_simulating(&self) -> bool {
        self.tracker.is_simulating()
    }

    /// Interval the host timer should call `tick` at.
    pub fn simulation_interval_ms(&self) -> u32 {
        self.tracker.config().simulation_interval_ms
    }

    pub fn tick(&mut self) -> Result<JsValue, JsValue> {
        to_js(&UpdateForJs::from(self.tracker.tick()))
    }
}
