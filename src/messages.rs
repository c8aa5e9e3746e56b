//! Messages crossing the two process boundaries: the native shell bridge and the relay socket.
//!
//! Both are decoded once, where they arrive; everything past that point works on the enums.

use serde::{Deserialize, Serialize};

use crate::types::{GeoPoint, Road};
use crate::error::Result;

/// Messages exchanged with the native shell hosting the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "snake_case")]
pub enum BridgeMessage {
    Location { latitude: f64, longitude: f64 },
    Notification { title: String, body: String },
    PhoneCall { number: String },
}

impl BridgeMessage {
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn location(&self) -> Option<GeoPoint> {
        match *self {
            BridgeMessage::Location { latitude, longitude } => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        }
    }
}

/// Messages fanned out by the relay to the other connected viewers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RelayMessage {
    LocationUpdate {
        lat: f64,
        lng: f64,
        /// Milliseconds since the Unix epoch.
        timestamp: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        roads: Option<Vec<Road>>,
        #[serde(default, rename = "safetyData", skip_serializing_if = "Option::is_none")]
        safety_data: Option<serde_json::Value>,
    },
}

impl RelayMessage {
    pub fn location_update(point: GeoPoint, timestamp: u64) -> Self {
        RelayMessage::LocationUpdate {
            lat: point.lat,
            lng: point.lng,
            timestamp,
            roads: None,
            safety_data: None,
        }
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
