use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ** Coordinates **

/// WGS84 position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }

    // GeoJSON orders coordinates as [x, y]
    pub(crate) fn to_coord(self) -> geo::Coord<f64> {
        geo::Coord { x: self.lng, y: self.lat }
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lng): (f64, f64)) -> Self {
        GeoPoint { lat, lng }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

// ** Road safety data types **

/// A named polyline approximating a real road, as returned by the backend.
///
/// `nodes` travel as `[lat, lng]` pairs; their order defines the path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Road {
    #[serde(default = "unknown_road_name")]
    pub road_name: String,
    #[serde(default = "unknown_road_type")]
    pub road_type: String,
    #[serde(with = "lat_lng_pairs")]
    pub nodes: Vec<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<GeoPoint>,
    #[serde(default)]
    pub cctv_count: u32,
    #[serde(default)]
    pub metro_count: u32,
    #[serde(default)]
    pub robbery_count: u32,
    #[serde(default)]
    pub streetlight_count: u32,
    #[serde(default)]
    pub police_count: u32,
    #[serde(default)]
    pub safety_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

pub(crate) fn unknown_road_name() -> String {
    "Unknown Road".to_string()
}

pub(crate) fn unknown_road_type() -> String {
    "unknown".to_string()
}

impl Road {
    /// Road with geometry only; scores and counters left at zero.
    pub fn new(road_name: impl Into<String>, road_type: impl Into<String>, nodes: Vec<GeoPoint>) -> Self {
        Road {
            road_name: road_name.into(),
            road_type: road_type.into(),
            nodes,
            center: None,
            cctv_count: 0,
            metro_count: 0,
            robbery_count: 0,
            streetlight_count: 0,
            police_count: 0,
            safety_score: 0.0,
            level: None,
            label: None,
        }
    }

    /// Fewer than two nodes: no segment to measure against.
    pub fn is_degenerate(&self) -> bool {
        self.nodes.len() < 2
    }

    /// Consecutive node pairs, in path order.
    pub fn segments(&self) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
        self.nodes.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Arithmetic mean of the nodes, the same point the backend scores around.
    pub fn centroid(&self) -> Option<GeoPoint> {
        if self.nodes.is_empty() {
            return None;
        }
        let n = self.nodes.len() as f64;
        let (lat, lng) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
        Some(GeoPoint::new(lat / n, lng / n))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadSafetySummary {
    pub total_roads: u32,
    pub total_cctv: u32,
    pub total_metro: u32,
    pub total_robbery: u32,
    pub total_streetlight: u32,
    pub total_police: u32,
    pub overall_score: f64,
    pub level: u8,
    pub label: String,
}

/// Response of `/get_nearby_roads_safety`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadSafetyData {
    pub center: GeoPoint,
    #[serde(default)]
    pub search_radius_m: u32,
    #[serde(default)]
    pub safety_radius_m: u32,
    #[serde(default)]
    pub summary: RoadSafetySummary,
    #[serde(default)]
    pub roads: Vec<Road>,
}

mod lat_lng_pairs {
    use super::*;

    pub fn serialize<S: Serializer>(nodes: &[GeoPoint], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(nodes.iter().map(|p| (p.lat, p.lng)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<GeoPoint>, D::Error> {
        let pairs = Vec::<(f64, f64)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(GeoPoint::from).collect())
    }
}
