use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::LoaderConfig;
use crate::safety::{score_roads, PointFeature};
use crate::types::{unknown_road_name, unknown_road_type, BoundingBox, GeoPoint, Road, RoadSafetyData};
use crate::error::{Error, Result};

/// Sphere radius for the bbox offsets; the same sphere `distance_meters` measures on.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Square-ish box around `center`, `radius_m` to each side.
pub fn bounding_box(center: GeoPoint, radius_m: f64) -> BoundingBox {
    let lat_offset = (radius_m / EARTH_RADIUS_M).to_degrees();
    let lng_offset = lat_offset / center.lat.to_radians().cos();

    BoundingBox {
        south: center.lat - lat_offset,
        west: center.lng - lng_offset,
        north: center.lat + lat_offset,
        east: center.lng + lng_offset,
    }
}

/// Walkable roads: every highway except motorways and trunks.
pub fn overpass_query(bbox: &BoundingBox) -> String {
    format!(r#"
    [out:json][timeout:25];
    (
      way["highway"]["highway"!~"motorway|motorway_link|trunk|trunk_link"]({}, {}, {}, {});
    );
    out body;
    >;
    out skel qt;
    "#,
    bbox.south,
    bbox.west,
    bbox.north,
    bbox.east)
}

fn field<'a>(element: &'a Value, key: &str) -> Result<&'a Value> {
    element
        .get(key)
        .ok_or_else(|| Error::Malformed(format!("element without \"{}\"", key)))
}

fn as_f64(element: &Value, key: &str) -> Result<f64> {
    field(element, key)?
        .as_f64()
        .ok_or_else(|| Error::Malformed(format!("\"{}\" is not a number", key)))
}

fn as_u64(element: &Value, key: &str) -> Result<u64> {
    field(element, key)?
        .as_u64()
        .ok_or_else(|| Error::Malformed(format!("\"{}\" is not an id", key)))
}

fn tag(element: &Value, key: &str) -> Option<String> {
    element.get("tags")?.get(key)?.as_str().map(str::to_string)
}

// A way as Overpass gives it, before its node ids are resolved
struct WayInfo {
    name: String,
    highway: String,
    node_ids: Vec<u64>,
}

/// Turn an Overpass `out body; >; out skel` response into roads, one per way.
pub fn parse_overpass_roads(json: &Value) -> Result<Vec<Road>> {
    let elements = json
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Malformed("response has no \"elements\" array".to_string()))?;

    // Ways may list nodes that only appear later in the response
    let mut nodes = HashMap::new();
    let mut ways = Vec::new();
    for element in elements {
        match element.get("type").and_then(Value::as_str) {
            Some("node") => {
                let id = as_u64(element, "id")?;
                let point = GeoPoint::new(as_f64(element, "lat")?, as_f64(element, "lon")?);
                nodes.insert(id, point);
            }
            Some("way") => {
                let node_ids = field(element, "nodes")?
                    .as_array()
                    .ok_or_else(|| Error::Malformed("way \"nodes\" is not an array".to_string()))?
                    .iter()
                    .map(|n| n.as_u64().ok_or_else(|| Error::Malformed("way node is not an id".to_string())))
                    .collect::<Result<Vec<u64>>>()?;
                ways.push(WayInfo {
                    name: tag(element, "name").unwrap_or_else(unknown_road_name),
                    highway: tag(element, "highway").unwrap_or_else(unknown_road_type),
                    node_ids,
                });
            }
            other => log::debug!("Skipping Overpass element of type {:?}", other),
        }
    }

    let mut roads = Vec::with_capacity(ways.len());
    for way in ways {
        let resolved: Option<Vec<GeoPoint>> = way.node_ids.iter().map(|id| nodes.get(id).copied()).collect();
        let Some(points) = resolved else {
            log::warn!("Way {} references nodes missing from the response", way.name);
            continue;
        };
        let mut road = Road::new(way.name, way.highway, points);
        if road.is_degenerate() {
            continue;
        }
        road.center = road.centroid();
        roads.push(road);
    }

    Ok(roads)
}

/// HTTP collaborator for the safety backend and Overpass.
pub struct RoadSafetyClient {
    client: Client,
    config: LoaderConfig,
}

impl RoadSafetyClient {
    pub fn new(config: LoaderConfig) -> Self {
        RoadSafetyClient { client: Client::new(), config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Scored road segments around `center` from `/get_nearby_roads_safety`.
    pub async fn fetch_nearby_roads(&self, center: GeoPoint) -> Result<RoadSafetyData> {
        let url = format!("{}/get_nearby_roads_safety", self.config.base_url.trim_end_matches('/'));
        log::info!("Loading road safety data around {:.6}, {:.6}", center.lat, center.lng);

        let response = self
            .client
            .get(url)
            .query(&[
                ("center_lat", center.lat.to_string()),
                ("center_lng", center.lng.to_string()),
                ("search_radius_m", self.config.search_radius_m.to_string()),
                ("safety_radius_m", self.config.safety_radius_m.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }

        let data = response.json::<RoadSafetyData>().await?;
        log::info!("Loaded {} roads (overall score {})", data.roads.len(), data.summary.overall_score);
        Ok(data)
    }

    /// Unscored road geometry straight from Overpass.
    pub async fn fetch_overpass_roads(&self, bbox: &BoundingBox) -> Result<Vec<Road>> {
        let response = self
            .client
            .post(&self.config.overpass_url)
            .body(overpass_query(bbox))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }

        let json = response.json::<Value>().await?;
        let roads = parse_overpass_roads(&json)?;
        log::info!("Found {} road segments", roads.len());
        Ok(roads)
    }

    /// Overpass roads within the search radius of `center`, scored against `features`.
    pub async fn fetch_scored_roads(&self, center: GeoPoint, features: &[PointFeature]) -> Result<RoadSafetyData> {
        let bbox = bounding_box(center, self.config.search_radius_m as f64);
        let roads = self.fetch_overpass_roads(&bbox).await?;
        Ok(score_roads(
            center,
            roads,
            features,
            self.config.search_radius_m,
            self.config.safety_radius_m,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bbox_is_wider_in_longitude_away_from_equator() {
        let center = GeoPoint::new(25.033964, 121.564468);
        let bbox = bounding_box(center, 500.0);

        let lat_half = bbox.north - center.lat;
        let lng_half = bbox.east - center.lng;
        assert!((center.lat - bbox.south - lat_half).abs() < 1e-12);
        assert!(lng_half > lat_half);

        // ~500 m north of the center
        let north = crate::proximity::distance_meters(center, GeoPoint::new(bbox.north, center.lng));
        assert!((north - 500.0).abs() < 0.01, "{north}");
    }

    #[test]
    fn query_excludes_motorways() {
        let query = overpass_query(&BoundingBox { south: 1.0, west: 2.0, north: 3.0, east: 4.0 });
        assert!(query.contains("(1, 2, 3, 4)"));
        assert!(query.contains(r#""highway"!~"motorway|motorway_link|trunk|trunk_link""#));
    }

    #[test]
    fn parses_ways_declared_before_their_nodes() {
        let response = json!({
            "elements": [
                {"type": "way", "id": 10, "nodes": [1, 2, 3], "tags": {"name": "松仁路", "highway": "secondary"}},
                {"type": "way", "id": 11, "nodes": [3, 4], "tags": {"highway": "footway"}},
                {"type": "node", "id": 1, "lat": 25.0330, "lon": 121.5650},
                {"type": "node", "id": 2, "lat": 25.0335, "lon": 121.5655},
                {"type": "node", "id": 3, "lat": 25.0340, "lon": 121.5660},
                {"type": "node", "id": 4, "lat": 25.0345, "lon": 121.5660}
            ]
        });

        let roads = parse_overpass_roads(&response).unwrap();
        assert_eq!(roads.len(), 2);
        assert_eq!(roads[0].road_name, "松仁路");
        assert_eq!(roads[0].road_type, "secondary");
        assert_eq!(roads[0].nodes.len(), 3);
        let center = roads[0].center.unwrap();
        assert!((center.lat - 25.0335).abs() < 1e-9 && (center.lng - 121.5655).abs() < 1e-9);
        assert_eq!(roads[1].road_name, "Unknown Road");
        assert_eq!(roads[1].road_type, "footway");
    }

    #[test]
    fn skips_short_and_dangling_ways() {
        let response = json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 25.0, "lon": 121.0},
                {"type": "node", "id": 2, "lat": 25.1, "lon": 121.1},
                {"type": "way", "id": 20, "nodes": [1]},
                {"type": "way", "id": 21, "nodes": [1, 99]},
                {"type": "way", "id": 22, "nodes": [1, 2]},
                {"type": "relation", "id": 30}
            ]
        });

        let roads = parse_overpass_roads(&response).unwrap();
        assert_eq!(roads.len(), 1);
        assert_eq!(roads[0].nodes, vec![GeoPoint::new(25.0, 121.0), GeoPoint::new(25.1, 121.1)]);
    }

    #[test]
    fn malformed_responses_are_errors() {
        assert!(matches!(parse_overpass_roads(&json!({})), Err(Error::Malformed(_))));
        assert!(matches!(
            parse_overpass_roads(&json!({"elements": [{"type": "node", "id": 1, "lat": "north"}]})),
            Err(Error::Malformed(_))
        ));
        assert!(matches!(
            parse_overpass_roads(&json!({"elements": [{"type": "way", "id": 1, "nodes": ["a"]}]})),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn overpass_roads_score_like_the_backend() {
        let response = json!({
            "elements": [
                {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"name": "松仁路", "highway": "secondary"}},
                {"type": "node", "id": 1, "lat": 25.0330, "lon": 121.5650},
                {"type": "node", "id": 2, "lat": 25.0340, "lon": 121.5660}
            ]
        });
        let features: Vec<PointFeature> = serde_json::from_value(json!([
            {"type": "police", "name": "信義分局", "lat": 25.0336, "lng": 121.5656},
            {"type": "robbery_incident", "lat": 25.0334, "lng": 121.5654},
            {"type": "robbery_incident", "lat": 25.0900, "lng": 121.6000}
        ]))
        .unwrap();

        let roads = parse_overpass_roads(&response).unwrap();
        let data = score_roads(GeoPoint::new(25.0335, 121.5655), roads, &features, 500, 200);

        let road = &data.roads[0];
        assert_eq!((road.police_count, road.robbery_count), (1, 1));
        // 0.3 - 0.5 * 0.5
        assert_eq!(road.safety_score, 5.0);
        assert_eq!(road.label.as_deref(), Some("危險"));
        assert_eq!(data.summary.total_robbery, 1);
        assert_eq!(data.summary.label, "危險");
    }

    #[test]
    fn backend_payload_deserializes() {
        let data: RoadSafetyData = serde_json::from_value(json!({
            "center": {"lat": 25.033964, "lng": 121.564468},
            "search_radius_m": 500,
            "safety_radius_m": 200,
            "summary": {
                "total_roads": 1, "total_cctv": 3, "total_metro": 0, "total_robbery": 0,
                "total_streetlight": 12, "total_police": 1, "overall_score": 66.0,
                "level": 3, "label": "安全"
            },
            "roads": [{
                "road_name": "Civic Blvd",
                "road_type": "primary",
                "nodes": [[25.0330, 121.5650], [25.0340, 121.5660]],
                "center": {"lat": 25.0335, "lng": 121.5655},
                "cctv_count": 3, "metro_count": 0, "robbery_count": 0,
                "streetlight_count": 12, "police_count": 1,
                "safety_score": 66.0, "level": 3, "label": "安全"
            }]
        }))
        .unwrap();

        assert_eq!(data.roads.len(), 1);
        assert_eq!(data.summary.label, "安全");
        assert_eq!(data.roads[0].streetlight_count, 12);
    }
}
