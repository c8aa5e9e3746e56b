use geo::{BoundingRect, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use serde_json::{json, Map, Value as JsonValue};

use crate::safety::SafetyLevel;
use crate::types::Road;

fn road_properties(road: &Road) -> Map<String, JsonValue> {
    // The backend's level wins over re-classifying the score
    let level = road
        .level
        .and_then(SafetyLevel::from_road_level)
        .unwrap_or_else(|| SafetyLevel::for_road(road.safety_score));

    let mut properties = Map::new();
    properties.insert("road_name".to_string(), json!(road.road_name));
    properties.insert("road_type".to_string(), json!(road.road_type));
    properties.insert("safety_score".to_string(), json!(road.safety_score));
    properties.insert("level".to_string(), json!(level.road_level()));
    properties.insert("label".to_string(), json!(level.label()));
    properties.insert("color".to_string(), json!(level.color()));
    properties
}

/// Roads as a GeoJSON `FeatureCollection` of coloured line strings for the map layer.
pub fn roads_to_geojson(roads: &[Road]) -> GeoJson {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    let features: Vec<Feature> = roads
        .iter()
        .filter(|road| !road.is_degenerate())
        .map(|road| {
            let line: LineString<f64> = road.nodes.iter().map(|p| p.to_coord()).collect();
            if let Some(rect) = line.bounding_rect() {
                min_x = min_x.min(rect.min().x);
                min_y = min_y.min(rect.min().y);
                max_x = max_x.max(rect.max().x);
                max_y = max_y.max(rect.max().y);
            }
            Feature {
                geometry: Some(Geometry::new(Value::from(&line))),
                properties: Some(road_properties(road)),
                ..Default::default()
            }
        })
        .collect();

    let bbox = if features.is_empty() { None } else { Some(vec![min_x, min_y, max_x, max_y]) };

    GeoJson::FeatureCollection(FeatureCollection {
        bbox,
        features,
        foreign_members: None,
    })
}
