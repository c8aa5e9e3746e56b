//! Decides whether a position is still covered by road data already in hand.
//!
//! Segment projection works in a planar lat/lng frame without a cosine-of-latitude
//! correction. That is only accurate over tens of metres, which is the range the
//! coverage threshold lives in; the reported distance itself is always haversine.

use crate::types::{GeoPoint, Road};

/// Radius within which a position counts as already covered.
pub const DEFAULT_THRESHOLD_M: f64 = 30.0;

/// Nearest road to a point and how far away it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProximityResult<'a> {
    pub road: &'a Road,
    pub distance_m: f64,
}

/// Great-circle distance in meters (haversine, 6 371 km sphere).
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let ap = haversine_rs::point::Point { latitude: a.lat, longitude: a.lng };
    let bp = haversine_rs::point::Point { latitude: b.lat, longitude: b.lng };
    haversine_rs::distance(ap, bp, haversine_rs::units::Unit::Meters)
}

/// Shortest distance in meters from `point` to the segment `start`-`end`.
pub fn point_to_segment_distance(point: GeoPoint, start: GeoPoint, end: GeoPoint) -> f64 {
    // x is longitude, y is latitude, both relative to the segment start
    let px = point.lng - start.lng;
    let py = point.lat - start.lat;
    let dx = end.lng - start.lng;
    let dy = end.lat - start.lat;

    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return distance_meters(point, start);
    }

    let t = ((px * dx + py * dy) / length_squared).clamp(0.0, 1.0);
    let projected = GeoPoint::new(start.lat + t * dy, start.lng + t * dx);

    distance_meters(point, projected)
}

/// True as soon as any segment of any road lies within `threshold_m` of `point`.
pub fn is_within_known_roads(point: GeoPoint, roads: &[Road], threshold_m: f64) -> bool {
    for road in roads.iter().filter(|r| !r.is_degenerate()) {
        for (start, end) in road.segments() {
            let distance = point_to_segment_distance(point, start, end);
            if distance <= threshold_m {
                log::debug!("Within known road {} ({:.1}m)", road.road_name, distance);
                return true;
            }
        }
    }

    log::debug!("Left the known road area at {:.6}, {:.6}", point.lat, point.lng);
    false
}

/// Exhaustive scan for the closest road. Earlier roads win ties.
pub fn find_nearest_road(point: GeoPoint, roads: &[Road]) -> Option<ProximityResult<'_>> {
    let mut nearest: Option<ProximityResult> = None;

    for road in roads.iter().filter(|r| !r.is_degenerate()) {
        for (start, end) in road.segments() {
            let distance_m = point_to_segment_distance(point, start, end);
            if nearest.map_or(true, |n| distance_m < n.distance_m) {
                nearest = Some(ProximityResult { road, distance_m });
            }
        }
    }

    nearest
}
