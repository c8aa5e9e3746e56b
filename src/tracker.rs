use crate::config::TrackerConfig;
use crate::messages::BridgeMessage;
use crate::proximity::{find_nearest_road, is_within_known_roads};
use crate::types::{GeoPoint, RoadSafetyData};

/// What the host should do after a position change.
#[derive(Clone, Debug, PartialEq)]
pub enum LocationUpdate {
    /// Outside the loaded roads (or forced): load data around the new position.
    Refetch,
    /// Still on known roads; only the marker moves.
    Covered { road_name: String, distance_m: f64 },
}

/// Walk that moves by a fixed offset on every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedWalk {
    position: GeoPoint,
    step_lat: f64,
    step_lng: f64,
}

impl SimulatedWalk {
    pub fn new(start: GeoPoint, step_lat: f64, step_lng: f64) -> Self {
        SimulatedWalk { position: start, step_lat, step_lng }
    }
}

impl Iterator for SimulatedWalk {
    type Item = GeoPoint;

    fn next(&mut self) -> Option<GeoPoint> {
        self.position = GeoPoint::new(self.position.lat + self.step_lat, self.position.lng + self.step_lng);
        Some(self.position)
    }
}

/// Owns everything the location handler used to keep in globals:
/// the loaded roads, the trail walked so far and the simulation handle.
pub struct LocationTracker {
    config: TrackerConfig,
    roads: Option<RoadSafetyData>,
    position: Option<GeoPoint>,
    path: Vec<GeoPoint>,
    simulation: Option<SimulatedWalk>,
}

impl LocationTracker {
    pub fn new(config: TrackerConfig) -> Self {
        LocationTracker {
            config,
            roads: None,
            position: None,
            path: Vec::new(),
            simulation: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn position(&self) -> Option<GeoPoint> {
        self.position
    }

    pub fn path(&self) -> &[GeoPoint] {
        &self.path
    }

    pub fn clear_path(&mut self) {
        log::info!("Cleared movement path ({} points)", self.path.len());
        self.path.clear();
    }

    pub fn roads(&self) -> Option<&RoadSafetyData> {
        self.roads.as_ref()
    }

    /// Swap in a freshly loaded road set; the old one is dropped whole.
    pub fn replace_roads(&mut self, data: RoadSafetyData) {
        log::info!("Replaced road data: {} roads around {:.6}, {:.6}", data.roads.len(), data.center.lat, data.center.lng);
        self.roads = Some(data);
    }

    pub fn update_location(&mut self, point: GeoPoint, force: bool) -> LocationUpdate {
        self.position = Some(point);
        self.path.push(point);

        let Some(data) = self.roads.as_ref() else {
            return LocationUpdate::Refetch;
        };
        if force || !is_within_known_roads(point, &data.roads, self.config.threshold_m) {
            log::info!("Position {:.6}, {:.6}: reloading data", point.lat, point.lng);
            return LocationUpdate::Refetch;
        }

        match find_nearest_road(point, &data.roads) {
            Some(nearest) => {
                log::info!(
                    "Position {:.6}, {:.6}: near {} ({:.1}m)",
                    point.lat,
                    point.lng,
                    nearest.road.road_name,
                    nearest.distance_m
                );
                LocationUpdate::Covered {
                    road_name: nearest.road.road_name.clone(),
                    distance_m: nearest.distance_m,
                }
            }
            // Unreachable while coverage and nearest agree, but never worth a panic
            None => LocationUpdate::Refetch,
        }
    }

    /// Positions pushed by the native shell always reload.
    pub fn handle_bridge_message(&mut self, message: &BridgeMessage) -> Option<LocationUpdate> {
        let point = message.location()?;
        log::info!("Location from shell: {}, {}", point.lat, point.lng);
        Some(self.update_location(point, true))
    }

    pub fn is_simulating(&self) -> bool {
        self.simulation.is_some()
    }

    /// Start walking from the current position. Returns false if a walk is already running
    /// or there is no position to start from.
    pub fn start_simulation(&mut self) -> bool {
        if self.simulation.is_some() {
            return false;
        }
        let Some(start) = self.position else {
            return false;
        };

        log::info!("Starting simulated walk every {}ms", self.config.simulation_interval_ms);
        self.path = vec![start];
        self.simulation = Some(SimulatedWalk::new(start, self.config.simulation_step_lat, self.config.simulation_step_lng));
        true
    }

    pub fn stop_simulation(&mut self) {
        if self.simulation.take().is_some() {
            log::info!("Stopped simulated walk after {} points", self.path.len());
        }
    }

    /// Advance the walk one step. `None` when no walk is running.
    pub fn tick(&mut self) -> Option<LocationUpdate> {
        let next = self.simulation.as_mut()?.next()?;
        Some(self.update_location(next, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Road, RoadSafetySummary};

    fn civic_blvd_data() -> RoadSafetyData {
        RoadSafetyData {
            center: GeoPoint::new(25.0335, 121.5655),
            search_radius_m: 500,
            safety_radius_m: 200,
            summary: RoadSafetySummary::default(),
            roads: vec![Road::new(
                "Civic Blvd",
                "primary",
                vec![GeoPoint::new(25.0330, 121.5650), GeoPoint::new(25.0340, 121.5660)],
            )],
        }
    }

    #[test]
    fn first_fix_always_refetches() {
        let mut tracker = LocationTracker::new(TrackerConfig::default());
        assert_eq!(tracker.update_location(GeoPoint::new(25.0335, 121.5655), false), LocationUpdate::Refetch);
        assert_eq!(tracker.path().len(), 1);
    }

    #[test]
    fn stays_put_while_on_known_roads() {
        let mut tracker = LocationTracker::new(TrackerConfig::default());
        tracker.replace_roads(civic_blvd_data());

        match tracker.update_location(GeoPoint::new(25.0335, 121.5655), false) {
            LocationUpdate::Covered { road_name, distance_m } => {
                assert_eq!(road_name, "Civic Blvd");
                assert!(distance_m < 5.0);
            }
            other => panic!("expected coverage, got {other:?}"),
        }

        assert_eq!(tracker.update_location(GeoPoint::new(25.0500, 121.6000), false), LocationUpdate::Refetch);
        assert_eq!(tracker.position(), Some(GeoPoint::new(25.0500, 121.6000)));
    }

    #[test]
    fn forced_and_bridge_updates_refetch() {
        let mut tracker = LocationTracker::new(TrackerConfig::default());
        tracker.replace_roads(civic_blvd_data());
        let on_road = GeoPoint::new(25.0335, 121.5655);

        assert_eq!(tracker.update_location(on_road, true), LocationUpdate::Refetch);

        let msg = BridgeMessage::Location { latitude: on_road.lat, longitude: on_road.lng };
        assert_eq!(tracker.handle_bridge_message(&msg), Some(LocationUpdate::Refetch));

        let call = BridgeMessage::PhoneCall { number: "110".to_string() };
        assert_eq!(tracker.handle_bridge_message(&call), None);
        assert_eq!(tracker.path().len(), 2);
    }

    #[test]
    fn simulated_walk_leaves_the_known_area() {
        let mut tracker = LocationTracker::new(TrackerConfig::default());
        tracker.replace_roads(civic_blvd_data());

        assert!(!tracker.start_simulation(), "no position yet");
        assert_eq!(tracker.tick(), None);

        tracker.update_location(GeoPoint::new(25.0330, 121.5650), false);
        assert!(tracker.start_simulation());
        assert!(!tracker.start_simulation());
        assert_eq!(tracker.path().len(), 1);

        // First step is ~12 m off the start, still on the road
        assert!(matches!(tracker.tick(), Some(LocationUpdate::Covered { .. })));

        let mut updates = Vec::new();
        for _ in 0..20 {
            updates.push(tracker.tick().unwrap());
        }
        assert_eq!(updates.last(), Some(&LocationUpdate::Refetch));
        assert_eq!(tracker.path().len(), 22);

        tracker.stop_simulation();
        assert!(!tracker.is_simulating());
        assert_eq!(tracker.tick(), None);

        tracker.clear_path();
        assert!(tracker.path().is_empty());
    }

    #[test]
    fn walk_steps_by_configured_offset() {
        let mut walk = SimulatedWalk::new(GeoPoint::new(0.0, 0.0), 0.5, 0.25);
        assert_eq!(walk.next(), Some(GeoPoint::new(0.5, 0.25)));
        assert_eq!(walk.next(), Some(GeoPoint::new(1.0, 0.5)));
    }
}
