//! Safety scoring shared by the road segments and the area summary.

use serde::{Deserialize, Serialize};

use crate::proximity::distance_meters;
use crate::types::{GeoPoint, Road, RoadSafetyData, RoadSafetySummary};

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

fn density(count: u32, reference: f64) -> f64 {
    if reference > 0.0 {
        clamp01(count as f64 / reference)
    } else {
        0.0
    }
}

/// Safety features counted around a location.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeatureCounts {
    pub store: u32,
    pub cctv: u32,
    pub lamp: u32,
    pub mrt: u32,
    pub police: u32,
    pub theft: u32,
    pub robbery: u32,
}

/// Saturation point of each feature; a zero reference disables the term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreReferences {
    pub store: f64,
    pub cctv: f64,
    pub lamp: f64,
    pub mrt: f64,
    pub police: f64,
    pub theft: f64,
    pub robbery: f64,
}

impl Default for ScoreReferences {
    fn default() -> Self {
        ScoreReferences {
            store: 3.0,
            cctv: 5.0,
            lamp: 10.0,
            mrt: 3.0,
            police: 1.0,
            theft: 5.0,
            robbery: 2.0,
        }
    }
}

/// Score in 0..=100, rounded to two decimals.
///
/// `0.3*S + 0.1*C + 0.05*L + 0.3*P + 0.2*M - 0.4*Rt - 0.5*Rr`, each term a density in [0, 1].
pub fn safety_score(counts: &FeatureCounts, refs: &ScoreReferences) -> f64 {
    let raw = 0.3 * density(counts.store, refs.store)
        + 0.1 * density(counts.cctv, refs.cctv)
        + 0.05 * density(counts.lamp, refs.lamp)
        + 0.3 * density(counts.police, refs.police)
        + 0.2 * density(counts.mrt, refs.mrt)
        - 0.4 * density(counts.theft, refs.theft)
        - 0.5 * density(counts.robbery, refs.robbery);

    (clamp01(raw) * 100.0 * 100.0).round() / 100.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Danger,
}

impl SafetyLevel {
    /// Per-road classification used by the backend.
    pub fn for_road(score: f64) -> Self {
        Self::classify(score, 60.0)
    }

    /// Area classification used by the map header.
    pub fn for_area(score: f64) -> Self {
        Self::classify(score, 70.0)
    }

    fn classify(score: f64, safe_from: f64) -> Self {
        if score >= safe_from {
            SafetyLevel::Safe
        } else if score >= 40.0 {
            SafetyLevel::Caution
        } else {
            SafetyLevel::Danger
        }
    }

    /// Inverse of `road_level`.
    pub fn from_road_level(level: u8) -> Option<Self> {
        match level {
            3 => Some(SafetyLevel::Safe),
            2 => Some(SafetyLevel::Caution),
            1 => Some(SafetyLevel::Danger),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "安全",
            SafetyLevel::Caution => "需注意",
            SafetyLevel::Danger => "危險",
        }
    }

    // The backend counts up towards safety, the front-end counts up towards danger.
    pub fn road_level(self) -> u8 {
        match self {
            SafetyLevel::Safe => 3,
            SafetyLevel::Caution => 2,
            SafetyLevel::Danger => 1,
        }
    }

    pub fn area_level(self) -> u8 {
        4 - self.road_level()
    }

    /// Stroke colour for the road overlay.
    pub fn color(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "#22c55e",
            SafetyLevel::Caution => "#f59e0b",
            SafetyLevel::Danger => "#ef4444",
        }
    }
}

// ** Road scoring **

/// A point safety feature (camera, lamp, exit, station or incident) near the roads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    #[serde(rename = "type")]
    pub kind: PlaceKind,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl PointFeature {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

impl FeatureCounts {
    /// Count the features within `radius_m` of `center`.
    pub fn around(center: GeoPoint, features: &[PointFeature], radius_m: f64) -> Self {
        let mut counts = FeatureCounts::default();
        for feature in features {
            if distance_meters(center, feature.location()) > radius_m {
                continue;
            }
            match feature.kind {
                PlaceKind::Store => counts.store += 1,
                PlaceKind::Cctv => counts.cctv += 1,
                PlaceKind::Streetlight => counts.lamp += 1,
                PlaceKind::Metro => counts.mrt += 1,
                PlaceKind::Police => counts.police += 1,
                PlaceKind::RobberyIncident => counts.robbery += 1,
            }
        }
        counts
    }
}

fn apply_level(road: &mut Road) {
    let level = SafetyLevel::for_road(road.safety_score);
    road.level = Some(level.road_level());
    road.label = Some(level.label().to_string());
}

/// Score every road against the features around its centroid and total them up.
///
/// Stores are not part of the road response, so they never contribute here.
pub fn score_roads(
    center: GeoPoint,
    roads: Vec<Road>,
    features: &[PointFeature],
    search_radius_m: u32,
    safety_radius_m: u32,
) -> RoadSafetyData {
    let refs = ScoreReferences::default();
    let mut totals = FeatureCounts::default();

    let roads: Vec<Road> = roads
        .into_iter()
        .filter(|road| !road.is_degenerate())
        .map(|mut road| {
            let Some(centroid) = road.centroid() else {
                return road;
            };
            let counts = FeatureCounts {
                store: 0,
                ..FeatureCounts::around(centroid, features, safety_radius_m as f64)
            };

            road.center = Some(centroid);
            road.cctv_count = counts.cctv;
            road.metro_count = counts.mrt;
            road.robbery_count = counts.robbery;
            road.streetlight_count = counts.lamp;
            road.police_count = counts.police;
            road.safety_score = safety_score(&counts, &refs);
            apply_level(&mut road);

            totals.cctv += counts.cctv;
            totals.mrt += counts.mrt;
            totals.robbery += counts.robbery;
            totals.lamp += counts.lamp;
            totals.police += counts.police;
            road
        })
        .collect();

    let overall_score = safety_score(&totals, &refs);
    let overall = SafetyLevel::for_road(overall_score);
    log::info!("Scored {} roads, overall {} ({})", roads.len(), overall_score, overall.label());

    RoadSafetyData {
        center,
        search_radius_m,
        safety_radius_m,
        summary: RoadSafetySummary {
            total_roads: roads.len() as u32,
            total_cctv: totals.cctv,
            total_metro: totals.mrt,
            total_robbery: totals.robbery,
            total_streetlight: totals.lamp,
            total_police: totals.police,
            overall_score,
            level: overall.road_level(),
            label: overall.label().to_string(),
        },
        roads,
    }
}

// ** Area resources **

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    Store,
    Police,
    Cctv,
    Metro,
    RobberyIncident,
    Streetlight,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyPlace {
    pub safety: i32,
    #[serde(rename = "type")]
    pub kind: PlaceKind,
    pub name: String,
    pub location: GeoPoint,
    pub distance_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_desc: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaMeta {
    pub at: String,
    pub center: GeoPoint,
    pub radius_m: f64,
    pub tz: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCounts {
    pub cctv_count: u32,
    pub metro_count: u32,
    pub robbery_count: u32,
    pub streetlight_count: u32,
    pub police_count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub safety_score: f64,
    pub analysis: ResourceCounts,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub cctv: Vec<SafetyPlace>,
    pub metro: Vec<SafetyPlace>,
    pub criminal: Vec<SafetyPlace>,
    pub streetlight: Vec<SafetyPlace>,
    pub police: Vec<SafetyPlace>,
}

/// Area response grouped by resource kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaResources {
    pub meta: AreaMeta,
    pub summary: ResourceSummary,
    pub resources: Resources,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaAnalysis {
    pub safe_places: u32,
    pub warning_zones: u32,
    pub lighting_score: f64,
    pub police_distance_m: f64,
    pub last_incident_days: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaSummary {
    pub level: u8,
    pub label: String,
    pub safety_score: f64,
    pub analysis: AreaAnalysis,
}

/// Flattened area view consumed by the map header and place markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaSafety {
    pub meta: AreaMeta,
    pub summary: AreaSummary,
    pub places: Vec<SafetyPlace>,
}

const NO_POLICE_DISTANCE_M: f64 = 999.0;
const LIGHTS_FOR_FULL_SCORE: f64 = 30.0;
const ASSUMED_INCIDENT_AGE_DAYS: u32 = 30;

impl From<AreaResources> for AreaSafety {
    fn from(area: AreaResources) -> Self {
        let AreaResources { meta, summary, resources } = area;
        let counts = summary.analysis;
        let level = SafetyLevel::for_area(summary.safety_score);

        let police_distance_m = resources
            .police
            .first()
            .map_or(NO_POLICE_DISTANCE_M, |p| p.distance_m);

        let places = resources
            .cctv
            .into_iter()
            .chain(resources.metro)
            .chain(resources.criminal)
            .chain(resources.streetlight)
            .chain(resources.police)
            .collect();

        AreaSafety {
            meta,
            summary: AreaSummary {
                level: level.area_level(),
                label: level.label().to_string(),
                safety_score: summary.safety_score,
                analysis: AreaAnalysis {
                    safe_places: counts.cctv_count + counts.metro_count + counts.police_count,
                    warning_zones: counts.robbery_count,
                    lighting_score: counts.streetlight_count as f64 / LIGHTS_FOR_FULL_SCORE,
                    police_distance_m,
                    last_incident_days: ASSUMED_INCIDENT_AGE_DAYS,
                },
            },
            places,
        }
    }
}
