//! Routing response model: alternative paths, legs and derived values.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GeometryError;
use crate::point::Coordinate;
use crate::polyline::Polyline;

/// Geometry as sent by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    /// Encoded polyline or WKT line string.
    Text(String),
    /// GeoJSON line string, `[lng, lat(, ele)]`.
    LineString { coordinates: Vec<Vec<f64>> },
}

impl Geometry {
    pub fn decode(&self, elevation: bool) -> Result<Polyline, GeometryError> {
        match self {
            Geometry::Text(text) if text.trim_start().to_ascii_uppercase().starts_with("LINESTRING") => {
                Polyline::from_wkt(text)
            }
            Geometry::Text(encoded) => Polyline::decode(encoded, elevation),
            Geometry::LineString { coordinates } => Ok(Polyline::from_lng_lat(coordinates)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum LegMode {
    Walk,
    Transit,
    Vehicle,
}

impl From<String> for LegMode {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "walk" | "foot" => LegMode::Walk,
            "pt" | "transit" => LegMode::Transit,
            _ => LegMode::Vehicle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    #[serde(rename = "type")]
    pub mode: LegMode,
    #[serde(default)]
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub arrival_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub fare: Option<String>,
}

/// `[from_index, to_index, value]` annotation over a span of the geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(usize, usize, Value)")]
pub struct PathDetail {
    pub from: usize,
    pub to: usize,
    pub value: Value,
}

impl From<(usize, usize, Value)> for PathDetail {
    fn from((from, to, value): (usize, usize, Value)) -> Self {
        Self { from, to, value }
    }
}

/// Join between two consecutive legs (or the open ends of a path).
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub arrival: Option<DateTime<Utc>>,
    pub departure: Option<DateTime<Utc>>,
    pub previous_mode: Option<LegMode>,
    pub next_mode: Option<LegMode>,
}

impl Waypoint {
    /// A connection is reachable when the next leg does not leave before the
    /// previous one arrives.
    pub fn is_possible(&self) -> bool {
        match (self.arrival, self.departure) {
            (Some(arrival), Some(departure)) => arrival <= departure,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    #[serde(default)]
    pub distance: f64,
    /// Milliseconds.
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub ascend: f64,
    #[serde(default)]
    pub descend: f64,
    #[serde(default)]
    pub points: Option<Geometry>,
    #[serde(default)]
    pub snapped_waypoints: Option<Geometry>,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub points_order: Option<Vec<usize>>,
    #[serde(default)]
    pub details: BTreeMap<String, Vec<PathDetail>>,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub fare: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Path {
    pub fn geometry(&self, elevation: bool) -> Result<Polyline, GeometryError> {
        match &self.points {
            Some(points) => points.decode(elevation),
            None => Ok(Polyline::default()),
        }
    }

    pub fn snapped(&self, elevation: bool) -> Result<Polyline, GeometryError> {
        match &self.snapped_waypoints {
            Some(points) => points.decode(elevation),
            None => Ok(Polyline::default()),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bbox.map(|[min_lng, min_lat, max_lng, max_lat]| Bounds {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        })
    }

    pub fn waypoints(&self) -> Vec<Waypoint> {
        let mut waypoints = Vec::with_capacity(self.legs.len() + 1);
        let mut previous: Option<&Leg> = None;
        for leg in &self.legs {
            waypoints.push(Waypoint {
                arrival: previous.and_then(|p| p.arrival_time),
                departure: leg.departure_time,
                previous_mode: previous.map(|p| p.mode),
                next_mode: Some(leg.mode),
            });
            previous = Some(leg);
        }
        if let Some(last) = previous {
            waypoints.push(Waypoint {
                arrival: last.arrival_time,
                departure: None,
                previous_mode: Some(last.mode),
                next_mode: None,
            });
        }
        waypoints
    }

    /// Number of changes between transit vehicles; `None` for paths without
    /// any transit leg.
    pub fn transfer_count(&self) -> Option<usize> {
        let mut boarded = false;
        let mut transfers = 0;
        for waypoint in self.waypoints() {
            if waypoint.next_mode == Some(LegMode::Transit) {
                if boarded {
                    transfers += 1;
                }
                boarded = true;
            }
        }
        boarded.then_some(transfers)
    }

    /// False when any connection along the path cannot be made.
    pub fn is_possible(&self) -> bool {
        self.waypoints().iter().all(Waypoint::is_possible)
    }

    pub fn departure_time(&self) -> Option<DateTime<Utc>> {
        self.legs.first().and_then(|leg| leg.departure_time)
    }

    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        self.legs.last().and_then(|leg| leg.arrival_time)
    }

    pub fn fare(&self) -> Option<&str> {
        self.fare
            .as_deref()
            .or_else(|| self.legs.iter().find_map(|leg| leg.fare.as_deref()))
    }

    /// First coordinate of every detail span, for debug markers.
    pub fn detail_markers(&self, geometry: &Polyline) -> Vec<DetailMarker> {
        let points = geometry.points();
        self.details
            .iter()
            .flat_map(|(key, spans)| {
                spans.iter().filter_map(move |span| {
                    points.get(span.from).map(|coordinate| DetailMarker {
                        key: key.clone(),
                        coordinate: *coordinate,
                        value: span.value.clone(),
                    })
                })
            })
            .collect()
    }

    /// Presentation-ready numbers. `departure` is the requested transit
    /// departure, used when the path itself carries no leg times.
    pub fn summary(&self, departure: Option<DateTime<Utc>>) -> PathSummary {
        let duration = i64::try_from(self.time)
            .ok()
            .and_then(Duration::try_milliseconds);
        let arrival = self.arrival_time().or_else(|| {
            departure
                .zip(duration)
                .and_then(|(start, duration)| start.checked_add_signed(duration))
        });
        PathSummary {
            distance_m: self.distance,
            duration_ms: self.time,
            ascend: self.ascend,
            descend: self.descend,
            arrival,
            transfers: self.transfer_count(),
            possible: self.is_possible(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailMarker {
    pub key: String,
    pub coordinate: Coordinate,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSummary {
    pub distance_m: f64,
    pub duration_ms: u64,
    pub ascend: f64,
    pub descend: f64,
    pub arrival: Option<DateTime<Utc>>,
    pub transfers: Option<usize>,
    pub possible: bool,
}

/// Ordered list of alternative paths, best first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub paths: Vec<Path>,
}
