//! Route stops: raw user text plus its resolution state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::GeocodeFailure;

static NEXT_POINT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a point, independent of its position in the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub u64);

impl PointId {
    /// Allocates a process-wide unique id.
    pub fn fresh() -> Self {
        PointId(NEXT_POINT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Parses a `"lat,lng"` literal.
    ///
    /// Whitespace around either component is ignored. Values outside the
    /// valid latitude/longitude ranges are not coordinates.
    pub fn parse(input: &str) -> Option<Self> {
        let (lat, lng) = input.split_once(',')?;
        let lat: f64 = lat.trim().parse().ok()?;
        let lng: f64 = lng.trim().parse().ok()?;

        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }

        Some(Self { lat, lng })
    }
}

// Shortest round-trip float formatting keeps URL state lossless.
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// One geocoder result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub lat: f64,
    pub lng: f64,
    pub label: String,
}

impl Candidate {
    pub fn new(lat: f64, lng: f64, label: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            label: label.into(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStatus {
    Unresolved,
    Pending,
    Resolved,
    Failed,
}

/// A single route stop.
///
/// `coordinate` is present exactly when the status is `Resolved`; all
/// mutation goes through methods that keep that pairing intact. Every edit of
/// the raw input bumps `revision`, which is what lookups are checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    id: PointId,
    raw_input: String,
    coordinate: Option<Coordinate>,
    status: ResolutionStatus,
    candidates: Vec<Candidate>,
    failure: Option<GeocodeFailure>,
    revision: u64,
}

impl Point {
    /// Creates a point from user text.
    ///
    /// A coordinate literal is resolved on the spot; anything else starts
    /// out unresolved.
    pub fn create(raw_input: impl Into<String>) -> Self {
        let mut point = Self {
            id: PointId::fresh(),
            raw_input: String::new(),
            coordinate: None,
            status: ResolutionStatus::Unresolved,
            candidates: Vec::new(),
            failure: None,
            revision: 0,
        };
        point.apply_input(raw_input.into());
        point
    }

    /// Creates an already resolved point at `coordinate`.
    pub fn at(coordinate: Coordinate) -> Self {
        Self::create(coordinate.to_string())
    }

    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn status(&self) -> ResolutionStatus {
        self.status
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Reason of the last failed lookup, for the inline message.
    pub fn failure(&self) -> Option<&GeocodeFailure> {
        self.failure.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }

    pub fn is_empty(&self) -> bool {
        self.raw_input.trim().is_empty()
    }

    /// True when the raw input is a coordinate literal.
    pub fn is_literal(&self) -> bool {
        Coordinate::parse(&self.raw_input).is_some()
    }

    /// Replaces the raw text, discarding any previous resolution.
    pub fn set_input(&mut self, raw_input: impl Into<String>) {
        self.revision += 1;
        self.apply_input(raw_input.into());
    }

    /// Pins the point to a coordinate, e.g. after a marker drag.
    pub fn set_coordinate(&mut self, coordinate: Coordinate) {
        self.set_input(coordinate.to_string());
    }

    pub(crate) fn mark_pending(&mut self) {
        self.status = ResolutionStatus::Pending;
        self.coordinate = None;
        self.failure = None;
    }

    /// Stores a lookup result; the top candidate becomes the coordinate.
    pub(crate) fn resolve_with(&mut self, candidates: Vec<Candidate>) {
        match candidates.first() {
            Some(top) => {
                self.coordinate = Some(top.coordinate());
                self.status = ResolutionStatus::Resolved;
                self.failure = None;
                self.candidates = candidates;
            }
            None => self.fail(GeocodeFailure::NoCandidates {
                query: self.raw_input.clone(),
            }),
        }
    }

    pub(crate) fn fail(&mut self, failure: GeocodeFailure) {
        self.coordinate = None;
        self.status = ResolutionStatus::Failed;
        self.candidates.clear();
        self.failure = Some(failure);
    }

    fn apply_input(&mut self, raw_input: String) {
        self.candidates.clear();
        self.failure = None;
        match Coordinate::parse(&raw_input) {
            Some(coordinate) => {
                self.coordinate = Some(coordinate);
                self.status = ResolutionStatus::Resolved;
            }
            None => {
                self.coordinate = None;
                self.status = ResolutionStatus::Unresolved;
            }
        }
        self.raw_input = raw_input;
    }
}
