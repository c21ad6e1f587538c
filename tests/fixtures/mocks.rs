//! Recording mock collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;
use waypoint_router::error::{GeocodeFailure, RequestError, RouteRequestFailure};
use waypoint_router::history::UrlState;
use waypoint_router::request::RoutePayload;
use waypoint_router::response::{DetailMarker, Path, RouteResponse};
use waypoint_router::traits::{Geocoder, HistorySink, Marker, MarkerPresenter, ResultPresenter, RoutingBackend};
use waypoint_router::{Candidate, Coordinate, Session, SessionConfig};

use super::german_cities::{CITIES, LANDMARKS};

// ============================================================================
// Geocoder
// ============================================================================

/// Answers from the fixture locations; unknown text yields no candidates.
#[derive(Debug, Default)]
pub struct RecordingGeocoder {
    answers: HashMap<String, Vec<Candidate>>,
    unreachable: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingGeocoder {
    pub fn new() -> Self {
        let answers = CITIES
            .iter()
            .chain(LANDMARKS)
            .map(|location| (location.name.to_string(), vec![location.candidate()]))
            .collect();
        Self {
            answers,
            ..Self::default()
        }
    }

    /// Lookups for `text` fail with a transport error.
    pub fn unreachable_for(mut self, text: &str) -> Self {
        self.unreachable.push(text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Geocoder for RecordingGeocoder {
    fn lookup(&self, text: &str) -> Result<Vec<Candidate>, GeocodeFailure> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.unreachable.iter().any(|t| t == text) {
            return Err(GeocodeFailure::Transport {
                message: "connection refused".to_string(),
            });
        }
        Ok(self.answers.get(text).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Routing backend
// ============================================================================

/// Returns straight-line paths through the requested points, or a scripted
/// failure.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    failure: Option<RouteRequestFailure>,
    alternatives: usize,
    points_order: Option<Vec<usize>>,
    calls: Mutex<Vec<RoutePayload>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            alternatives: 1,
            ..Self::default()
        }
    }

    pub fn failing(failure: RouteRequestFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new()
        }
    }

    pub fn with_alternatives(mut self, count: usize) -> Self {
        self.alternatives = count;
        self
    }

    pub fn with_points_order(mut self, order: Vec<usize>) -> Self {
        self.points_order = Some(order);
        self
    }

    pub fn payloads(&self) -> Vec<RoutePayload> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl RoutingBackend for ScriptedBackend {
    fn route(&self, payload: &RoutePayload) -> Result<RouteResponse, RouteRequestFailure> {
        self.calls.lock().unwrap().push(payload.clone());
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let paths = (0..self.alternatives)
            .map(|rank| straight_path(&payload.points, rank, self.points_order.clone()))
            .collect();
        Ok(RouteResponse { paths })
    }
}

/// A path visiting `points` in order, densified to ten vertices per leg.
pub fn straight_path(points: &[Coordinate], rank: usize, points_order: Option<Vec<usize>>) -> Path {
    let mut coordinates = Vec::new();
    for pair in points.windows(2) {
        for step in 0..10 {
            let t = step as f64 / 10.0;
            coordinates.push(vec![
                pair[0].lng + (pair[1].lng - pair[0].lng) * t,
                pair[0].lat + (pair[1].lat - pair[0].lat) * t,
            ]);
        }
    }
    if let Some(last) = points.last() {
        coordinates.push(vec![last.lng, last.lat]);
    }
    let snapped: Vec<Vec<f64>> = points.iter().map(|p| vec![p.lng, p.lat]).collect();

    serde_json::from_value(json!({
        "distance": 1000.0 * (rank + 1) as f64,
        "time": 60_000 * (rank as u64 + 1),
        "points": { "type": "LineString", "coordinates": coordinates },
        "snapped_waypoints": { "type": "LineString", "coordinates": snapped },
        "points_order": points_order,
        "details": { "road_class": [[0, 3, "primary"], [3, 5, "secondary"]] },
    }))
    .unwrap()
}

// ============================================================================
// Presenter
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Paths { count: usize, selected: usize, zoom: bool },
    Highlight(usize),
    Error(RouteRequestFailure),
    Rejected(RequestError),
    PointFailure(usize),
    Focus(Coordinate),
    DetailMarkers(usize),
}

#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub events: Vec<Shown>,
    pub markers: Vec<Marker>,
}

impl RecordingPresenter {
    pub fn paths_shown(&self) -> Vec<&Shown> {
        self.events
            .iter()
            .filter(|event| matches!(event, Shown::Paths { .. }))
            .collect()
    }

    pub fn last(&self) -> Option<&Shown> {
        self.events.last()
    }
}

impl ResultPresenter for RecordingPresenter {
    fn show_paths(&mut self, paths: &[Path], selected: usize, zoom: bool) {
        self.events.push(Shown::Paths {
            count: paths.len(),
            selected,
            zoom,
        });
    }

    fn highlight(&mut self, index: usize) {
        self.events.push(Shown::Highlight(index));
    }

    fn show_error(&mut self, failure: &RouteRequestFailure) {
        self.events.push(Shown::Error(failure.clone()));
    }

    fn show_rejected(&mut self, error: &RequestError) {
        self.events.push(Shown::Rejected(error.clone()));
    }

    fn show_point_failure(&mut self, index: usize, _failure: &GeocodeFailure) {
        self.events.push(Shown::PointFailure(index));
    }

    fn focus(&mut self, coordinate: Coordinate) {
        self.events.push(Shown::Focus(coordinate));
    }

    fn show_detail_markers(&mut self, markers: &[DetailMarker]) {
        self.events.push(Shown::DetailMarkers(markers.len()));
    }
}

impl MarkerPresenter for RecordingPresenter {
    fn clear_markers(&mut self) {
        self.markers.clear();
    }

    fn place_marker(&mut self, marker: &Marker) {
        self.markers.push(marker.clone());
    }
}

// ============================================================================
// History
// ============================================================================

/// Shares pushed states with the test while the session owns the sink.
#[derive(Debug, Clone, Default)]
pub struct RecordingHistory {
    pushed: Arc<Mutex<Vec<UrlState>>>,
}

impl RecordingHistory {
    pub fn pushed(&self) -> Vec<UrlState> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<UrlState> {
        self.pushed.lock().unwrap().last().cloned()
    }
}

impl HistorySink for RecordingHistory {
    fn push_state(&mut self, state: &UrlState) {
        self.pushed.lock().unwrap().push(state.clone());
    }
}

// ============================================================================
// Sessions
// ============================================================================

pub type TestSession = Session<RecordingGeocoder, ScriptedBackend, RecordingPresenter>;

/// Direct-query session with the default mocks.
pub fn direct_session() -> TestSession {
    direct_session_with(ScriptedBackend::new())
}

pub fn direct_session_with(backend: ScriptedBackend) -> TestSession {
    Session::new(RecordingGeocoder::new(), backend, RecordingPresenter::default())
}

/// Session that routes through a recording history sink.
pub fn history_session() -> (TestSession, RecordingHistory) {
    let history = RecordingHistory::default();
    let session = Session::with_config(
        SessionConfig::default(),
        RecordingGeocoder::new(),
        ScriptedBackend::new(),
        RecordingPresenter::default(),
        Some(Box::new(history.clone())),
    );
    (session, history)
}
