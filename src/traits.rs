//! Interfaces of the external collaborators.
//!
//! The session drives these; concrete apps implement them for their map
//! widget, HTTP stack and browser history.

use crate::error::{GeocodeFailure, RequestError, RouteRequestFailure};
use crate::history::UrlState;
use crate::point::{Candidate, Coordinate, Point, PointId};
use crate::request::RoutePayload;
use crate::response::{DetailMarker, Path, RouteResponse};
use crate::route::StopRole;

/// Turns free text into candidate coordinates.
///
/// Lookups for different points run concurrently, hence `Sync`. An empty
/// list is a valid answer meaning "nothing found".
pub trait Geocoder: Sync {
    fn lookup(&self, text: &str) -> Result<Vec<Candidate>, GeocodeFailure>;
}

/// Computes alternative paths for a payload.
pub trait RoutingBackend {
    fn route(&self, payload: &RoutePayload) -> Result<RouteResponse, RouteRequestFailure>;
}

/// Renders routing results and failures.
pub trait ResultPresenter {
    /// New response; `selected` is highlighted, `zoom` asks to fit the
    /// viewport to it.
    fn show_paths(&mut self, paths: &[Path], selected: usize, zoom: bool);

    fn highlight(&mut self, index: usize);

    fn show_error(&mut self, failure: &RouteRequestFailure);

    /// A request that was refused before dispatch.
    fn show_rejected(&mut self, error: &RequestError);

    fn show_point_failure(&mut self, _index: usize, _failure: &GeocodeFailure) {}

    /// Centre the map on a single stop.
    fn focus(&mut self, _coordinate: Coordinate) {}

    /// Debug overlay of path detail boundaries.
    fn show_detail_markers(&mut self, _markers: &[DetailMarker]) {}
}

/// A map marker for one resolved stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub point: PointId,
    pub index: usize,
    pub role: StopRole,
    pub coordinate: Coordinate,
}

pub trait MarkerPresenter {
    fn clear_markers(&mut self);

    fn place_marker(&mut self, marker: &Marker);

    /// Popup text when a marker is opened.
    fn on_open(&self, point: &Point) -> Option<String> {
        point.candidates().first().map(|candidate| candidate.label.clone())
    }
}

/// Browser history; pushed states come back through `Session::navigate`.
pub trait HistorySink {
    fn push_state(&mut self, state: &UrlState);
}
