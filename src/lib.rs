//! waypoint-router core
//!
//! Waypoint resolution and routing orchestration for a map front end: an
//! ordered route of text or coordinate stops, geocoding with stale-response
//! protection, readiness-driven routing requests and shareable URL state.

pub mod error;
pub mod point;
pub mod route;
pub mod resolver;
pub mod options;
pub mod request;
pub mod response;
pub mod polyline;
pub mod orchestrator;
pub mod history;
pub mod session;
pub mod traits;
pub mod geo;
pub mod graphhopper;
pub mod nominatim;

pub use error::{GeocodeFailure, HistoryError, RequestError, RouteError, RouteRequestFailure};
pub use history::UrlState;
pub use options::{Profile, RequestOptions, UnitSystem};
pub use point::{Candidate, Coordinate, Point, PointId, ResolutionStatus};
pub use route::Route;
pub use session::{Session, SessionConfig};
