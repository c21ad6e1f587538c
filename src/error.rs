//! Error types for waypoint resolution, request construction and transport.
//!
//! Resolution and request failures never cross the session boundary as
//! panics; they are carried through the same completion path as successful
//! results and handed to the presenters.

use serde::Deserialize;
use thiserror::Error;

use crate::point::PointId;

/// A geocoding lookup that produced no usable coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeFailure {
    /// The gateway answered, but with an empty candidate list.
    #[error("no candidates found for '{query}'")]
    NoCandidates { query: String },

    /// The gateway could not be reached or answered with garbage.
    #[error("geocoding failed: {message}")]
    Transport { message: String },
}

/// One hint attached to a structured routing error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorHint {
    pub message: String,
}

/// A routing request that was dispatched but did not yield paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteRequestFailure {
    /// The service answered with a structured error (e.g. "no path found").
    #[error("routing service error ({status}): {message}")]
    Service {
        status: u16,
        message: String,
        hints: Vec<ErrorHint>,
    },

    /// The request never produced a response.
    #[error("routing transport error: {message}")]
    Transport { message: String },

    /// The response body could not be decoded.
    #[error("malformed routing response: {message}")]
    Decode { message: String },
}

impl RouteRequestFailure {
    /// Text shown to the user for this failure.
    ///
    /// Hints win over the top-level message; transport and decode failures
    /// get a generic text.
    pub fn user_message(&self) -> String {
        match self {
            RouteRequestFailure::Service { message, hints, .. } => {
                if !hints.is_empty() {
                    hints
                        .iter()
                        .map(|hint| hint.message.as_str())
                        .collect::<Vec<_>>()
                        .join("\n")
                } else if !message.is_empty() {
                    message.clone()
                } else {
                    GENERIC_ROUTE_ERROR.to_string()
                }
            }
            RouteRequestFailure::Transport { .. } | RouteRequestFailure::Decode { .. } => {
                GENERIC_ROUTE_ERROR.to_string()
            }
        }
    }
}

pub const GENERIC_ROUTE_ERROR: &str = "Routing service unavailable, please try again.";

/// A request rejected before it was ever dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("malformed custom model: {reason}")]
    MalformedCustomModel { reason: String },

    #[error("route needs at least 2 points, got {count}")]
    TooFewPoints { count: usize },

    #[error("point {id} is not resolved")]
    Unresolved { id: PointId },

    #[error("public transit routes support exactly 2 points, got {count}")]
    TransitViaPoints { count: usize },
}

/// Structural edits the route refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("index {index} out of bounds for route of {len} points")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("a route must keep at least 2 points")]
    MinimumPoints,

    #[error("point {id} is not part of the route")]
    UnknownPoint { id: PointId },
}

/// Shareable URL state that cannot be turned back into a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("invalid url state: {0}")]
    InvalidUrl(String),

    #[error("invalid value '{value}' for parameter '{key}'")]
    InvalidParameter { key: String, value: String },

    #[error("legacy request without explicit profile (vehicle={vehicle})")]
    LegacyProfile { vehicle: String },
}

/// Route geometry that cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("truncated encoded polyline at byte {offset}")]
    Truncated { offset: usize },

    #[error("invalid character in encoded polyline at byte {offset}")]
    InvalidCharacter { offset: usize },

    #[error("invalid WKT line string: {reason}")]
    InvalidWkt { reason: String },
}

/// Construction failures of the HTTP adapters.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_hints() {
        let err = RouteRequestFailure::Service {
            status: 400,
            message: "Connection between locations not found".to_string(),
            hints: vec![
                ErrorHint { message: "first".to_string() },
                ErrorHint { message: "second".to_string() },
            ],
        };
        assert_eq!(err.user_message(), "first\nsecond");
    }

    #[test]
    fn test_user_message_falls_back_to_message() {
        let err = RouteRequestFailure::Service {
            status: 400,
            message: "Connection between locations not found".to_string(),
            hints: Vec::new(),
        };
        assert_eq!(err.user_message(), "Connection between locations not found");
    }

    #[test]
    fn test_user_message_generic_for_transport() {
        let err = RouteRequestFailure::Transport {
            message: "connection refused".to_string(),
        };
        assert_eq!(err.user_message(), GENERIC_ROUTE_ERROR);

        let empty = RouteRequestFailure::Service {
            status: 500,
            message: String::new(),
            hints: Vec::new(),
        };
        assert_eq!(empty.user_message(), GENERIC_ROUTE_ERROR);
    }
}
