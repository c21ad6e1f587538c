//! Transport-agnostic routing request payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RequestError;
use crate::options::{DEFAULT_MAX_VISITED_NODES, Profile, RequestOptions, UnitSystem};
use crate::point::Coordinate;
use crate::route::{MIN_POINTS, Route};

/// Shortest custom model text worth parsing.
const MIN_CUSTOM_MODEL_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternateRouteParams {
    pub alternate_route_max_paths: u32,
    pub alternate_route_max_weight_factor: f64,
    pub alternate_route_max_share_factor: f64,
}

impl AlternateRouteParams {
    /// The alternative route algorithm only runs when asked for more than one path.
    pub fn enabled(&self) -> bool {
        self.alternate_route_max_paths > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitParams {
    pub earliest_departure_time: DateTime<Utc>,
    pub arrive_by: bool,
    pub limit_solutions: u32,
    pub max_profile_duration: u32,
    pub limit_street_time_seconds: u32,
    pub use_pareto: bool,
    pub beta_transfers: f64,
    pub access_mode: String,
    pub egress_mode: String,
    pub beta_access_time: f64,
    pub beta_egress_time: f64,
    pub max_visited_nodes: u32,
}

/// Everything the routing backend needs for one query.
///
/// Street profiles carry the alternate-route limits; the transit profile
/// carries the transit block instead. Never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePayload {
    pub profile: Profile,
    pub points: Vec<Coordinate>,
    #[serde(flatten)]
    pub alternatives: Option<AlternateRouteParams>,
    pub return_full_path_details: bool,
    pub unit_system: UnitSystem,
    pub elevation: bool,
    pub debug: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_model: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit: Option<TransitParams>,
}

impl RoutePayload {
    /// Builds the payload from a fully resolved route.
    ///
    /// `now` is the departure instant used for transit queries that did not
    /// pick one.
    pub fn build(route: &Route, options: &RequestOptions, now: DateTime<Utc>) -> Result<Self, RequestError> {
        if route.len() < MIN_POINTS {
            return Err(RequestError::TooFewPoints { count: route.len() });
        }
        let points = route.resolved_coordinates()?;

        let (alternatives, transit, custom_model) = if options.profile.is_public_transit() {
            if points.len() != MIN_POINTS {
                return Err(RequestError::TransitViaPoints { count: points.len() });
            }
            if options.custom_model.is_some() {
                debug!("custom model ignored for public transit request");
            }
            (None, Some(transit_params(options, now)), None)
        } else {
            let custom_model = options
                .custom_model
                .as_deref()
                .map(parse_custom_model)
                .transpose()?;
            let alternatives = AlternateRouteParams {
                alternate_route_max_paths: options.alternatives.max_paths,
                alternate_route_max_weight_factor: options.alternatives.max_weight_factor,
                alternate_route_max_share_factor: options.alternatives.max_share_factor,
            };
            (Some(alternatives), None, custom_model)
        };

        Ok(Self {
            profile: options.profile.clone(),
            points,
            alternatives,
            return_full_path_details: true,
            unit_system: options.units,
            elevation: options.elevation,
            debug: options.debug,
            custom_model,
            transit,
        })
    }
}

fn transit_params(options: &RequestOptions, now: DateTime<Utc>) -> TransitParams {
    let transit = &options.transit;
    let mode_or_foot = |mode: &str| {
        if mode.trim().is_empty() {
            "foot".to_string()
        } else {
            mode.to_string()
        }
    };

    TransitParams {
        earliest_departure_time: transit.earliest_departure_time.unwrap_or(now),
        arrive_by: transit.arrive_by,
        limit_solutions: transit.limit_solutions,
        max_profile_duration: transit.max_profile_duration,
        limit_street_time_seconds: transit.limit_street_time_seconds,
        use_pareto: transit.use_pareto,
        beta_transfers: transit.beta_transfers,
        access_mode: mode_or_foot(&transit.access_mode),
        egress_mode: mode_or_foot(&transit.egress_mode),
        beta_access_time: transit.beta_access_time,
        beta_egress_time: transit.beta_egress_time,
        max_visited_nodes: if transit.max_visited_nodes == 0 {
            DEFAULT_MAX_VISITED_NODES
        } else {
            transit.max_visited_nodes
        },
    }
}

/// Validates user supplied routing customisation text.
pub fn parse_custom_model(text: &str) -> Result<Value, RequestError> {
    let text = text.trim();
    if text.len() < MIN_CUSTOM_MODEL_LEN {
        return Err(RequestError::MalformedCustomModel {
            reason: "routing configuration too short".to_string(),
        });
    }

    let value: Value = serde_json::from_str(text).map_err(|err| RequestError::MalformedCustomModel {
        reason: err.to_string(),
    })?;

    if !value.is_object() {
        return Err(RequestError::MalformedCustomModel {
            reason: "expected a JSON object".to_string(),
        });
    }
    Ok(value)
}
