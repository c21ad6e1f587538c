//! Shareable URL state.
//!
//! A `UrlState` carries everything needed to replay a session: one `point`
//! entry per stop, the profile, units and the remaining request options.
//! The zoom flag and the decorrelation token travel with the state object
//! but never appear in the URL itself.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use tracing::debug;

use crate::error::HistoryError;
use crate::options::{AlternativeRoutes, Profile, RequestOptions, TransitOptions, UnitSystem};
use crate::route::Route;

const BASE: &str = "http://localhost/";
const LEGACY_KEYS: [&str; 3] = ["vehicle", "weighting", "turn_costs"];

#[derive(Debug, Clone, PartialEq)]
pub struct UrlState {
    pub points: Vec<String>,
    pub options: RequestOptions,
    pub do_zoom: bool,
    /// Forces a fresh request for an otherwise identical URL.
    pub decorrelation: Option<u64>,
}

impl UrlState {
    /// Snapshot of a route: resolved stops as `lat,lng`, others as typed.
    pub fn capture(route: &Route, options: &RequestOptions, do_zoom: bool) -> Self {
        let points = route
            .iter()
            .map(|point| match point.coordinate() {
                Some(coordinate) => coordinate.to_string(),
                None => point.raw_input().to_string(),
            })
            .collect();

        Self {
            points,
            options: options.clone(),
            do_zoom,
            decorrelation: None,
        }
    }

    pub fn with_decorrelation(mut self, token: u64) -> Self {
        self.decorrelation = Some(token);
        self
    }

    pub fn non_empty_points(&self) -> usize {
        self.points.iter().filter(|p| !p.trim().is_empty()).count()
    }

    /// Query string for the address bar; also the navigation/cache key.
    pub fn to_query(&self) -> String {
        let Ok(mut url) = Url::parse(BASE) else {
            return String::new();
        };
        {
            let mut pairs = url.query_pairs_mut();
            for point in &self.points {
                pairs.append_pair("point", point);
            }

            let options = &self.options;
            pairs.append_pair("profile", options.profile.as_str());
            pairs.append_pair("use_miles", bool_str(options.units.use_miles()));
            pairs.append_pair("elevation", bool_str(options.elevation));
            pairs.append_pair("debug", bool_str(options.debug));

            let transit = options.profile.is_public_transit();
            if !transit || options.alternatives != AlternativeRoutes::default() {
                let alternatives = &options.alternatives;
                pairs.append_pair("alternative_route.max_paths", &alternatives.max_paths.to_string());
                pairs.append_pair(
                    "alternative_route.max_weight_factor",
                    &alternatives.max_weight_factor.to_string(),
                );
                pairs.append_pair(
                    "alternative_route.max_share_factor",
                    &alternatives.max_share_factor.to_string(),
                );
            }

            if transit || options.transit != TransitOptions::default() {
                let pt = &options.transit;
                if let Some(departure) = pt.earliest_departure_time {
                    pairs.append_pair(
                        "pt.earliest_departure_time",
                        &departure.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    );
                }
                pairs.append_pair("pt.arrive_by", bool_str(pt.arrive_by));
                pairs.append_pair("pt.limit_solutions", &pt.limit_solutions.to_string());
                pairs.append_pair("pt.max_profile_duration", &pt.max_profile_duration.to_string());
                pairs.append_pair("pt.limit_street_time", &pt.limit_street_time_seconds.to_string());
                pairs.append_pair("pt.use_pareto", bool_str(pt.use_pareto));
                pairs.append_pair("pt.beta_transfers", &pt.beta_transfers.to_string());
                pairs.append_pair("pt.access_mode", &pt.access_mode);
                pairs.append_pair("pt.egress_mode", &pt.egress_mode);
                pairs.append_pair("pt.beta_access_time", &pt.beta_access_time.to_string());
                pairs.append_pair("pt.beta_egress_time", &pt.beta_egress_time.to_string());
                pairs.append_pair("pt.max_visited_nodes", &pt.max_visited_nodes.to_string());
            }

            if let Some(model) = &options.custom_model {
                pairs.append_pair("custom_model", model);
            }
        }
        url.query().unwrap_or_default().to_string()
    }

    /// Parses a full URL or a bare query string.
    ///
    /// Without a `profile` parameter the state falls back to
    /// `default_profile`, unless legacy profile parameters are present, in
    /// which case the state is rejected. With a `profile` parameter legacy
    /// parameters are dropped.
    pub fn from_query(input: &str, default_profile: &Profile) -> Result<Self, HistoryError> {
        let url = if input.contains("://") {
            Url::parse(input)
        } else {
            Url::parse(&format!("{}?{}", BASE, input.trim_start_matches('?')))
        }
        .map_err(|err| HistoryError::InvalidUrl(err.to_string()))?;

        let mut points = Vec::new();
        let mut profile = None;
        let mut legacy_vehicle = None;
        let mut options = RequestOptions::default();

        for (key, value) in url.query_pairs() {
            let value = value.as_ref();
            match key.as_ref() {
                "point" => points.push(value.to_string()),
                "profile" => {
                    profile = Some(value.parse::<Profile>().map_err(|_| invalid("profile", value))?);
                }
                "use_miles" => options.units = UnitSystem::from_use_miles(parse_bool("use_miles", value)?),
                "elevation" => options.elevation = parse_bool("elevation", value)?,
                "debug" => options.debug = parse_bool("debug", value)?,
                "alternative_route.max_paths" => {
                    options.alternatives.max_paths = parse_num("alternative_route.max_paths", value)?;
                }
                "alternative_route.max_weight_factor" => {
                    options.alternatives.max_weight_factor = parse_num("alternative_route.max_weight_factor", value)?;
                }
                "alternative_route.max_share_factor" => {
                    options.alternatives.max_share_factor = parse_num("alternative_route.max_share_factor", value)?;
                }
                "pt.earliest_departure_time" => {
                    let departure = DateTime::parse_from_rfc3339(value)
                        .map_err(|_| invalid("pt.earliest_departure_time", value))?;
                    options.transit.earliest_departure_time = Some(departure.with_timezone(&Utc));
                }
                "pt.arrive_by" => options.transit.arrive_by = parse_bool("pt.arrive_by", value)?,
                "pt.limit_solutions" => options.transit.limit_solutions = parse_num("pt.limit_solutions", value)?,
                "pt.max_profile_duration" => {
                    options.transit.max_profile_duration = parse_num("pt.max_profile_duration", value)?;
                }
                "pt.limit_street_time" => {
                    options.transit.limit_street_time_seconds = parse_num("pt.limit_street_time", value)?;
                }
                "pt.use_pareto" => options.transit.use_pareto = parse_bool("pt.use_pareto", value)?,
                "pt.beta_transfers" => options.transit.beta_transfers = parse_num("pt.beta_transfers", value)?,
                "pt.access_mode" => options.transit.access_mode = value.to_string(),
                "pt.egress_mode" => options.transit.egress_mode = value.to_string(),
                "pt.beta_access_time" => options.transit.beta_access_time = parse_num("pt.beta_access_time", value)?,
                "pt.beta_egress_time" => options.transit.beta_egress_time = parse_num("pt.beta_egress_time", value)?,
                "pt.max_visited_nodes" => {
                    options.transit.max_visited_nodes = parse_num("pt.max_visited_nodes", value)?;
                }
                "custom_model" => options.custom_model = Some(value.to_string()),
                "vehicle" => legacy_vehicle = Some(value.to_string()),
                other if LEGACY_KEYS.contains(&other) => {
                    debug!(key = other, "legacy parameter ignored");
                }
                _ => {}
            }
        }

        options.profile = match (profile, legacy_vehicle) {
            (Some(profile), legacy) => {
                if let Some(vehicle) = legacy {
                    debug!(%vehicle, "legacy vehicle parameter dropped in favour of profile");
                }
                profile
            }
            (None, Some(vehicle)) => return Err(HistoryError::LegacyProfile { vehicle }),
            (None, None) => default_profile.clone(),
        };

        Ok(Self {
            points,
            options,
            do_zoom: true,
            decorrelation: None,
        })
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn invalid(key: &str, value: &str) -> HistoryError {
    HistoryError::InvalidParameter {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, HistoryError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, HistoryError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_capture_uses_resolved_form() {
        let route = Route::from_inputs(["52.5,13.4", "Munich"]);
        let state = UrlState::capture(&route, &RequestOptions::default(), true);
        assert_eq!(state.points, vec!["52.5,13.4", "Munich"]);
    }

    #[test]
    fn test_query_contains_points_and_profile() {
        let route = Route::from_inputs(["52.5,13.4", "Munich"]);
        let state = UrlState::capture(&route, &RequestOptions::with_profile(Profile::Foot), true);
        let query = state.to_query();

        assert!(query.starts_with("point=52.5%2C13.4&point=Munich"), "{}", query);
        assert!(query.contains("profile=foot"));
        assert!(!query.contains("pt."));
        assert!(!query.contains("do_zoom"));
    }

    #[test]
    fn test_round_trip_transit_state() {
        let mut options = RequestOptions::with_profile(Profile::PublicTransit);
        options.transit.earliest_departure_time = Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap());
        options.transit.arrive_by = true;
        options.transit.beta_access_time = 2.25;
        options.units = UnitSystem::Imperial;

        let route = Route::from_inputs(["52.520008,13.404954", "48.137154,11.576124"]);
        let state = UrlState::capture(&route, &options, true).with_decorrelation(42);
        let parsed = UrlState::from_query(&state.to_query(), &Profile::Car).unwrap();

        assert_eq!(parsed.points, state.points);
        assert_eq!(parsed.options, options);
        assert_eq!(parsed.decorrelation, None);
    }

    #[test]
    fn test_decorrelation_not_in_query() {
        let route = Route::from_inputs(["1,1", "2,2"]);
        let a = UrlState::capture(&route, &RequestOptions::default(), true).with_decorrelation(1);
        let b = UrlState::capture(&route, &RequestOptions::default(), false).with_decorrelation(2);
        assert_eq!(a.to_query(), b.to_query());
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_full_url() {
        let state = UrlState::from_query(
            "https://maps.example.com/?point=52.5%2C13.4&point=Berlin&profile=bike&locale=de",
            &Profile::Car,
        )
        .unwrap();
        assert_eq!(state.points, vec!["52.5,13.4", "Berlin"]);
        assert_eq!(state.options.profile, Profile::Bike);
        assert!(state.do_zoom);
    }

    #[test]
    fn test_missing_profile_uses_default() {
        let state = UrlState::from_query("point=a&point=b", &Profile::Foot).unwrap();
        assert_eq!(state.options.profile, Profile::Foot);
    }

    #[test]
    fn test_legacy_vehicle_rejected_without_profile() {
        let err = UrlState::from_query("point=a&point=b&vehicle=car", &Profile::Car).unwrap_err();
        assert_eq!(err, HistoryError::LegacyProfile { vehicle: "car".to_string() });
    }

    #[test]
    fn test_legacy_vehicle_dropped_with_profile() {
        let state = UrlState::from_query("point=a&point=b&vehicle=car&weighting=fastest&profile=foot", &Profile::Car)
            .unwrap();
        assert_eq!(state.options.profile, Profile::Foot);
    }

    #[test]
    fn test_invalid_parameter() {
        let err = UrlState::from_query("pt.arrive_by=maybe", &Profile::Car).unwrap_err();
        assert_eq!(
            err,
            HistoryError::InvalidParameter {
                key: "pt.arrive_by".to_string(),
                value: "maybe".to_string()
            }
        );
    }

    #[test]
    fn test_non_empty_points() {
        let state = UrlState::from_query("point=&point=Berlin&point=", &Profile::Car).unwrap();
        assert_eq!(state.points.len(), 3);
        assert_eq!(state.non_empty_points(), 1);
    }
}
