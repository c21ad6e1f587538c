//! GraphHopper HTTP adapter for routing requests.

use reqwest::Url;
use reqwest::blocking::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, ErrorHint, RouteRequestFailure};
use crate::request::{RoutePayload, TransitParams};
use crate::response::RouteResponse;
use crate::traits::RoutingBackend;

/// Path details requested when full path details are asked for.
const PATH_DETAILS: [&str; 4] = ["road_class", "road_environment", "max_speed", "average_speed"];

#[derive(Debug, Clone)]
pub struct GraphHopperConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for GraphHopperConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8989".to_string(),
            timeout_secs: 10,
            api_key: None,
        }
    }
}

impl GraphHopperConfig {
    /// Defaults overridden by `GRAPHHOPPER_URL` and `GRAPHHOPPER_API_KEY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("GRAPHHOPPER_URL") {
            config.base_url = url;
        }
        config.api_key = std::env::var("GRAPHHOPPER_API_KEY").ok().filter(|key| !key.is_empty());
        config
    }
}

#[derive(Debug, Clone)]
pub struct GraphHopperClient {
    config: GraphHopperConfig,
    endpoint: Url,
    client: reqwest::blocking::Client,
}

impl GraphHopperClient {
    pub fn new(config: GraphHopperConfig) -> Result<Self, ClientError> {
        let endpoint = Url::parse(&format!("{}/route", config.base_url.trim_end_matches('/'))).map_err(|err| {
            ClientError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: err.to_string(),
            }
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            endpoint,
            client,
        })
    }

    fn keyed_endpoint(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Some(key) = &self.config.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }

    fn transit_url(&self, payload: &RoutePayload, transit: &TransitParams) -> Url {
        let mut url = self.keyed_endpoint();
        {
            let mut pairs = url.query_pairs_mut();
            for point in &payload.points {
                pairs.append_pair("point", &point.to_string());
            }
            pairs.append_pair("profile", payload.profile.as_str());
            pairs.append_pair("elevation", &payload.elevation.to_string());
            pairs.append_pair("debug", &payload.debug.to_string());
            pairs.append_pair(
                "pt.earliest_departure_time",
                &transit.earliest_departure_time.to_rfc3339(),
            );
            pairs.append_pair("pt.arrive_by", &transit.arrive_by.to_string());
            pairs.append_pair("pt.limit_solutions", &transit.limit_solutions.to_string());
            pairs.append_pair("pt.max_profile_duration", &transit.max_profile_duration.to_string());
            pairs.append_pair("pt.limit_street_time", &transit.limit_street_time_seconds.to_string());
            pairs.append_pair("pt.use_pareto", &transit.use_pareto.to_string());
            pairs.append_pair("pt.beta_transfers", &transit.beta_transfers.to_string());
            pairs.append_pair("pt.access_profile", &transit.access_mode);
            pairs.append_pair("pt.egress_profile", &transit.egress_mode);
            pairs.append_pair("pt.beta_access_time", &transit.beta_access_time.to_string());
            pairs.append_pair("pt.beta_egress_time", &transit.beta_egress_time.to_string());
            pairs.append_pair("pt.max_visited_nodes", &transit.max_visited_nodes.to_string());
        }
        url
    }
}

impl RoutingBackend for GraphHopperClient {
    fn route(&self, payload: &RoutePayload) -> Result<RouteResponse, RouteRequestFailure> {
        let request = match &payload.transit {
            Some(transit) => self.client.get(self.transit_url(payload, transit)),
            None => self.client.post(self.keyed_endpoint()).json(&StreetBody::from(payload)),
        };
        debug!(profile = %payload.profile, points = payload.points.len(), "sending routing request");

        let response = request.send().map_err(|err| RouteRequestFailure::Transport {
            message: err.to_string(),
        })?;
        read_response(response)
    }
}

fn read_response(response: Response) -> Result<RouteResponse, RouteRequestFailure> {
    let status = response.status();
    if status.is_success() {
        return response.json::<RouteResponse>().map_err(|err| RouteRequestFailure::Decode {
            message: err.to_string(),
        });
    }

    let body = response.text().map_err(|err| RouteRequestFailure::Transport {
        message: err.to_string(),
    })?;
    Err(service_failure(status.as_u16(), &body))
}

/// Maps an error body onto the structured failure, keeping the raw text as
/// the message when the body is not the usual JSON shape.
fn service_failure(status: u16, body: &str) -> RouteRequestFailure {
    match serde_json::from_str::<ServiceErrorBody>(body) {
        Ok(parsed) => RouteRequestFailure::Service {
            status,
            message: parsed.message,
            hints: parsed.hints,
        },
        Err(_) => RouteRequestFailure::Service {
            status,
            message: body.trim().to_string(),
            hints: Vec::new(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    hints: Vec<ErrorHint>,
}

#[derive(Debug, Serialize)]
struct StreetBody<'a> {
    profile: &'a str,
    /// `[lng, lat]` pairs.
    points: Vec<[f64; 2]>,
    points_encoded: bool,
    elevation: bool,
    debug: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<&'static str>,
    #[serde(rename = "alternative_route.max_paths", skip_serializing_if = "Option::is_none")]
    max_paths: Option<u32>,
    #[serde(rename = "alternative_route.max_weight_factor", skip_serializing_if = "Option::is_none")]
    max_weight_factor: Option<f64>,
    #[serde(rename = "alternative_route.max_share_factor", skip_serializing_if = "Option::is_none")]
    max_share_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_model: Option<&'a Value>,
    #[serde(rename = "ch.disable", skip_serializing_if = "std::ops::Not::not")]
    ch_disable: bool,
}

impl<'a> From<&'a RoutePayload> for StreetBody<'a> {
    fn from(payload: &'a RoutePayload) -> Self {
        let alternatives = payload.alternatives.as_ref().filter(|alt| alt.enabled());

        Self {
            profile: payload.profile.as_str(),
            points: payload.points.iter().map(|p| [p.lng, p.lat]).collect(),
            points_encoded: true,
            elevation: payload.elevation,
            debug: payload.debug,
            details: if payload.return_full_path_details {
                PATH_DETAILS.to_vec()
            } else {
                Vec::new()
            },
            algorithm: alternatives.map(|_| "alternative_route"),
            max_paths: alternatives.map(|alt| alt.alternate_route_max_paths),
            max_weight_factor: alternatives.map(|alt| alt.alternate_route_max_weight_factor),
            max_share_factor: alternatives.map(|alt| alt.alternate_route_max_share_factor),
            custom_model: payload.custom_model.as_ref(),
            ch_disable: payload.custom_model.is_some(),
        }
    }
}
