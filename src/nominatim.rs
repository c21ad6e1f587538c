//! Nominatim HTTP adapter for geocoding.

use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, GeocodeFailure};
use crate::point::Candidate;
use crate::response::Bounds;
use crate::traits::Geocoder;

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Maximum number of candidates per lookup.
    pub limit: u32,
    /// Restricts results to this box when set.
    pub bounds: Option<Bounds>,
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            timeout_secs: 10,
            limit: 5,
            bounds: None,
            user_agent: concat!("waypoint-router/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl NominatimConfig {
    /// Defaults overridden by `NOMINATIM_URL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("NOMINATIM_URL") {
            config.base_url = url;
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: NominatimConfig,
    endpoint: Url,
    client: reqwest::blocking::Client,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self, ClientError> {
        let endpoint = Url::parse(&format!("{}/search", config.base_url.trim_end_matches('/'))).map_err(|err| {
            ClientError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: err.to_string(),
            }
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            config,
            endpoint,
            client,
        })
    }

    fn search_url(&self, text: &str) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", text);
            pairs.append_pair("format", "json");
            pairs.append_pair("limit", &self.config.limit.to_string());
            if let Some(bounds) = &self.config.bounds {
                let viewbox = format!(
                    "{},{},{},{}",
                    bounds.min_lng, bounds.max_lat, bounds.max_lng, bounds.min_lat
                );
                pairs.append_pair("viewbox", &viewbox);
                pairs.append_pair("bounded", "1");
            }
        }
        url
    }
}

impl Geocoder for NominatimClient {
    fn lookup(&self, text: &str) -> Result<Vec<Candidate>, GeocodeFailure> {
        let transport = |err: reqwest::Error| GeocodeFailure::Transport {
            message: err.to_string(),
        };

        let places = self
            .client
            .get(self.search_url(text))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<Vec<NominatimPlace>>())
            .map_err(transport)?;

        let candidates: Vec<Candidate> = places.into_iter().filter_map(NominatimPlace::into_candidate).collect();
        debug!(query = text, candidates = candidates.len(), "geocoding lookup answered");
        Ok(candidates)
    }
}

/// Nominatim sends coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl NominatimPlace {
    fn into_candidate(self) -> Option<Candidate> {
        let lat = self.lat.trim().parse().ok()?;
        let lng = self.lon.trim().parse().ok()?;
        Some(Candidate::new(lat, lng, self.display_name))
    }
}
