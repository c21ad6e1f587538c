//! Per-request routing options.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Named routing mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    #[default]
    Car,
    Foot,
    Bike,
    Truck,
    SmallTruck,
    PublicTransit,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Profile::Car => "car",
            Profile::Foot => "foot",
            Profile::Bike => "bike",
            Profile::Truck => "truck",
            Profile::SmallTruck => "small_truck",
            Profile::PublicTransit => "pt",
            Profile::Custom(name) => name,
        }
    }

    pub fn is_public_transit(&self) -> bool {
        matches!(self, Profile::PublicTransit)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let profile = match name.to_ascii_lowercase().as_str() {
            "" => return Err("empty profile name"),
            "car" => Profile::Car,
            "foot" => Profile::Foot,
            "bike" => Profile::Bike,
            "truck" => Profile::Truck,
            "small_truck" => Profile::SmallTruck,
            "pt" => Profile::PublicTransit,
            _ => Profile::Custom(name.to_string()),
        };
        Ok(profile)
    }
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Profile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn from_use_miles(use_miles: bool) -> Self {
        if use_miles {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }

    pub fn use_miles(self) -> bool {
        self == UnitSystem::Imperial
    }
}

/// Limits for alternative street routes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlternativeRoutes {
    pub max_paths: u32,
    pub max_weight_factor: f64,
    pub max_share_factor: f64,
}

impl Default for AlternativeRoutes {
    fn default() -> Self {
        Self {
            max_paths: 2,
            max_weight_factor: 1.4,
            max_share_factor: 0.6,
        }
    }
}

/// Public transit query parameters; ignored for street profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitOptions {
    pub earliest_departure_time: Option<DateTime<Utc>>,
    pub arrive_by: bool,
    pub limit_solutions: u32,
    /// Minutes.
    pub max_profile_duration: u32,
    pub limit_street_time_seconds: u32,
    pub use_pareto: bool,
    pub beta_transfers: f64,
    pub access_mode: String,
    pub egress_mode: String,
    pub beta_access_time: f64,
    pub beta_egress_time: f64,
    /// 0 selects the service default.
    pub max_visited_nodes: u32,
}

pub const DEFAULT_MAX_VISITED_NODES: u32 = 1_000_000;

impl Default for TransitOptions {
    fn default() -> Self {
        Self {
            earliest_departure_time: None,
            arrive_by: false,
            limit_solutions: 4,
            max_profile_duration: 10,
            limit_street_time_seconds: 1440,
            use_pareto: false,
            beta_transfers: 1_440_000.0,
            access_mode: "foot".to_string(),
            egress_mode: "foot".to_string(),
            beta_access_time: 1.5,
            beta_egress_time: 1.5,
            max_visited_nodes: DEFAULT_MAX_VISITED_NODES,
        }
    }
}

/// Options bag captured for a single routing request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestOptions {
    pub profile: Profile,
    pub units: UnitSystem,
    pub alternatives: AlternativeRoutes,
    pub elevation: bool,
    pub debug: bool,
    pub transit: TransitOptions,
    /// Raw user text of a routing customisation, validated before dispatch.
    pub custom_model: Option<String>,
}

impl RequestOptions {
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_names() {
        assert_eq!("car".parse::<Profile>().unwrap(), Profile::Car);
        assert_eq!("PT".parse::<Profile>().unwrap(), Profile::PublicTransit);
        assert_eq!("small_truck".parse::<Profile>().unwrap(), Profile::SmallTruck);
        assert_eq!(
            "my_car".parse::<Profile>().unwrap(),
            Profile::Custom("my_car".to_string())
        );
        assert!("  ".parse::<Profile>().is_err());
        assert_eq!(Profile::PublicTransit.to_string(), "pt");
    }

    #[test]
    fn test_profile_serde_as_string() {
        let json = serde_json::to_string(&Profile::SmallTruck).unwrap();
        assert_eq!(json, "\"small_truck\"");
        let back: Profile = serde_json::from_str("\"foot\"").unwrap();
        assert_eq!(back, Profile::Foot);
    }

    #[test]
    fn test_units() {
        assert_eq!(UnitSystem::from_use_miles(true), UnitSystem::Imperial);
        assert!(!UnitSystem::default().use_miles());
    }
}
