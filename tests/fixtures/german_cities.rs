//! Real German city and landmark locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap (Nominatim top results).

use waypoint_router::{Candidate, Coordinate};

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn candidate(&self) -> Candidate {
        Candidate::new(self.lat, self.lng, self.name)
    }

    /// The `lat,lng` literal a resolved point serialises to.
    pub fn literal(&self) -> String {
        self.coordinate().to_string()
    }
}

// ============================================================================
// Cities (geocoder answers keyed by name)
// ============================================================================

pub const BERLIN: Location = Location::new("Berlin", 52.5170365, 13.3888599);
pub const MUNICH: Location = Location::new("Munich", 48.1371079, 11.5753822);
pub const HAMBURG: Location = Location::new("Hamburg", 53.550341, 10.000654);
pub const LEIPZIG: Location = Location::new("Leipzig", 51.3406321, 12.3747329);
pub const NUREMBERG: Location = Location::new("Nuremberg", 49.453872, 11.077298);
pub const FRANKFURT: Location = Location::new("Frankfurt", 50.1106444, 8.6820917);
pub const COLOGNE: Location = Location::new("Cologne", 50.938361, 6.959974);

pub const CITIES: &[Location] = &[BERLIN, MUNICH, HAMBURG, LEIPZIG, NUREMBERG, FRANKFURT, COLOGNE];

// ============================================================================
// Berlin landmarks (short urban trips, transit tests)
// ============================================================================

pub const ALEXANDERPLATZ: Location = Location::new("Alexanderplatz", 52.5219184, 13.4132147);
pub const BRANDENBURG_GATE: Location = Location::new("Brandenburger Tor", 52.5162746, 13.3777041);
pub const TEMPELHOF: Location = Location::new("Tempelhofer Feld", 52.4731, 13.4039);

pub const LANDMARKS: &[Location] = &[ALEXANDERPLATZ, BRANDENBURG_GATE, TEMPELHOF];
