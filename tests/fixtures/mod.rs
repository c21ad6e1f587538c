//! Test fixtures for waypoint-router.
//!
//! Provides:
//! - Real German city coordinates (from OpenStreetMap)
//! - Recording mock collaborators for geocoder, backend, presenter and history

#![allow(dead_code)]

pub mod german_cities;
pub mod mocks;

pub use german_cities::*;
pub use mocks::*;
