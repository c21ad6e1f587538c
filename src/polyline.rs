//! Polyline representation for route geometries.
//!
//! Paths arrive either as an encoded polyline string, a WKT line string or a
//! GeoJSON coordinate list. All three are decoded at the boundary into a
//! plain coordinate sequence.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::point::Coordinate;

/// Coordinate precision of encoded polylines.
const COORDINATE_FACTOR: f64 = 1e5;

/// Elevation precision of encoded polylines (centimetres).
const ELEVATION_FACTOR: f64 = 100.0;

/// A route geometry as decoded coordinates, with optional elevation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
    elevations: Option<Vec<f64>>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self {
            points,
            elevations: None,
        }
    }

    pub fn with_elevations(points: Vec<Coordinate>, elevations: Vec<f64>) -> Self {
        Self {
            points,
            elevations: Some(elevations),
        }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn elevations(&self) -> Option<&[f64]> {
        self.elevations.as_deref()
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Decodes an encoded polyline. With `elevation` every vertex carries a
    /// third value in centimetres.
    pub fn decode(encoded: &str, elevation: bool) -> Result<Self, GeometryError> {
        let bytes = encoded.as_bytes();
        let mut offset = 0;
        let (mut lat, mut lng, mut ele) = (0i64, 0i64, 0i64);
        let mut points = Vec::new();
        let mut elevations = Vec::new();

        while offset < bytes.len() {
            lat += next_value(bytes, &mut offset)?;
            lng += next_value(bytes, &mut offset)?;
            points.push(Coordinate::new(
                lat as f64 / COORDINATE_FACTOR,
                lng as f64 / COORDINATE_FACTOR,
            ));
            if elevation {
                ele += next_value(bytes, &mut offset)?;
                elevations.push(ele as f64 / ELEVATION_FACTOR);
            }
        }

        Ok(Self {
            points,
            elevations: elevation.then_some(elevations),
        })
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        let (mut prev_lat, mut prev_lng, mut prev_ele) = (0i64, 0i64, 0i64);

        for (index, point) in self.points.iter().enumerate() {
            let lat = (point.lat * COORDINATE_FACTOR).round() as i64;
            let lng = (point.lng * COORDINATE_FACTOR).round() as i64;
            push_value(&mut out, lat - prev_lat);
            push_value(&mut out, lng - prev_lng);
            prev_lat = lat;
            prev_lng = lng;

            if let Some(elevations) = &self.elevations {
                let ele = (elevations.get(index).copied().unwrap_or(0.0) * ELEVATION_FACTOR).round() as i64;
                push_value(&mut out, ele - prev_ele);
                prev_ele = ele;
            }
        }
        out
    }

    /// Parses `LINESTRING (lng lat, ...)`, optionally with a Z component.
    pub fn from_wkt(text: &str) -> Result<Self, GeometryError> {
        let invalid = |reason: &str| GeometryError::InvalidWkt {
            reason: reason.to_string(),
        };

        let trimmed = text.trim();
        if !trimmed.to_ascii_uppercase().starts_with("LINESTRING") {
            return Err(invalid("not a LINESTRING"));
        }
        let open = trimmed.find('(').ok_or_else(|| invalid("missing '('"))?;
        let close = trimmed.rfind(')').ok_or_else(|| invalid("missing ')'"))?;
        if close < open {
            return Err(invalid("unbalanced parentheses"));
        }

        let body = trimmed[open + 1..close].trim();
        if body.is_empty() {
            return Ok(Self::default());
        }

        let mut lng_lat = Vec::new();
        for vertex in body.split(',') {
            let values = vertex
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| invalid(&err.to_string()))?;
            if values.len() < 2 {
                return Err(invalid("vertex needs at least two values"));
            }
            lng_lat.push(values);
        }
        Ok(Self::from_lng_lat(&lng_lat))
    }

    /// Builds from GeoJSON ordered `[lng, lat(, ele)]` tuples.
    pub fn from_lng_lat(coordinates: &[Vec<f64>]) -> Self {
        let points = coordinates
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| Coordinate::new(c[1], c[0]))
            .collect();
        let elevations = if !coordinates.is_empty() && coordinates.iter().all(|c| c.len() >= 3) {
            Some(coordinates.iter().map(|c| c[2]).collect())
        } else {
            None
        };
        Self { points, elevations }
    }
}

fn next_value(bytes: &[u8], offset: &mut usize) -> Result<i64, GeometryError> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let Some(&byte) = bytes.get(*offset) else {
            return Err(GeometryError::Truncated { offset: *offset });
        };
        if !(63..=126).contains(&byte) || shift > 60 {
            return Err(GeometryError::InvalidCharacter { offset: *offset });
        }
        let chunk = i64::from(byte) - 63;
        *offset += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}

fn push_value(out: &mut String, value: i64) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push(char::from((((value & 0x1f) | 0x20) + 63) as u8));
        value >>= 5;
    }
    out.push(char::from((value + 63) as u8));
}
