//! Great-circle helpers for map interactions.
//!
//! Used to decide where a via point clicked on the map belongs in the
//! current itinerary.

use crate::point::Coordinate;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates in meters.
pub fn haversine_m(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Index of the vertex closest to `target`.
pub fn nearest_index(points: &[Coordinate], target: Coordinate) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .map(|(index, point)| (index, haversine_m(*point, target)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

/// Route position for a via point clicked at `click`.
///
/// `geometry` is the displayed path and `waypoints` its snapped stops in
/// route order. The click is attached to the geometry vertex nearest to it;
/// the point is inserted after the last stop reached before that vertex.
/// Returns `None` when there is no usable geometry.
pub fn intermediate_insert_index(
    geometry: &[Coordinate],
    waypoints: &[Coordinate],
    click: Coordinate,
) -> Option<usize> {
    if waypoints.len() < 2 {
        return None;
    }
    let nearest = nearest_index(geometry, click)?;

    // Waypoints are matched front to back so loops in the path stay ordered.
    let mut search_from = 0;
    let mut stops_before = 0;
    for waypoint in waypoints {
        let offset = nearest_index(&geometry[search_from..], *waypoint)?;
        let vertex = search_from + offset;
        if vertex > nearest {
            break;
        }
        stops_before += 1;
        search_from = vertex;
    }

    Some(stops_before.clamp(1, waypoints.len() - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinate::new(52.52, 13.405);
        assert!(haversine_m(point, point) < 1.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Berlin to Munich is roughly 505 km as the crow flies
        let dist = haversine_m(Coordinate::new(52.52, 13.405), Coordinate::new(48.137, 11.575));
        assert!(dist > 490_000.0 && dist < 520_000.0, "Berlin to Munich should be ~505km, got {}", dist);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = Coordinate::new(50.11, 8.68);
        let b = Coordinate::new(50.94, 6.96);
        assert_eq!(haversine_m(a, b), haversine_m(b, a));
    }

    fn straight_line() -> Vec<Coordinate> {
        (0..=10).map(|i| Coordinate::new(50.0, 10.0 + i as f64 * 0.1)).collect()
    }

    #[test]
    fn test_insert_index_two_stops() {
        let geometry = straight_line();
        let waypoints = vec![geometry[0], geometry[10]];
        let click = Coordinate::new(50.01, 10.52);
        assert_eq!(intermediate_insert_index(&geometry, &waypoints, click), Some(1));
    }

    #[test]
    fn test_insert_index_picks_segment() {
        let geometry = straight_line();
        let waypoints = vec![geometry[0], geometry[4], geometry[10]];

        let before_via = Coordinate::new(50.01, 10.21);
        let after_via = Coordinate::new(50.01, 10.79);
        assert_eq!(intermediate_insert_index(&geometry, &waypoints, before_via), Some(1));
        assert_eq!(intermediate_insert_index(&geometry, &waypoints, after_via), Some(2));
    }

    #[test]
    fn test_insert_index_without_geometry() {
        let waypoints = vec![Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)];
        assert_eq!(intermediate_insert_index(&[], &waypoints, Coordinate::new(1.5, 1.5)), None);
    }
}
