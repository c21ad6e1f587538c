//! Ordered collection of route stops.
//!
//! The sequence holds point ids; the points themselves live in a map keyed by
//! id, so reordering never changes which point an in-flight lookup belongs to.

use std::collections::HashMap;

use crate::error::{RequestError, RouteError};
use crate::point::{Coordinate, Point, PointId};

/// Minimum number of stops in a routable itinerary.
pub const MIN_POINTS: usize = 2;

/// Position-derived role of a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRole {
    Origin,
    Via,
    Destination,
}

#[derive(Debug, Clone, Default)]
pub struct Route {
    order: Vec<PointId>,
    points: HashMap<PointId, Point>,
}

impl Route {
    /// An empty itinerary with blank origin and destination.
    pub fn new() -> Self {
        Self::from_inputs(["", ""])
    }

    pub fn from_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut route = Self::default();
        for input in inputs {
            route.push(Point::create(input));
        }
        route
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[PointId] {
        &self.order
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.points.contains_key(&id)
    }

    pub fn get(&self, id: PointId) -> Option<&Point> {
        self.points.get(&id)
    }

    pub fn get_mut(&mut self, id: PointId) -> Option<&mut Point> {
        self.points.get_mut(&id)
    }

    pub fn at(&self, index: usize) -> Option<&Point> {
        self.order.get(index).and_then(|id| self.points.get(id))
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut Point> {
        let id = *self.order.get(index)?;
        self.points.get_mut(&id)
    }

    pub fn index_of(&self, id: PointId) -> Option<usize> {
        self.order.iter().position(|candidate| *candidate == id)
    }

    /// Points in route order.
    pub fn iter(&self) -> impl Iterator<Item = &Point> + '_ {
        self.order.iter().filter_map(|id| self.points.get(id))
    }

    pub fn role_of(&self, index: usize) -> StopRole {
        if index == 0 {
            StopRole::Origin
        } else if index + 1 == self.order.len() {
            StopRole::Destination
        } else {
            StopRole::Via
        }
    }

    /// Appends a stop as the new destination.
    pub fn push(&mut self, point: Point) -> PointId {
        let id = point.id();
        self.order.push(id);
        self.points.insert(id, point);
        id
    }

    pub fn insert(&mut self, point: Point, index: usize) -> Result<PointId, RouteError> {
        if index > self.order.len() {
            return Err(RouteError::IndexOutOfBounds {
                index,
                len: self.order.len(),
            });
        }
        let id = point.id();
        self.order.insert(index, id);
        self.points.insert(id, point);
        Ok(id)
    }

    /// Removes the stop at `index`. Refused when it would leave fewer than
    /// two stops.
    pub fn remove_at(&mut self, index: usize) -> Result<Point, RouteError> {
        self.check_index(index)?;
        if self.order.len() <= MIN_POINTS {
            return Err(RouteError::MinimumPoints);
        }
        let id = self.order.remove(index);
        self.points
            .remove(&id)
            .ok_or(RouteError::UnknownPoint { id })
    }

    pub fn remove(&mut self, id: PointId) -> Result<Point, RouteError> {
        let index = self.index_of(id).ok_or(RouteError::UnknownPoint { id })?;
        self.remove_at(index)
    }

    pub fn move_to(&mut self, from: usize, to: usize) -> Result<(), RouteError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let id = self.order.remove(from);
        self.order.insert(to, id);
        Ok(())
    }

    pub fn move_to_end(&mut self, from: usize) -> Result<(), RouteError> {
        let last = self.order.len().saturating_sub(1);
        self.move_to(from, last)
    }

    /// Grows the route with blank stops until it holds `len` points.
    pub fn ensure_len(&mut self, len: usize) {
        while self.order.len() < len {
            self.push(Point::create(""));
        }
    }

    /// Drops trailing stops beyond `len`, never going below two.
    pub fn truncate(&mut self, len: usize) {
        let len = len.max(MIN_POINTS);
        while self.order.len() > len {
            if let Some(id) = self.order.pop() {
                self.points.remove(&id);
            }
        }
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.iter().all(Point::is_resolved)
    }

    /// Resolved coordinates in route order, or the first unresolved point.
    pub fn resolved_coordinates(&self) -> Result<Vec<Coordinate>, RequestError> {
        self.iter()
            .map(|point| {
                point
                    .coordinate()
                    .ok_or(RequestError::Unresolved { id: point.id() })
            })
            .collect()
    }

    /// Index of the stop whose coordinate equals `coordinate`.
    pub fn index_by_coordinate(&self, coordinate: Coordinate) -> Option<usize> {
        self.iter()
            .position(|point| point.coordinate() == Some(coordinate))
    }

    fn check_index(&self, index: usize) -> Result<(), RouteError> {
        if index < self.order.len() {
            Ok(())
        } else {
            Err(RouteError::IndexOutOfBounds {
                index,
                len: self.order.len(),
            })
        }
    }
}
