//! Resolution coordinator: issues geocoding lookups and reconciles their
//! completions against the current route.
//!
//! Lookups are plain tickets. Whoever executes them feeds the result back
//! through [`ResolutionCoordinator::complete`], in any order. A completion is
//! only applied when its point is still in the route, still pending, and has
//! not been edited since the ticket was issued.

use tracing::{debug, warn};

use crate::error::{GeocodeFailure, RouteError};
use crate::point::{Candidate, PointId, ResolutionStatus};
use crate::route::Route;

/// An outstanding geocoding lookup for one point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub point: PointId,
    pub query: String,
    /// Point revision at issue time.
    pub revision: u64,
}

/// What `resolve` did for a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Coordinate literal, resolved without a lookup.
    Immediate,
    /// Already resolved from an earlier lookup.
    AlreadyResolved,
    /// A lookup for the same input is still outstanding.
    AlreadyPending,
    /// Nothing to resolve.
    Blank,
    Issued(LookupTicket),
}

impl ResolveOutcome {
    pub fn ticket(self) -> Option<LookupTicket> {
        match self {
            ResolveOutcome::Issued(ticket) => Some(ticket),
            _ => None,
        }
    }
}

/// Result of feeding a lookup completion back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied(ResolutionStatus),
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub issued: u64,
    pub applied: u64,
    pub discarded: u64,
}

#[derive(Debug, Default)]
pub struct ResolutionCoordinator {
    stats: ResolverStats,
}

impl ResolutionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub fn resolve(&mut self, route: &mut Route, id: PointId) -> Result<ResolveOutcome, RouteError> {
        let point = route.get_mut(id).ok_or(RouteError::UnknownPoint { id })?;

        if point.is_literal() {
            return Ok(ResolveOutcome::Immediate);
        }

        match point.status() {
            ResolutionStatus::Resolved => return Ok(ResolveOutcome::AlreadyResolved),
            ResolutionStatus::Pending => return Ok(ResolveOutcome::AlreadyPending),
            ResolutionStatus::Unresolved | ResolutionStatus::Failed => {}
        }

        if point.is_empty() {
            return Ok(ResolveOutcome::Blank);
        }

        point.mark_pending();
        let ticket = LookupTicket {
            point: id,
            query: point.raw_input().trim().to_string(),
            revision: point.revision(),
        };
        self.stats.issued += 1;
        debug!(point = %id, query = %ticket.query, "geocoding lookup issued");

        Ok(ResolveOutcome::Issued(ticket))
    }

    pub fn resolve_at(&mut self, route: &mut Route, index: usize) -> Result<ResolveOutcome, RouteError> {
        let id = *route.ids().get(index).ok_or(RouteError::IndexOutOfBounds {
            index,
            len: route.len(),
        })?;
        self.resolve(route, id)
    }

    /// One outcome per point, in route order.
    pub fn resolve_all(&mut self, route: &mut Route) -> Vec<ResolveOutcome> {
        let ids = route.ids().to_vec();
        ids.into_iter()
            // ids were just read from the route, so lookup cannot fail
            .filter_map(|id| self.resolve(route, id).ok())
            .collect()
    }

    pub fn complete(
        &mut self,
        route: &mut Route,
        ticket: &LookupTicket,
        result: Result<Vec<Candidate>, GeocodeFailure>,
    ) -> Completion {
        let Some(point) = route.get_mut(ticket.point) else {
            return self.discard(ticket, "point removed");
        };
        if point.revision() != ticket.revision {
            return self.discard(ticket, "input edited");
        }
        if point.status() != ResolutionStatus::Pending {
            return self.discard(ticket, "not pending");
        }

        match result {
            Ok(candidates) => point.resolve_with(candidates),
            Err(failure) => {
                warn!(point = %ticket.point, error = %failure, "geocoding lookup failed");
                point.fail(failure);
            }
        }
        self.stats.applied += 1;
        debug!(point = %ticket.point, status = ?point.status(), "geocoding lookup applied");

        Completion::Applied(point.status())
    }

    fn discard(&mut self, ticket: &LookupTicket, reason: &'static str) -> Completion {
        self.stats.discarded += 1;
        debug!(point = %ticket.point, query = %ticket.query, reason, "stale geocoding response discarded");
        Completion::Stale
    }
}
