//! Request orchestrator.
//!
//! Decides when a routing request is due and what it carries. It never
//! performs I/O: every decision comes back as an [`Action`] for the session
//! to carry out, and every dispatched request is tagged with a sequence
//! number so that only the newest response is ever applied.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::RequestError;
use crate::history::UrlState;
use crate::options::RequestOptions;
use crate::request::RoutePayload;
use crate::route::{MIN_POINTS, Route};

/// A routing request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchTicket {
    pub seq: u64,
    pub payload: RoutePayload,
    /// Whether the viewport should follow the result.
    pub zoom: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Not ready, or readiness did not change.
    Idle,
    /// Record the state in history; the request follows on navigation.
    PushHistory(UrlState),
    Dispatch(DispatchTicket),
    /// Refused before dispatch.
    Rejected(RequestError),
}

#[derive(Debug)]
pub struct Orchestrator {
    history_enabled: bool,
    was_ready: bool,
    do_zoom: bool,
    /// Next request skips history because it replays a navigation.
    direct_next: bool,
    last_seq: u64,
    applied_seq: Option<u64>,
    decorrelation: u64,
}

impl Orchestrator {
    pub fn new(history_enabled: bool) -> Self {
        Self {
            history_enabled,
            was_ready: false,
            do_zoom: true,
            direct_next: false,
            last_seq: 0,
            applied_seq: None,
            decorrelation: 0,
        }
    }

    pub fn is_ready(route: &Route) -> bool {
        route.len() >= MIN_POINTS && route.is_fully_resolved()
    }

    /// Keeps the viewport still for the next request only.
    pub fn suppress_zoom(&mut self) {
        self.do_zoom = false;
    }

    pub fn set_zoom(&mut self, zoom: bool) {
        self.do_zoom = zoom;
    }

    pub fn zoom(&self) -> bool {
        self.do_zoom
    }

    /// Sequence number of the newest dispatched request.
    pub fn last_seq(&self) -> Option<u64> {
        (self.last_seq > 0).then_some(self.last_seq)
    }

    /// A user edit. Routes whenever the edited route is ready.
    pub fn on_mutation(&mut self, route: &Route, options: &RequestOptions, now: DateTime<Utc>) -> Action {
        self.direct_next = false;
        self.evaluate(route, options, now, true)
    }

    /// A lookup completion. Routes only when it completed the route.
    pub fn on_resolution(&mut self, route: &Route, options: &RequestOptions, now: DateTime<Utc>) -> Action {
        self.evaluate(route, options, now, false)
    }

    /// A replayed history state. The request, now or after resolution,
    /// goes straight to the backend.
    pub fn on_navigation(&mut self, route: &Route, options: &RequestOptions, now: DateTime<Utc>) -> Action {
        self.direct_next = true;
        self.evaluate(route, options, now, true)
    }

    /// Records readiness after an edit that must not route.
    pub fn observe(&mut self, route: &Route) {
        self.direct_next = false;
        self.was_ready = Self::is_ready(route);
    }

    /// Whether a response for `seq` may be applied. Only the newest
    /// dispatched request qualifies, and only once.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq != self.last_seq || self.applied_seq == Some(seq) {
            debug!(seq, latest = self.last_seq, "superseded routing response discarded");
            return false;
        }
        self.applied_seq = Some(seq);
        true
    }

    fn evaluate(&mut self, route: &Route, options: &RequestOptions, now: DateTime<Utc>, always: bool) -> Action {
        let ready = Self::is_ready(route);
        let became_ready = ready && !self.was_ready;
        self.was_ready = ready;

        if !ready || !(always || became_ready) {
            return Action::Idle;
        }
        self.request(route, options, now)
    }

    fn request(&mut self, route: &Route, options: &RequestOptions, now: DateTime<Utc>) -> Action {
        let payload = match RoutePayload::build(route, options, now) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, profile = %options.profile, "routing request rejected");
                return Action::Rejected(err);
            }
        };
        let zoom = std::mem::replace(&mut self.do_zoom, true);

        if self.history_enabled && !std::mem::take(&mut self.direct_next) {
            self.decorrelation += 1;
            let state = UrlState::capture(route, options, zoom).with_decorrelation(self.decorrelation);
            info!(points = route.len(), profile = %options.profile, "history state pushed");
            return Action::PushHistory(state);
        }
        self.direct_next = false;

        self.last_seq += 1;
        info!(seq = self.last_seq, points = payload.points.len(), profile = %payload.profile, zoom, "routing request dispatched");
        Action::Dispatch(DispatchTicket {
            seq: self.last_seq,
            payload,
            zoom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Profile;
    use crate::point::Candidate;
    use crate::resolver::ResolutionCoordinator;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_714_552_200, 0).unwrap()
    }

    fn dispatched(action: Action) -> DispatchTicket {
        match action {
            Action::Dispatch(ticket) => ticket,
            other => panic!("expected dispatch, got {:?}", other),
        }
    }

    #[test]
    fn test_not_ready_with_unresolved_point() {
        let route = Route::from_inputs(["52.5,13.4", "Munich"]);
        let mut orchestrator = Orchestrator::new(false);
        assert_eq!(orchestrator.on_mutation(&route, &RequestOptions::default(), now()), Action::Idle);
    }

    #[test]
    fn test_mutation_on_ready_route_dispatches() {
        let route = Route::from_inputs(["52.5,13.4", "48.1,11.5"]);
        let mut orchestrator = Orchestrator::new(false);
        let ticket = dispatched(orchestrator.on_mutation(&route, &RequestOptions::default(), now()));

        assert_eq!(ticket.seq, 1);
        assert_eq!(ticket.payload.points.len(), 2);
        assert!(ticket.zoom);
    }

    #[test]
    fn test_resolution_dispatches_only_on_transition() {
        let mut route = Route::from_inputs(["Berlin", "Munich"]);
        let mut resolver = ResolutionCoordinator::new();
        let mut orchestrator = Orchestrator::new(false);
        let options = RequestOptions::default();

        let tickets: Vec<_> = resolver
            .resolve_all(&mut route)
            .into_iter()
            .filter_map(|outcome| outcome.ticket())
            .collect();
        assert_eq!(orchestrator.on_mutation(&route, &options, now()), Action::Idle);

        resolver.complete(&mut route, &tickets[0], Ok(vec![Candidate::new(52.52, 13.405, "Berlin")]));
        assert_eq!(orchestrator.on_resolution(&route, &options, now()), Action::Idle);

        resolver.complete(&mut route, &tickets[1], Ok(vec![Candidate::new(48.137, 11.575, "München")]));
        let ticket = dispatched(orchestrator.on_resolution(&route, &options, now()));
        assert_eq!(ticket.payload.profile, Profile::Car);

        // A repeated check without a change does not dispatch again.
        assert_eq!(orchestrator.on_resolution(&route, &options, now()), Action::Idle);
    }

    #[test]
    fn test_zoom_suppression_is_one_shot() {
        let route = Route::from_inputs(["52.5,13.4", "48.1,11.5"]);
        let mut orchestrator = Orchestrator::new(false);
        let options = RequestOptions::default();

        orchestrator.suppress_zoom();
        assert!(!dispatched(orchestrator.on_mutation(&route, &options, now())).zoom);
        assert!(dispatched(orchestrator.on_mutation(&route, &options, now())).zoom);
    }

    #[test]
    fn test_only_latest_response_accepted() {
        let route = Route::from_inputs(["52.5,13.4", "48.1,11.5"]);
        let mut orchestrator = Orchestrator::new(false);
        let options = RequestOptions::default();

        let first = dispatched(orchestrator.on_mutation(&route, &options, now()));
        let second = dispatched(orchestrator.on_mutation(&route, &options, now()));

        assert!(!orchestrator.accept(first.seq));
        assert!(orchestrator.accept(second.seq));
        assert!(!orchestrator.accept(second.seq));
    }

    #[test]
    fn test_history_push_then_direct_navigation() {
        let route = Route::from_inputs(["52.5,13.4", "48.1,11.5"]);
        let mut orchestrator = Orchestrator::new(true);
        let options = RequestOptions::default();

        orchestrator.suppress_zoom();
        let state = match orchestrator.on_mutation(&route, &options, now()) {
            Action::PushHistory(state) => state,
            other => panic!("expected history push, got {:?}", other),
        };
        assert_eq!(state.decorrelation, Some(1));
        assert!(!state.do_zoom);
        assert_eq!(orchestrator.last_seq(), None);

        orchestrator.set_zoom(state.do_zoom);
        let ticket = dispatched(orchestrator.on_navigation(&route, &options, now()));
        assert!(!ticket.zoom);
    }

    #[test]
    fn test_malformed_custom_model_rejected() {
        let route = Route::from_inputs(["52.5,13.4", "48.1,11.5"]);
        let mut orchestrator = Orchestrator::new(false);
        let options = RequestOptions {
            custom_model: Some("{ not json".to_string()),
            ..RequestOptions::default()
        };

        let action = orchestrator.on_mutation(&route, &options, now());
        assert!(matches!(action, Action::Rejected(RequestError::MalformedCustomModel { .. })));
        assert_eq!(orchestrator.last_seq(), None);
    }
}
