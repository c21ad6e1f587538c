//! Session driver.
//!
//! Owns the route, the request options and the last response, and wires the
//! resolver and orchestrator to the collaborators. All state changes happen
//! on the caller's thread, one event at a time. Geocoding lookups are the
//! only work fanned out, via rayon, and their completions are applied back
//! here one by one.

use std::collections::HashMap;
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{GeocodeFailure, HistoryError, RouteError, RouteRequestFailure};
use crate::geo;
use crate::history::UrlState;
use crate::options::{Profile, RequestOptions, UnitSystem};
use crate::orchestrator::{Action, DispatchTicket, Orchestrator};
use crate::point::{Candidate, Coordinate, Point, PointId, ResolutionStatus};
use crate::resolver::{Completion, LookupTicket, ResolutionCoordinator, ResolveOutcome};
use crate::response::{Path, RouteResponse};
use crate::route::Route;
use crate::traits::{Geocoder, HistorySink, Marker, MarkerPresenter, ResultPresenter, RoutingBackend};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Route through the history sink instead of querying directly.
    pub history_enabled: bool,
    /// Profile for URL states that do not name one.
    pub default_profile: Profile,
    pub default_options: RequestOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_enabled: true,
            default_profile: Profile::Car,
            default_options: RequestOptions::default(),
        }
    }
}

pub struct Session<G, B, P> {
    config: SessionConfig,
    route: Route,
    options: RequestOptions,
    resolver: ResolutionCoordinator,
    orchestrator: Orchestrator,
    geocoder: G,
    backend: B,
    presenter: P,
    history: Option<Box<dyn HistorySink>>,
    lookups: Vec<LookupTicket>,
    requests: Vec<DispatchTicket>,
    in_flight: HashMap<u64, bool>,
    response: Option<RouteResponse>,
    selected: usize,
    focus_on: Option<PointId>,
    clock: fn() -> DateTime<Utc>,
}

impl<G, B, P> Session<G, B, P>
where
    G: Geocoder,
    B: RoutingBackend,
    P: ResultPresenter + MarkerPresenter,
{
    /// A session without history; requests go straight to the backend.
    pub fn new(geocoder: G, backend: B, presenter: P) -> Self {
        Self::with_config(SessionConfig::default(), geocoder, backend, presenter, None)
    }

    pub fn with_config(
        config: SessionConfig,
        geocoder: G,
        backend: B,
        presenter: P,
        history: Option<Box<dyn HistorySink>>,
    ) -> Self {
        let history_enabled = config.history_enabled && history.is_some();
        let mut options = config.default_options.clone();
        options.profile = config.default_profile.clone();

        Self {
            config,
            route: Route::new(),
            options,
            resolver: ResolutionCoordinator::new(),
            orchestrator: Orchestrator::new(history_enabled),
            geocoder,
            backend,
            presenter,
            history,
            lookups: Vec::new(),
            requests: Vec::new(),
            in_flight: HashMap::new(),
            response: None,
            selected: 0,
            focus_on: None,
            clock: Utc::now,
        }
    }

    /// Replaces the wall clock used for transit departures.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn response(&self) -> Option<&RouteResponse> {
        self.response.as_ref()
    }

    pub fn selected_path(&self) -> Option<&Path> {
        self.response.as_ref()?.paths.get(self.selected)
    }

    pub fn resolver(&self) -> &ResolutionCoordinator {
        &self.resolver
    }

    pub fn is_ready(&self) -> bool {
        Orchestrator::is_ready(&self.route)
    }

    /// Dispatched requests whose result may still be applied.
    pub fn in_flight_requests(&self) -> usize {
        self.in_flight.len()
    }

    // --- user edits -------------------------------------------------------

    /// Text typed into the field at `index`.
    /// Retyping the text a point already resolved, or is resolving, to is a
    /// no-op.
    pub fn set_input(&mut self, index: usize, text: &str) -> Result<(), RouteError> {
        let point = self.point_at_mut(index)?;
        if point.raw_input() == text
            && matches!(point.status(), ResolutionStatus::Resolved | ResolutionStatus::Pending)
        {
            return Ok(());
        }
        point.set_input(text);
        let id = point.id();
        self.resolve(id)?;
        self.after_mutation();
        Ok(())
    }

    /// Adds a stop with `text` at `index`.
    pub fn insert_input(&mut self, index: usize, text: &str) -> Result<PointId, RouteError> {
        let id = self.route.insert(Point::create(text), index)?;
        self.resolve(id)?;
        self.after_mutation();
        Ok(id)
    }

    pub fn set_start(&mut self, coordinate: Coordinate) -> Result<(), RouteError> {
        self.set_coordinate(0, coordinate)
    }

    pub fn set_end(&mut self, coordinate: Coordinate) -> Result<(), RouteError> {
        let last = self.route.len().saturating_sub(1);
        self.set_coordinate(last, coordinate)
    }

    pub fn set_coordinate(&mut self, index: usize, coordinate: Coordinate) -> Result<(), RouteError> {
        self.point_at_mut(index)?.set_coordinate(coordinate);
        self.after_mutation();
        Ok(())
    }

    /// Via point from a map click, placed on the leg of the displayed path
    /// closest to the click. Without a displayed path it goes right before
    /// the destination. The viewport stays where it is.
    pub fn add_intermediate(&mut self, coordinate: Coordinate) -> Result<PointId, RouteError> {
        let index = self
            .intermediate_index(coordinate)
            .unwrap_or_else(|| self.route.len().saturating_sub(1).max(1));
        let id = self.route.insert(Point::at(coordinate), index)?;
        self.orchestrator.suppress_zoom();
        self.after_mutation();
        Ok(id)
    }

    /// Marker dropped after a drag. The viewport stays where it is.
    pub fn drag_marker(&mut self, id: PointId, coordinate: Coordinate) -> Result<(), RouteError> {
        let point = self.route.get_mut(id).ok_or(RouteError::UnknownPoint { id })?;
        point.set_coordinate(coordinate);
        self.orchestrator.suppress_zoom();
        self.after_mutation();
        Ok(())
    }

    pub fn move_to_start(&mut self, index: usize) -> Result<(), RouteError> {
        self.route.move_to(index, 0)?;
        self.after_mutation();
        Ok(())
    }

    pub fn move_to_end(&mut self, index: usize) -> Result<(), RouteError> {
        self.route.move_to_end(index)?;
        self.after_mutation();
        Ok(())
    }

    pub fn move_point(&mut self, from: usize, to: usize) -> Result<(), RouteError> {
        if from == to {
            return Ok(());
        }
        self.route.move_to(from, to)?;
        self.after_mutation();
        Ok(())
    }

    pub fn remove_point(&mut self, index: usize) -> Result<(), RouteError> {
        let removed = self.route.remove_at(index)?;
        debug!(point = %removed.id(), index, "point removed");
        self.after_mutation();
        Ok(())
    }

    pub fn set_profile(&mut self, profile: Profile) {
        info!(%profile, "profile switched");
        self.options.profile = profile;
        self.resolve_all();
        self.after_mutation();
    }

    pub fn set_units(&mut self, units: UnitSystem) {
        self.options.units = units;
        self.resolve_all();
        self.after_mutation();
    }

    /// Replaces the whole options bag, e.g. after editing transit times.
    pub fn set_options(&mut self, options: RequestOptions) {
        self.options = options;
        self.after_mutation();
    }

    /// Explicit "search" from the form.
    pub fn submit(&mut self) {
        self.resolve_all();
        self.after_mutation();
    }

    /// Highlights another alternative of the current response. Never
    /// issues a request.
    pub fn select_alternative(&mut self, index: usize) -> Result<(), RouteError> {
        let len = self.response.as_ref().map_or(0, |response| response.paths.len());
        if index >= len {
            return Err(RouteError::IndexOutOfBounds { index, len });
        }
        self.selected = index;
        self.presenter.highlight(index);
        self.refresh_markers();
        Ok(())
    }

    /// Popup text for the marker of `id`.
    pub fn marker_popup(&self, id: PointId) -> Option<String> {
        self.route.get(id).and_then(|point| self.presenter.on_open(point))
    }

    // --- history ----------------------------------------------------------

    /// Replays a state popped from history.
    ///
    /// Two or more non-empty points are resolved and queried directly; a
    /// single non-empty point is only resolved and focused.
    pub fn navigate(&mut self, state: &UrlState) {
        self.options = state.options.clone();
        self.orchestrator.set_zoom(state.do_zoom);
        self.focus_on = None;

        self.sync_points(&state.points);

        match state.non_empty_points() {
            0 => {
                debug!("navigated to empty state");
                self.orchestrator.observe(&self.route);
                self.refresh_markers();
            }
            1 => {
                let index = state.points.iter().position(|p| !p.trim().is_empty()).unwrap_or(0);
                if let Some(id) = self.route.ids().get(index).copied() {
                    self.focus_on = Some(id);
                    if self.resolve(id).is_ok() {
                        self.try_focus();
                    }
                }
                self.orchestrator.observe(&self.route);
                self.refresh_markers();
            }
            _ => {
                self.resolve_all();
                self.refresh_markers();
                let action = self.orchestrator.on_navigation(&self.route, &self.options, (self.clock)());
                self.apply(action);
            }
        }
    }

    /// Parses and replays a shareable URL.
    pub fn navigate_url(&mut self, url: &str) -> Result<(), HistoryError> {
        let state = UrlState::from_query(url, &self.config.default_profile).map_err(|err| {
            warn!(error = %err, "url state rejected");
            err
        })?;
        self.navigate(&state);
        Ok(())
    }

    /// Current state as it would be pushed to history.
    pub fn url_state(&self) -> UrlState {
        UrlState::capture(&self.route, &self.options, self.orchestrator.zoom())
    }

    // --- completions ------------------------------------------------------

    /// Hands out the lookups issued so far for an external executor.
    pub fn take_pending_lookups(&mut self) -> Vec<LookupTicket> {
        std::mem::take(&mut self.lookups)
    }

    pub fn take_pending_requests(&mut self) -> Vec<DispatchTicket> {
        std::mem::take(&mut self.requests)
    }

    pub fn complete_lookup(
        &mut self,
        ticket: &LookupTicket,
        result: Result<Vec<Candidate>, GeocodeFailure>,
    ) -> Completion {
        let completion = self.resolver.complete(&mut self.route, ticket, result);
        let Completion::Applied(status) = completion else {
            return completion;
        };

        if status == ResolutionStatus::Failed {
            let index = self.route.index_of(ticket.point);
            let failure = self.route.get(ticket.point).and_then(Point::failure);
            if let (Some(index), Some(failure)) = (index, failure) {
                self.presenter.show_point_failure(index, failure);
            }
        }
        self.try_focus();
        self.refresh_markers();

        let action = self.orchestrator.on_resolution(&self.route, &self.options, (self.clock)());
        self.apply(action);
        completion
    }

    /// Feeds a routing result back. Returns whether it was applied; results
    /// of superseded requests are dropped.
    pub fn complete_request(&mut self, seq: u64, result: Result<RouteResponse, RouteRequestFailure>) -> bool {
        let zoom = self.in_flight.remove(&seq).unwrap_or(true);
        if !self.orchestrator.accept(seq) {
            return false;
        }
        // Older requests can no longer be applied.
        self.in_flight.retain(|&pending, _| pending > seq);

        match result {
            Ok(response) => {
                debug!(seq, paths = response.paths.len(), "routing response applied");
                self.selected = 0;
                self.presenter.show_paths(&response.paths, 0, zoom);
                if self.options.debug {
                    self.show_detail_markers(&response);
                }
                self.response = Some(response);
                self.refresh_markers();
            }
            Err(failure) => {
                warn!(seq, error = %failure, "routing request failed");
                self.presenter.show_error(&failure);
            }
        }
        true
    }

    /// Runs everything outstanding until the session is quiet: lookups in
    /// parallel, then the latest routing request.
    pub fn run(&mut self) {
        loop {
            if !self.lookups.is_empty() {
                self.run_lookups();
            } else if !self.requests.is_empty() {
                self.run_requests();
            } else {
                break;
            }
        }
    }

    /// Executes pending lookups concurrently. Once all of them have
    /// returned, results are applied in the order they completed.
    pub fn run_lookups(&mut self) {
        let tickets = self.take_pending_lookups();
        if tickets.is_empty() {
            return;
        }

        let (sender, receiver) = mpsc::channel();
        let geocoder = &self.geocoder;
        tickets.into_par_iter().for_each_with(sender, |sender, ticket| {
            let result = geocoder.lookup(&ticket.query);
            // The receiver outlives this loop.
            let _ = sender.send((ticket, result));
        });

        for (ticket, result) in receiver {
            self.complete_lookup(&ticket, result);
        }
    }

    pub fn run_requests(&mut self) {
        for ticket in self.take_pending_requests() {
            let result = self.backend.route(&ticket.payload);
            self.complete_request(ticket.seq, result);
        }
    }

    // --- internals --------------------------------------------------------

    fn point_at_mut(&mut self, index: usize) -> Result<&mut Point, RouteError> {
        let len = self.route.len();
        self.route
            .at_mut(index)
            .ok_or(RouteError::IndexOutOfBounds { index, len })
    }

    fn resolve(&mut self, id: PointId) -> Result<(), RouteError> {
        if let ResolveOutcome::Issued(ticket) = self.resolver.resolve(&mut self.route, id)? {
            self.lookups.push(ticket);
        }
        Ok(())
    }

    fn resolve_all(&mut self) {
        let tickets = self
            .resolver
            .resolve_all(&mut self.route)
            .into_iter()
            .filter_map(ResolveOutcome::ticket);
        self.lookups.extend(tickets);
    }

    fn after_mutation(&mut self) {
        self.refresh_markers();
        let action = self.orchestrator.on_mutation(&self.route, &self.options, (self.clock)());
        self.apply(action);
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Idle => {}
            Action::PushHistory(state) => {
                if let Some(history) = self.history.as_mut() {
                    history.push_state(&state);
                }
            }
            Action::Dispatch(ticket) => {
                self.in_flight.insert(ticket.seq, ticket.zoom);
                self.requests.push(ticket);
            }
            Action::Rejected(err) => self.presenter.show_rejected(&err),
        }
    }

    /// Makes the route mirror `inputs`, keeping resolved points whose text
    /// did not change.
    fn sync_points(&mut self, inputs: &[String]) {
        self.route.ensure_len(inputs.len());
        self.route.truncate(inputs.len());

        for (index, input) in inputs.iter().enumerate() {
            let Some(point) = self.route.at_mut(index) else {
                continue;
            };
            let unchanged = point.raw_input() == input
                && matches!(point.status(), ResolutionStatus::Resolved | ResolutionStatus::Pending);
            if !unchanged {
                point.set_input(input.as_str());
            }
        }
        // Padding stops beyond the state are blank.
        for index in inputs.len()..self.route.len() {
            if let Some(point) = self.route.at_mut(index) {
                if !point.is_empty() {
                    point.set_input("");
                }
            }
        }
    }

    fn try_focus(&mut self) {
        let Some(id) = self.focus_on else {
            return;
        };
        match self.route.get(id).map(|point| (point.status(), point.coordinate())) {
            Some((ResolutionStatus::Resolved, Some(coordinate))) => {
                self.focus_on = None;
                self.presenter.focus(coordinate);
            }
            Some((ResolutionStatus::Pending, _)) => {}
            _ => self.focus_on = None,
        }
    }

    fn intermediate_index(&self, click: Coordinate) -> Option<usize> {
        let path = self.selected_path()?;
        let geometry = path.geometry(self.options.elevation).ok()?;
        let waypoints = path.snapped(self.options.elevation).ok()?;
        if waypoints.len() != self.route.len() {
            return None;
        }
        geo::intermediate_insert_index(geometry.points(), waypoints.points(), click)
    }

    fn show_detail_markers(&mut self, response: &RouteResponse) {
        let Some(path) = response.paths.first() else {
            return;
        };
        match path.geometry(self.options.elevation) {
            Ok(geometry) => self.presenter.show_detail_markers(&path.detail_markers(&geometry)),
            Err(err) => warn!(error = %err, "path geometry could not be decoded"),
        }
    }

    /// Re-places one marker per resolved stop. A path that reordered the
    /// stops dictates the marker order.
    fn refresh_markers(&mut self) {
        let ids = self.route.ids().to_vec();
        let order: Vec<usize> = self
            .selected_path()
            .and_then(|path| path.points_order.clone())
            .filter(|order| order.len() == ids.len() && order.iter().all(|i| *i < ids.len()))
            .unwrap_or_else(|| (0..ids.len()).collect());

        self.presenter.clear_markers();
        for (position, original) in order.into_iter().enumerate() {
            let Some(point) = self.route.get(ids[original]) else {
                continue;
            };
            let Some(coordinate) = point.coordinate() else {
                continue;
            };
            self.presenter.place_marker(&Marker {
                point: point.id(),
                index: position,
                role: self.route.role_of(position),
                coordinate,
            });
        }
    }
}
