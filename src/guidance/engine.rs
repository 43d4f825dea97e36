//! The guidance state machine.
//!
//! [`GuidanceEngine`] owns the active route, the step index, announcement
//! bookkeeping and the off-route detector. It is driven by location fixes
//! on a single owner thread; every fix is processed to completion before
//! the next one. The only asynchronous work is the reroute request, whose
//! result is applied back on the owner thread via
//! [`poll_reroute`](GuidanceEngine::poll_reroute) or
//! [`next_reroute`](GuidanceEngine::next_reroute).

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use super::events::{EventBus, GuidanceEvent, NavigationState, RouteProgress};
use super::reroute::{
    RerouteDispatcher, RerouteOutcome, RerouteResponse, RerouteTicket, RouteRequest, RouteService,
};
use crate::announce::{
    maneuver_announcement, thresholds_for, Announcement, AnnouncementKind, AnnouncementState,
};
use crate::config::GuidanceConfig;
use crate::geo::{distance, Coordinate};
use crate::location::LocationFix;
use crate::maneuver::{capitalize, Turn};
use crate::off_route::OffRouteDetector;
use crate::route::{Route, TransportMode};

/// Turn-by-turn guidance along one route at a time.
pub struct GuidanceEngine {
    config: GuidanceConfig,
    state: NavigationState,
    route: Option<Route>,
    mode: TransportMode,
    step_index: usize,
    announcements: AnnouncementState,
    off_route: OffRouteDetector,
    is_off_route: bool,
    /// Bumped on every start and stop; stale reroute tickets carry an old value.
    session: u64,
    pending_reroute: Option<RerouteTicket>,
    last_reroute_at: Option<SystemTime>,
    last_fix: Option<LocationFix>,
    dispatcher: RerouteDispatcher,
    events: EventBus,
}

impl GuidanceEngine {
    /// Create an idle engine. Reroute requests go to `service` and run on
    /// `runtime`.
    pub fn new(config: GuidanceConfig, service: Arc<dyn RouteService>, runtime: Handle) -> Self {
        let off_route = OffRouteDetector::new(config.off_route.clone());
        let dispatcher = RerouteDispatcher::new(service, runtime, config.reroute_timeout());
        Self {
            config,
            state: NavigationState::Preparing,
            route: None,
            mode: TransportMode::default(),
            step_index: 0,
            announcements: AnnouncementState::default(),
            off_route,
            is_off_route: false,
            session: 0,
            pending_reroute: None,
            last_reroute_at: None,
            last_fix: None,
            dispatcher,
            events: EventBus::default(),
        }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&mut self) -> UnboundedReceiver<GuidanceEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// Route currently being followed, `None` once stopped.
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.mode
    }

    /// Whether the last checked fix confirmed an off-route condition.
    pub fn is_off_route(&self) -> bool {
        self.is_off_route
    }

    /// Begin guidance along `route`. An active session is stopped first.
    pub fn start_navigation(&mut self, route: Route, mode: TransportMode) {
        if self.state.is_active() {
            info!("start requested while {:?}, stopping current session", self.state);
            self.stop_navigation();
        }

        self.session += 1;
        self.mode = mode;
        self.step_index = 0;
        self.announcements.clear();
        self.off_route.configure(&route);
        self.set_off_route(false);
        self.pending_reroute = None;
        self.last_reroute_at = None;
        self.last_fix = None;

        info!(
            "navigation started: {} steps, {:.0} m, {:?}",
            route.step_count(),
            route.distance_m(),
            mode
        );

        let first = Arc::clone(&route.steps()[0]);
        let multi_step = route.step_count() > 1;
        self.route = Some(route);

        self.set_state(NavigationState::Navigating);
        self.events.publish(GuidanceEvent::StepChanged {
            index: 0,
            step: Arc::clone(&first),
        });

        if multi_step {
            let text = if first.instruction.trim().is_empty() {
                capitalize(Turn::Start.text())
            } else {
                first.instruction.clone()
            };
            self.announce(Announcement::new(AnnouncementKind::Depart, text, 0));
        }
    }

    /// End the session from any state. In-flight reroutes become no-ops.
    pub fn stop_navigation(&mut self) {
        if self.state == NavigationState::Stopped {
            return;
        }

        self.session += 1;
        self.pending_reroute = None;
        self.off_route.clear();
        self.set_off_route(false);
        self.route = None;
        self.step_index = 0;
        self.announcements.clear();
        self.last_fix = None;

        info!("navigation stopped");
        self.set_state(NavigationState::Stopped);
    }

    /// Process one location fix.
    pub fn update_location(&mut self, fix: LocationFix) {
        if !self.state.is_active() {
            return;
        }
        if !self.accept(&fix) {
            return;
        }
        self.last_fix = Some(fix);

        let Some(destination) = self.route.as_ref().map(Route::destination) else {
            return;
        };

        let location = fix.coordinate;
        if distance(location, destination) < self.config.arrival_radius_m {
            self.arrive();
            return;
        }

        if self.state == NavigationState::Navigating {
            self.check_off_route(&fix, destination);
        }

        self.advance_step(location);
        let distance_to_maneuver = self.distance_to_maneuver(location);
        self.announce_maneuver(distance_to_maneuver, fix.speed());
        self.publish_progress(&fix, distance_to_maneuver);
    }

    /// Apply a finished reroute if one is ready, without waiting.
    pub fn poll_reroute(&mut self) -> Option<RerouteOutcome> {
        let response = self.dispatcher.try_next()?;
        Some(self.apply_reroute(response))
    }

    /// Wait for the next finished reroute and apply it. Returns `None` if
    /// no request is in flight.
    pub async fn next_reroute(&mut self) -> Option<RerouteOutcome> {
        let response = self.dispatcher.next().await?;
        Some(self.apply_reroute(response))
    }

    fn accept(&self, fix: &LocationFix) -> bool {
        if !fix.is_plausible(self.config.max_accuracy_m) {
            warn!(
                "ignoring implausible fix (accuracy {:.1} m, valid coordinate: {})",
                fix.accuracy_m,
                fix.coordinate.is_valid()
            );
            return false;
        }
        if let Some(last) = &self.last_fix {
            if fix.timestamp < last.timestamp {
                debug!("ignoring out-of-order fix");
                return false;
            }
        }
        true
    }

    fn arrive(&mut self) {
        info!("arrived at destination");
        self.pending_reroute = None;
        self.set_state(NavigationState::Arrived);
        self.announce(Announcement::new(
            AnnouncementKind::Arrived,
            "You have arrived at your destination",
            self.step_index,
        ));
    }

    fn check_off_route(&mut self, fix: &LocationFix, destination: Coordinate) {
        let off_route = self.off_route.check_location(fix.coordinate);
        self.set_off_route(off_route);
        if !off_route {
            return;
        }

        let debounce = self.config.reroute_debounce();
        if let Some(last) = self.last_reroute_at {
            let elapsed = fix.timestamp.duration_since(last).unwrap_or(Duration::ZERO);
            if elapsed < debounce {
                debug!("reroute suppressed, {:.1}s since last attempt", elapsed.as_secs_f64());
                return;
            }
        }

        info!("off route, requesting new route");
        self.last_reroute_at = Some(fix.timestamp);
        self.set_state(NavigationState::Rerouting);
        self.announce(Announcement::new(
            AnnouncementKind::Rerouting,
            "Rerouting",
            self.step_index,
        ));

        let request = RouteRequest {
            origin: fix.coordinate,
            destination,
            mode: self.mode,
            heading: fix.course(),
        };
        self.pending_reroute = Some(self.dispatcher.dispatch(self.session, request));
    }

    fn apply_reroute(&mut self, response: RerouteResponse) -> RerouteOutcome {
        let current = self.pending_reroute == Some(response.ticket)
            && response.ticket.session == self.session
            && self.state == NavigationState::Rerouting;
        if !current {
            debug!("discarding stale reroute {:?}", response.ticket);
            return RerouteOutcome::Discarded;
        }
        self.pending_reroute = None;

        match response.result {
            Ok(route) => {
                info!(
                    "rerouted: {} steps, {:.0} m",
                    route.step_count(),
                    route.distance_m()
                );
                self.step_index = 0;
                self.announcements.clear();
                self.off_route.configure(&route);
                self.set_off_route(false);
                let first = Arc::clone(&route.steps()[0]);
                self.route = Some(route);

                self.set_state(NavigationState::Navigating);
                self.events.publish(GuidanceEvent::StepChanged {
                    index: 0,
                    step: first,
                });
                self.announce(Announcement::new(
                    AnnouncementKind::Rerouted,
                    "Route recalculated",
                    0,
                ));
                RerouteOutcome::Applied
            }
            Err(err) => {
                warn!("reroute failed, continuing on current route: {err}");
                self.set_state(NavigationState::Navigating);
                self.events.publish(GuidanceEvent::RerouteFailed {
                    reason: err.to_string(),
                });
                RerouteOutcome::Failed(err)
            }
        }
    }

    fn advance_step(&mut self, location: Coordinate) {
        let Some(route) = &self.route else {
            return;
        };
        if self.step_index + 1 >= route.step_count() {
            return;
        }
        let Some(end) = route.steps()[self.step_index].end() else {
            return;
        };
        if distance(location, end) >= self.config.step_advance_radius_m {
            return;
        }

        self.step_index += 1;
        self.announcements.clear();
        let step = Arc::clone(&route.steps()[self.step_index]);
        debug!("advanced to step {}", self.step_index);
        self.events.publish(GuidanceEvent::StepChanged {
            index: self.step_index,
            step,
        });
    }

    fn distance_to_maneuver(&self, location: Coordinate) -> f64 {
        self.route
            .as_ref()
            .and_then(|r| r.step(self.step_index))
            .and_then(|s| s.end())
            .map_or(0.0, |end| distance(location, end))
    }

    /// The maneuver at the end of the current step: the next step's
    /// instruction, or arrival on the last step.
    fn upcoming_maneuver(&self) -> String {
        self.route
            .as_ref()
            .and_then(|r| r.step(self.step_index + 1))
            .map(|s| s.instruction.clone())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| Turn::Arrive.text().to_string())
    }

    fn announce_maneuver(&mut self, distance_to_maneuver: f64, speed: f64) {
        let thresholds = thresholds_for(self.mode, speed);
        let Some(threshold) = self.announcements.next_threshold(
            thresholds,
            distance_to_maneuver,
            self.config.announcement_tolerance,
        ) else {
            return;
        };

        let maneuver = self.upcoming_maneuver();
        let announcement =
            maneuver_announcement(&maneuver, threshold, distance_to_maneuver, self.step_index);
        self.announce(announcement);
    }

    fn publish_progress(&mut self, fix: &LocationFix, distance_to_maneuver: f64) {
        let Some(route) = &self.route else {
            return;
        };
        let Some(current_step) = route.step(self.step_index).cloned() else {
            return;
        };

        let distance_remaining = distance_to_maneuver + route.distance_after_step(self.step_index);
        let speed = fix.speed().max(self.config.min_eta_speed_mps);
        let time_remaining =
            Duration::try_from_secs_f64(distance_remaining / speed).unwrap_or(Duration::MAX);

        let progress = RouteProgress {
            step_index: self.step_index,
            step_count: route.step_count(),
            distance_to_maneuver_m: distance_to_maneuver,
            distance_remaining_m: distance_remaining,
            time_remaining,
            eta: fix
                .timestamp
                .checked_add(time_remaining)
                .unwrap_or(fix.timestamp),
            current_step,
            next_step: route.step(self.step_index + 1).cloned(),
        };
        self.events.publish(GuidanceEvent::Progress { progress });
    }

    fn announce(&mut self, announcement: Announcement) {
        debug!("announce {:?}: {}", announcement.kind, announcement.text);
        self.events
            .publish(GuidanceEvent::Announcement { announcement });
    }

    fn set_state(&mut self, state: NavigationState) {
        if self.state == state {
            return;
        }
        debug!("state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.events.publish(GuidanceEvent::StateChanged { state });
    }

    fn set_off_route(&mut self, off_route: bool) {
        if self.is_off_route == off_route {
            return;
        }
        self.is_off_route = off_route;
        self.events.publish(GuidanceEvent::OffRoute { off_route });
    }
}
