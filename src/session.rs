//! Top-level navigation session.
//!
//! Owns the guidance engine and the camera tracker so a host constructs
//! exactly one of each and feeds both cadences from its owner thread:
//! location fixes through [`on_location`](NavigationSession::on_location)
//! and render ticks through [`frame`](NavigationSession::frame).

use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::camera::{CameraTracker, FrameUpdate};
use crate::config::GuidanceConfig;
use crate::guidance::{GuidanceEngine, GuidanceEvent, NavigationState, RerouteOutcome, RouteService};
use crate::location::LocationFix;
use crate::route::{Route, TransportMode};

/// One guidance engine and its camera tracker, driven together.
pub struct NavigationSession {
    engine: GuidanceEngine,
    camera: CameraTracker,
}

impl NavigationSession {
    /// Create an idle session. Reroutes go to `service` on `runtime`.
    pub fn new(config: GuidanceConfig, service: Arc<dyn RouteService>, runtime: Handle) -> Self {
        Self {
            engine: GuidanceEngine::new(config, service, runtime),
            camera: CameraTracker::new(TransportMode::default()),
        }
    }

    /// Start guidance. Any active navigation is stopped first, so at most
    /// one is ever running.
    pub fn start(&mut self, route: Route, mode: TransportMode) {
        self.camera.reset();
        self.camera.set_transport_mode(mode);
        self.engine.start_navigation(route, mode);
    }

    /// Stop guidance and drop any smoothed camera state.
    pub fn stop(&mut self) {
        self.engine.stop_navigation();
        self.camera.reset();
    }

    /// Feed one fix to guidance and camera smoothing, then apply any
    /// reroute result that has arrived meanwhile.
    pub fn on_location(&mut self, fix: LocationFix, now: Instant) -> Option<RerouteOutcome> {
        if self.engine.state().is_active() && fix.coordinate.is_valid() {
            self.camera.on_fix(&fix, now);
        }
        self.engine.update_location(fix);
        self.engine.poll_reroute()
    }

    /// Camera state for one render tick.
    pub fn frame(&self, now: Instant) -> Option<FrameUpdate> {
        self.camera.frame(now)
    }

    pub fn set_auto_tracking(&mut self, enabled: bool) {
        self.camera.set_auto_tracking(enabled);
    }

    /// Receive every guidance event published from now on.
    pub fn subscribe(&mut self) -> UnboundedReceiver<GuidanceEvent> {
        self.engine.subscribe()
    }

    pub fn state(&self) -> NavigationState {
        self.engine.state()
    }

    pub fn engine(&self) -> &GuidanceEngine {
        &self.engine
    }
}
