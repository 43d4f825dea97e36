//! Off-route detection.
//!
//! Matches each fix against the active route polyline and reports off
//! route only after several consecutive misses, so GPS noise near the
//! route edge does not trigger a reroute. The search is limited to a
//! window of segments around the last match to keep the per-fix cost
//! independent of route length.

use log::debug;

use crate::config::OffRouteConfig;
use crate::geo::{nearest_on_polyline, Coordinate, PolylineMatch};
use crate::route::Route;

/// Detector state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffRouteStatus {
    OnRoute,
    /// Consecutive misses seen so far, below the confirmation count.
    Confirming(u32),
    OffRoute,
}

/// Confirms off-route fixes against a snapshot of the route polyline.
#[derive(Debug, Clone)]
pub struct OffRouteDetector {
    config: OffRouteConfig,
    polyline: Vec<Coordinate>,
    consecutive: u32,
    last_segment: Option<usize>,
}

impl OffRouteDetector {
    /// Create a detector with no route; every fix reads as on route until
    /// [`configure`](Self::configure) is called.
    pub fn new(config: OffRouteConfig) -> Self {
        Self {
            config,
            polyline: Vec::new(),
            consecutive: 0,
            last_segment: None,
        }
    }

    /// Reset state and take a snapshot of the route polyline.
    pub fn configure(&mut self, route: &Route) {
        self.polyline = route.polyline().to_vec();
        self.consecutive = 0;
        self.last_segment = None;
    }

    /// Clear the counter and segment hint. Always reports on route.
    pub fn reset(&mut self) -> bool {
        self.consecutive = 0;
        self.last_segment = None;
        false
    }

    /// Drop the route snapshot as well as the detection state.
    pub fn clear(&mut self) {
        self.reset();
        self.polyline.clear();
    }

    /// Check one fix. Returns `true` once the miss count reaches the
    /// confirmation threshold, and keeps returning `true` for further
    /// misses until [`configure`](Self::configure) or [`reset`](Self::reset).
    pub fn check_location(&mut self, location: Coordinate) -> bool {
        if self.polyline.len() < 2 {
            return false;
        }

        let matched = self.nearest(location);

        if matched.distance_m > self.config.threshold_m {
            self.consecutive = self.consecutive.saturating_add(1);
            debug!(
                "off-route miss {}/{} ({:.1} m from segment {})",
                self.consecutive, self.config.confirmations, matched.distance_m, matched.segment_index
            );
            self.consecutive >= self.config.confirmations
        } else {
            self.consecutive = 0;
            self.last_segment = Some(matched.segment_index);
            false
        }
    }

    /// Where the detector stands after the last checked fix.
    pub fn status(&self) -> OffRouteStatus {
        match self.consecutive {
            0 => OffRouteStatus::OnRoute,
            n if n >= self.config.confirmations => OffRouteStatus::OffRoute,
            n => OffRouteStatus::Confirming(n),
        }
    }

    /// Segment matched by the last on-route fix.
    pub fn last_segment(&self) -> Option<usize> {
        self.last_segment
    }

    fn nearest(&self, location: Coordinate) -> PolylineMatch {
        let Some(last) = self.last_segment else {
            return nearest_on_polyline(&self.polyline, location, None);
        };

        let window = self.config.search_window;
        let range = last.saturating_sub(window)..last.saturating_add(window).saturating_add(1);
        let windowed = nearest_on_polyline(&self.polyline, location, Some(range));

        // An empty window must not lock detection
        let widen = !windowed.is_found()
            || (self.config.widen_on_miss && windowed.distance_m > self.config.threshold_m);
        if widen {
            return nearest_on_polyline(&self.polyline, location, None);
        }

        windowed
    }
}
