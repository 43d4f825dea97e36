//! Tunables for guidance and off-route detection.
//!
//! Every field has a default, so hosts can pass a partial JSON document
//! across the JNI boundary and Rust callers can use the `with_*` setters.

use std::time::Duration;

use serde::Deserialize;

use crate::error::GuidanceError;

/// Off-route detection parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OffRouteConfig {
    /// Distance from the route polyline beyond which a fix counts as off route.
    pub threshold_m: f64,
    /// Consecutive off-route fixes needed before reporting off route.
    pub confirmations: u32,
    /// Segments searched on each side of the last matched segment.
    pub search_window: usize,
    /// Repeat the search over the whole polyline when the windowed match is
    /// beyond the threshold.
    pub widen_on_miss: bool,
}

impl Default for OffRouteConfig {
    fn default() -> Self {
        Self {
            threshold_m: 50.0,
            confirmations: 3,
            search_window: 5,
            widen_on_miss: false,
        }
    }
}

/// Guidance engine parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Distance to the destination that counts as arrival.
    pub arrival_radius_m: f64,
    /// Distance to the end of the current step that advances to the next.
    pub step_advance_radius_m: f64,
    /// Minimum time between two reroute requests, in seconds.
    pub reroute_debounce_secs: f64,
    /// Time a route calculation may take before it counts as failed.
    pub reroute_timeout_secs: f64,
    /// Speed floor used for the time-remaining estimate.
    pub min_eta_speed_mps: f64,
    /// Relative window around an announcement threshold, e.g. 0.2 = ±20%.
    pub announcement_tolerance: f64,
    /// Fixes reporting a worse horizontal accuracy are ignored.
    pub max_accuracy_m: f64,
    pub off_route: OffRouteConfig,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            arrival_radius_m: 30.0,
            step_advance_radius_m: 30.0,
            reroute_debounce_secs: 10.0,
            reroute_timeout_secs: 30.0,
            min_eta_speed_mps: 10.0,
            announcement_tolerance: 0.2,
            max_accuracy_m: 100.0,
            off_route: OffRouteConfig::default(),
        }
    }
}

impl GuidanceConfig {
    /// Parse a (possibly partial) JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, GuidanceError> {
        serde_json::from_str(json).map_err(|source| GuidanceError::Config { source })
    }

    pub fn reroute_debounce(&self) -> Duration {
        seconds(self.reroute_debounce_secs)
    }

    pub fn reroute_timeout(&self) -> Duration {
        seconds(self.reroute_timeout_secs)
    }

    #[must_use]
    pub fn with_arrival_radius(mut self, meters: f64) -> Self {
        self.arrival_radius_m = meters;
        self
    }

    #[must_use]
    pub fn with_reroute_debounce(mut self, debounce: Duration) -> Self {
        self.reroute_debounce_secs = debounce.as_secs_f64();
        self
    }

    #[must_use]
    pub fn with_reroute_timeout(mut self, timeout: Duration) -> Self {
        self.reroute_timeout_secs = timeout.as_secs_f64();
        self
    }

    #[must_use]
    pub fn with_max_accuracy(mut self, meters: f64) -> Self {
        self.max_accuracy_m = meters;
        self
    }

    #[must_use]
    pub fn with_off_route(mut self, off_route: OffRouteConfig) -> Self {
        self.off_route = off_route;
        self
    }
}

/// Negative and NaN read as zero, overly large values saturate.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}
