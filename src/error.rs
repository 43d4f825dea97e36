//! Error types for route construction, configuration and rerouting.

use thiserror::Error;

/// Errors raised while building guidance inputs.
#[derive(Debug, Error)]
pub enum GuidanceError {
    /// A route was built without any steps.
    #[error("route has no steps")]
    EmptyRoute,
    /// A step carries no coordinates.
    #[error("step {index} has an empty polyline")]
    EmptyStep {
        /// Index of the offending step.
        index: usize,
    },
    /// Fewer waypoints than needed to form a leg.
    #[error("need at least 2 waypoints, got {count}")]
    TooFewWaypoints {
        /// Number of waypoints supplied.
        count: usize,
    },
    /// Parsing the configuration document failed.
    #[error("invalid guidance configuration")]
    Config {
        /// Source error from `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// Parsing a GPX document failed.
    #[error("failed to parse GPX")]
    Gpx {
        /// Source error from `gpx`.
        #[source]
        source: gpx::errors::GpxError,
    },
    /// The GPX document holds neither a route nor a track.
    #[error("GPX contains no route or track points")]
    NoGpxPoints,
}

/// Recoverable failures from the route calculation service.
///
/// The guidance engine handles every variant the same way: it keeps
/// navigating on the route it already has.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Transport-level failure talking to the routing backend.
    #[error("route request failed: {message}")]
    Network {
        /// Description of the failure.
        message: String,
    },
    /// The backend answered but found no route.
    #[error("no routes found")]
    NoRoutesFound,
    /// The backend did not answer within the reroute timeout.
    #[error("route request timed out")]
    TimedOut,
    /// The request was abandoned before completion.
    #[error("route request cancelled")]
    Cancelled,
}
