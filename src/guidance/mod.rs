//! Turn-by-turn guidance: state machine, events and reroute plumbing.

mod engine;
mod events;
mod reroute;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod tests;

pub use engine::GuidanceEngine;
pub use events::{EventBus, GuidanceEvent, NavigationState, RouteProgress};
pub use reroute::{
    RerouteDispatcher, RerouteOutcome, RerouteResponse, RerouteTicket, RouteRequest, RouteService,
};
