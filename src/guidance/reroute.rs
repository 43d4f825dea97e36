//! Route calculation service seam and reroute dispatch.
//!
//! Reroute requests run on a Tokio runtime handle so the owner thread is
//! never blocked. Results come back over a channel tagged with the ticket
//! they were issued under; the engine applies them on the owner thread and
//! discards any ticket that is no longer current.
//!
//! Every dispatched request produces exactly one response. A calculation
//! that runs past its timeout fails with [`RouteError::TimedOut`]; one whose
//! task is dropped before finishing (service panic, runtime shutdown) fails
//! with [`RouteError::Cancelled`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::RouteError;
use crate::geo::Coordinate;
use crate::route::{Route, TransportMode};

/// Input for a route calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub mode: TransportMode,
    /// Current course, so the backend can avoid an immediate U-turn.
    pub heading: Option<f64>,
}

/// External route calculation backend.
#[async_trait]
pub trait RouteService: Send + Sync {
    async fn calculate_route(&self, request: RouteRequest) -> Result<Route, RouteError>;
}

/// Identifies one reroute attempt within one navigation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerouteTicket {
    pub session: u64,
    pub attempt: u64,
}

/// A finished route calculation.
#[derive(Debug)]
pub struct RerouteResponse {
    pub ticket: RerouteTicket,
    pub result: Result<Route, RouteError>,
}

/// What the engine did with a reroute response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerouteOutcome {
    /// The new route replaced the active one.
    Applied,
    /// Calculation failed; navigation continues on the existing route.
    Failed(RouteError),
    /// Response belonged to a stopped session or a superseded attempt.
    Discarded,
}

/// Sends the response for one ticket. If dropped before
/// [`send`](Self::send), reports the request as cancelled.
struct Reply {
    tx: Option<UnboundedSender<RerouteResponse>>,
    ticket: RerouteTicket,
}

impl Reply {
    fn send(mut self, result: Result<Route, RouteError>) {
        if let Some(tx) = self.tx.take() {
            // Receiver lives as long as the engine
            let _ = tx.send(RerouteResponse {
                ticket: self.ticket,
                result,
            });
        }
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!("reroute {:?} dropped before completing", self.ticket);
            let _ = tx.send(RerouteResponse {
                ticket: self.ticket,
                result: Err(RouteError::Cancelled),
            });
        }
    }
}

/// Spawns route calculations and collects their results.
pub struct RerouteDispatcher {
    service: Arc<dyn RouteService>,
    runtime: Handle,
    timeout: Duration,
    tx: UnboundedSender<RerouteResponse>,
    rx: UnboundedReceiver<RerouteResponse>,
    next_attempt: u64,
    in_flight: usize,
}

impl fmt::Debug for RerouteDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RerouteDispatcher")
            .field("service", &"<dyn RouteService>")
            .field("timeout", &self.timeout)
            .field("next_attempt", &self.next_attempt)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl RerouteDispatcher {
    /// Create a dispatcher running requests on `runtime`, which must have
    /// the time driver enabled. Each request is abandoned after `timeout`.
    pub fn new(service: Arc<dyn RouteService>, runtime: Handle, timeout: Duration) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            service,
            runtime,
            timeout,
            tx,
            rx,
            next_attempt: 0,
            in_flight: 0,
        }
    }

    /// Start a route calculation without waiting for it.
    pub fn dispatch(&mut self, session: u64, request: RouteRequest) -> RerouteTicket {
        self.next_attempt += 1;
        let ticket = RerouteTicket {
            session,
            attempt: self.next_attempt,
        };
        self.in_flight += 1;

        let service = Arc::clone(&self.service);
        let timeout = self.timeout;
        let reply = Reply {
            tx: Some(self.tx.clone()),
            ticket,
        };
        self.runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, service.calculate_route(request)).await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!("reroute {ticket:?} timed out after {timeout:?}");
                    Err(RouteError::TimedOut)
                }
            };
            reply.send(result);
        });

        debug!("dispatched reroute {ticket:?}");
        ticket
    }

    /// Requests spawned whose responses have not been collected.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Take a finished response if one is ready.
    pub fn try_next(&mut self) -> Option<RerouteResponse> {
        let response = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(response)
    }

    /// Wait for the next finished response. Returns `None` immediately if
    /// nothing is in flight.
    pub async fn next(&mut self) -> Option<RerouteResponse> {
        if self.in_flight == 0 {
            return None;
        }
        let response = self.rx.recv().await?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(response)
    }
}
