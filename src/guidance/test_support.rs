//! Test doubles for the route calculation service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::reroute::{RouteRequest, RouteService};
use crate::error::RouteError;
use crate::route::Route;

/// Stub `RouteService` returning a pre-configured response and recording
/// every request it receives.
#[derive(Debug)]
pub struct StubRouteService {
    response: Result<Route, RouteError>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RouteRequest>>,
}

impl StubRouteService {
    /// Create a service that answers every request with `route`.
    pub fn with_route(route: Route) -> Self {
        Self::with_response(Ok(route))
    }

    /// Create a service that fails every request with `error`.
    pub fn with_error(error: RouteError) -> Self {
        Self::with_response(Err(error))
    }

    fn with_response(response: Result<Route, RouteError>) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of route calculations requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RouteRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RouteService for StubRouteService {
    async fn calculate_route(&self, request: RouteRequest) -> Result<Route, RouteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.response.clone()
    }
}
