use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use rstest::rstest;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use super::test_support::StubRouteService;
use super::*;
use crate::announce::AnnouncementKind;
use crate::config::GuidanceConfig;
use crate::error::RouteError;
use crate::geo::Coordinate;
use crate::location::LocationFix;
use crate::route::{Route, Step, TransportMode};

const M_PER_DEG: f64 = 111_195.08;

fn offset(north_m: f64, east_m: f64) -> Coordinate {
    Coordinate::new(north_m / M_PER_DEG, east_m / M_PER_DEG)
}

fn at(secs: f64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000) + Duration::from_secs_f64(secs)
}

fn fix(north_m: f64, east_m: f64, secs: f64) -> LocationFix {
    LocationFix::new(offset(north_m, east_m), at(secs))
        .with_speed(10.0)
        .with_accuracy(5.0)
}

/// North for 300 m, then east for 150 m.
fn corner_route() -> Route {
    Route::new(vec![
        Step::new("Head north", vec![offset(0.0, 0.0), offset(300.0, 0.0)]),
        Step::new("Turn right", vec![offset(300.0, 0.0), offset(300.0, 150.0)]),
    ])
    .unwrap()
}

/// Straight north for 2 km, split in two steps, one vertex every 100 m.
fn long_route() -> Route {
    let leg = |from: usize, to: usize| -> Vec<Coordinate> {
        (from..=to).map(|i| offset(i as f64 * 100.0, 0.0)).collect()
    };
    Route::new(vec![
        Step::new("Head north", leg(0, 10)),
        Step::new("Continue straight", leg(10, 20)),
    ])
    .unwrap()
}

fn detour_route() -> Route {
    Route::new(vec![Step::new(
        "Head east",
        vec![offset(100.0, 200.0), offset(100.0, 400.0)],
    )])
    .unwrap()
}

fn engine_with(service: Arc<StubRouteService>) -> GuidanceEngine {
    GuidanceEngine::new(GuidanceConfig::default(), service, Handle::current())
}

fn failing_service() -> Arc<StubRouteService> {
    Arc::new(StubRouteService::with_error(RouteError::Network {
        message: "connection refused".to_string(),
    }))
}

fn drain(rx: &mut UnboundedReceiver<GuidanceEvent>) -> Vec<GuidanceEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn announcements(events: &[GuidanceEvent]) -> Vec<AnnouncementKind> {
    events
        .iter()
        .filter_map(|e| match e {
            GuidanceEvent::Announcement { announcement } => Some(announcement.kind),
            _ => None,
        })
        .collect()
}

fn states(events: &[GuidanceEvent]) -> Vec<NavigationState> {
    events
        .iter()
        .filter_map(|e| match e {
            GuidanceEvent::StateChanged { state } => Some(*state),
            _ => None,
        })
        .collect()
}

struct PanickingService;

#[async_trait]
impl RouteService for PanickingService {
    async fn calculate_route(&self, _request: RouteRequest) -> Result<Route, RouteError> {
        panic!("routing backend crashed");
    }
}

struct HangingService;

#[async_trait]
impl RouteService for HangingService {
    async fn calculate_route(&self, _request: RouteRequest) -> Result<Route, RouteError> {
        std::future::pending::<Result<Route, RouteError>>().await
    }
}

/// Feed three off-route fixes starting at `secs`.
fn drive_off_route(engine: &mut GuidanceEngine, secs: f64) {
    for i in 0..3 {
        engine.update_location(fix(100.0, 200.0, secs + i as f64));
    }
}

#[tokio::test]
async fn start_publishes_state_step_and_depart() {
    let mut engine = engine_with(failing_service());
    let mut rx = engine.subscribe();
    assert_eq!(engine.state(), NavigationState::Preparing);

    engine.start_navigation(corner_route(), TransportMode::Automobile);

    let events = drain(&mut rx);
    assert_eq!(states(&events), vec![NavigationState::Navigating]);
    assert!(matches!(events[1], GuidanceEvent::StepChanged { index: 0, .. }));
    assert_eq!(announcements(&events), vec![AnnouncementKind::Depart]);
    assert_eq!(engine.step_index(), 0);
}

#[tokio::test]
async fn single_step_route_has_no_depart() {
    let mut engine = engine_with(failing_service());
    let mut rx = engine.subscribe();

    engine.start_navigation(detour_route(), TransportMode::Walking);

    assert!(announcements(&drain(&mut rx)).is_empty());
    assert_eq!(engine.transport_mode(), TransportMode::Walking);
}

#[tokio::test]
async fn fix_near_destination_arrives_and_goes_quiet() {
    let mut engine = engine_with(failing_service());
    engine.start_navigation(corner_route(), TransportMode::Automobile);
    let mut rx = engine.subscribe();

    engine.update_location(fix(300.0, 140.0, 0.0));

    assert_eq!(engine.state(), NavigationState::Arrived);
    let events = drain(&mut rx);
    assert_eq!(states(&events), vec![NavigationState::Arrived]);
    assert_eq!(announcements(&events), vec![AnnouncementKind::Arrived]);
    assert!(!events
        .iter()
        .any(|e| matches!(e, GuidanceEvent::Progress { .. })));

    engine.update_location(fix(300.0, 145.0, 1.0));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn step_advances_within_radius() {
    let mut engine = engine_with(failing_service());
    engine.start_navigation(corner_route(), TransportMode::Automobile);
    let mut rx = engine.subscribe();

    engine.update_location(fix(250.0, 0.0, 0.0));
    assert_eq!(engine.step_index(), 0);

    engine.update_location(fix(280.0, 0.0, 1.0));
    assert_eq!(engine.step_index(), 1);

    let steps: Vec<usize> = drain(&mut rx)
        .iter()
        .filter_map(|e| match e {
            GuidanceEvent::StepChanged { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(steps, vec![1]);
}

#[tokio::test]
async fn progress_uses_speed_floor() {
    let mut engine = engine_with(failing_service());
    engine.start_navigation(corner_route(), TransportMode::Automobile);
    let mut rx = engine.subscribe();

    engine.update_location(fix(100.0, 0.0, 0.0).with_speed(0.0));

    let progress = drain(&mut rx)
        .into_iter()
        .find_map(|e| match e {
            GuidanceEvent::Progress { progress } => Some(progress),
            _ => None,
        })
        .expect("progress event");

    assert_eq!(progress.step_index, 0);
    assert_eq!(progress.step_count, 2);
    assert!((progress.distance_to_maneuver_m - 200.0).abs() < 1.0);
    assert!((progress.distance_remaining_m - 350.0).abs() < 1.0);
    assert!((progress.time_remaining.as_secs_f64() - 35.0).abs() < 0.2);
    assert_eq!(progress.eta, at(0.0) + progress.time_remaining);
    assert_eq!(progress.current_step.instruction, "Head north");
    assert_eq!(
        progress.next_step.as_ref().map(|s| s.instruction.as_str()),
        Some("Turn right")
    );
}

#[rstest]
#[case::negative_accuracy(-1.0)]
#[case::too_inaccurate(500.0)]
#[tokio::test]
async fn implausible_fix_is_ignored(#[case] accuracy: f64) {
    let mut engine = engine_with(failing_service());
    engine.start_navigation(corner_route(), TransportMode::Automobile);
    let mut rx = engine.subscribe();

    engine.update_location(fix(300.0, 150.0, 0.0).with_accuracy(accuracy));

    assert_eq!(engine.state(), NavigationState::Navigating);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn out_of_order_fix_is_ignored() {
    let mut engine = engine_with(failing_service());
    engine.start_navigation(corner_route(), TransportMode::Automobile);
    engine.update_location(fix(100.0, 0.0, 10.0));
    let mut rx = engine.subscribe();

    engine.update_location(fix(300.0, 150.0, 5.0));

    assert_eq!(engine.state(), NavigationState::Navigating);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn confirmed_off_route_requests_reroute() {
    let service = failing_service();
    let mut engine = engine_with(Arc::clone(&service));
    engine.start_navigation(long_route(), TransportMode::Automobile);
    let mut rx = engine.subscribe();

    engine.update_location(fix(100.0, 200.0, 0.0));
    engine.update_location(fix(100.0, 200.0, 1.0));
    assert_eq!(engine.state(), NavigationState::Navigating);
    engine.update_location(fix(100.0, 200.0, 2.0));

    assert_eq!(engine.state(), NavigationState::Rerouting);
    assert!(engine.is_off_route());
    let events = drain(&mut rx);
    assert!(events.contains(&GuidanceEvent::OffRoute { off_route: true }));
    assert!(announcements(&events).contains(&AnnouncementKind::Rerouting));

    let outcome = engine.next_reroute().await;
    assert!(matches!(outcome, Some(RerouteOutcome::Failed(RouteError::Network { .. }))));

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].origin, offset(100.0, 200.0));
    assert_eq!(requests[0].destination, offset(2000.0, 0.0));
    assert_eq!(requests[0].mode, TransportMode::Automobile);
}

#[tokio::test]
async fn failed_reroute_keeps_existing_route() {
    let mut engine = engine_with(failing_service());
    let route = long_route();
    engine.start_navigation(route.clone(), TransportMode::Automobile);
    drive_off_route(&mut engine, 0.0);
    let mut rx = engine.subscribe();

    engine.next_reroute().await;

    assert_eq!(engine.state(), NavigationState::Navigating);
    assert_eq!(engine.route(), Some(&route));
    let events = drain(&mut rx);
    assert_eq!(states(&events), vec![NavigationState::Navigating]);
    assert!(events
        .iter()
        .any(|e| matches!(e, GuidanceEvent::RerouteFailed { .. })));
}

#[tokio::test]
async fn reroute_is_debounced() {
    let service = failing_service();
    let mut engine = engine_with(Arc::clone(&service));
    engine.start_navigation(long_route(), TransportMode::Automobile);

    drive_off_route(&mut engine, 0.0);
    engine.next_reroute().await;
    assert_eq!(service.calls(), 1);

    // Still off route 1 s and 8 s after the first attempt
    engine.update_location(fix(100.0, 200.0, 3.0));
    engine.update_location(fix(100.0, 200.0, 10.0));
    assert_eq!(engine.state(), NavigationState::Navigating);
    assert!(engine.next_reroute().await.is_none());
    assert_eq!(service.calls(), 1);

    // Debounce window elapsed
    engine.update_location(fix(100.0, 200.0, 12.5));
    assert_eq!(engine.state(), NavigationState::Rerouting);
    engine.next_reroute().await;
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn successful_reroute_replaces_route() {
    let service = Arc::new(StubRouteService::with_route(detour_route()));
    let mut engine = engine_with(service);
    engine.start_navigation(long_route(), TransportMode::Automobile);
    drive_off_route(&mut engine, 0.0);
    let mut rx = engine.subscribe();

    assert_eq!(engine.next_reroute().await, Some(RerouteOutcome::Applied));

    assert_eq!(engine.state(), NavigationState::Navigating);
    assert_eq!(engine.route(), Some(&detour_route()));
    assert_eq!(engine.step_index(), 0);
    assert!(!engine.is_off_route());
    let events = drain(&mut rx);
    assert!(events.contains(&GuidanceEvent::OffRoute { off_route: false }));
    assert_eq!(announcements(&events), vec![AnnouncementKind::Rerouted]);

    // On the new route the same position is no longer off route
    engine.update_location(fix(100.0, 250.0, 3.0));
    assert_eq!(engine.state(), NavigationState::Navigating);
    assert!(!engine.is_off_route());
}

#[tokio::test]
async fn reroute_after_stop_is_discarded() {
    let service = Arc::new(StubRouteService::with_route(detour_route()));
    let mut engine = engine_with(service);
    engine.start_navigation(long_route(), TransportMode::Automobile);
    drive_off_route(&mut engine, 0.0);

    engine.stop_navigation();
    assert_eq!(engine.state(), NavigationState::Stopped);
    assert!(engine.route().is_none());

    assert_eq!(engine.next_reroute().await, Some(RerouteOutcome::Discarded));
    assert_eq!(engine.state(), NavigationState::Stopped);
    assert!(engine.route().is_none());
}

#[tokio::test]
async fn reroute_from_previous_session_is_discarded() {
    let service = Arc::new(StubRouteService::with_route(detour_route()));
    let mut engine = engine_with(service);
    engine.start_navigation(long_route(), TransportMode::Automobile);
    drive_off_route(&mut engine, 0.0);

    let fresh = corner_route();
    engine.start_navigation(fresh.clone(), TransportMode::Automobile);

    assert_eq!(engine.next_reroute().await, Some(RerouteOutcome::Discarded));
    assert_eq!(engine.route(), Some(&fresh));
    assert_eq!(engine.state(), NavigationState::Navigating);
}

#[tokio::test]
async fn restart_stops_previous_session() {
    let mut engine = engine_with(failing_service());
    engine.start_navigation(long_route(), TransportMode::Automobile);
    let mut rx = engine.subscribe();

    engine.start_navigation(corner_route(), TransportMode::Walking);

    assert_eq!(
        states(&drain(&mut rx)),
        vec![NavigationState::Stopped, NavigationState::Navigating]
    );
    assert_eq!(engine.route(), Some(&corner_route()));
}

#[tokio::test]
async fn stop_is_idempotent_and_ignores_fixes() {
    let mut engine = engine_with(failing_service());
    engine.start_navigation(corner_route(), TransportMode::Automobile);
    engine.stop_navigation();
    let mut rx = engine.subscribe();

    engine.stop_navigation();
    engine.update_location(fix(100.0, 0.0, 0.0));

    assert!(drain(&mut rx).is_empty());
    assert_eq!(engine.state(), NavigationState::Stopped);
}

#[tokio::test]
async fn fixes_while_rerouting_still_report_progress() {
    let mut engine = engine_with(failing_service());
    engine.start_navigation(long_route(), TransportMode::Automobile);
    drive_off_route(&mut engine, 0.0);
    let mut rx = engine.subscribe();

    engine.update_location(fix(100.0, 200.0, 3.0));

    assert_eq!(engine.state(), NavigationState::Rerouting);
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, GuidanceEvent::Progress { .. })));
    assert!(announcements(&events).is_empty());
}

#[tokio::test]
async fn crashed_reroute_returns_to_navigating() {
    let mut engine = GuidanceEngine::new(
        GuidanceConfig::default(),
        Arc::new(PanickingService),
        Handle::current(),
    );
    engine.start_navigation(long_route(), TransportMode::Automobile);
    drive_off_route(&mut engine, 0.0);
    assert_eq!(engine.state(), NavigationState::Rerouting);

    assert_eq!(
        engine.next_reroute().await,
        Some(RerouteOutcome::Failed(RouteError::Cancelled))
    );
    assert_eq!(engine.state(), NavigationState::Navigating);

    // Still off route once the debounce has passed: a new attempt is made
    engine.update_location(fix(100.0, 200.0, 15.0));
    assert_eq!(engine.state(), NavigationState::Rerouting);
    assert_eq!(
        engine.next_reroute().await,
        Some(RerouteOutcome::Failed(RouteError::Cancelled))
    );
}

#[tokio::test(start_paused = true)]
async fn unanswered_reroute_times_out() {
    let config = GuidanceConfig::default().with_reroute_timeout(Duration::from_secs(5));
    let mut engine = GuidanceEngine::new(config, Arc::new(HangingService), Handle::current());
    engine.start_navigation(long_route(), TransportMode::Automobile);
    drive_off_route(&mut engine, 0.0);
    let mut rx = engine.subscribe();

    assert_eq!(
        engine.next_reroute().await,
        Some(RerouteOutcome::Failed(RouteError::TimedOut))
    );
    assert_eq!(engine.state(), NavigationState::Navigating);
    assert_eq!(engine.route(), Some(&long_route()));
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        GuidanceEvent::RerouteFailed { reason } if reason == "route request timed out"
    )));
}

#[tokio::test]
async fn pending_reroute_is_picked_up_by_polling() {
    let service = Arc::new(StubRouteService::with_route(detour_route()));
    let mut engine = engine_with(service);
    engine.start_navigation(long_route(), TransportMode::Automobile);
    drive_off_route(&mut engine, 0.0);

    let mut outcome = None;
    while outcome.is_none() {
        tokio::task::yield_now().await;
        outcome = engine.poll_reroute();
    }

    assert_eq!(outcome, Some(RerouteOutcome::Applied));
    assert_eq!(engine.route(), Some(&detour_route()));
}
