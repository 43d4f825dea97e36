//! Events published by the guidance engine.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::announce::Announcement;
use crate::route::Step;

/// Session state. One authoritative value per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    #[default]
    Preparing,
    Navigating,
    Rerouting,
    Arrived,
    Stopped,
}

impl NavigationState {
    /// Navigating or rerouting; fixes are processed.
    pub fn is_active(self) -> bool {
        matches!(self, NavigationState::Navigating | NavigationState::Rerouting)
    }
}

/// Snapshot of progress along the active route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteProgress {
    pub step_index: usize,
    pub step_count: usize,
    /// Distance to the maneuver at the end of the current step.
    pub distance_to_maneuver_m: f64,
    pub distance_remaining_m: f64,
    pub time_remaining: Duration,
    pub eta: SystemTime,
    pub current_step: Arc<Step>,
    pub next_step: Option<Arc<Step>>,
}

/// One accepted state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuidanceEvent {
    StateChanged { state: NavigationState },
    Progress { progress: RouteProgress },
    StepChanged { index: usize, step: Arc<Step> },
    Announcement { announcement: Announcement },
    OffRoute { off_route: bool },
    RerouteFailed { reason: String },
}

/// Fan-out of events to every live subscriber, in publish order.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<UnboundedSender<GuidanceEvent>>,
}

impl EventBus {
    /// Add a subscriber that sees every event published after this call.
    pub fn subscribe(&mut self) -> UnboundedReceiver<GuidanceEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to all subscribers, dropping those whose receiver is gone.
    pub fn publish(&mut self, event: GuidanceEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_in_order() {
        let mut bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(GuidanceEvent::OffRoute { off_route: true });
        bus.publish(GuidanceEvent::OffRoute { off_route: false });

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.try_recv().unwrap(), GuidanceEvent::OffRoute { off_route: true });
            assert_eq!(rx.try_recv().unwrap(), GuidanceEvent::OffRoute { off_route: false });
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::default();
        let keep = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(GuidanceEvent::StateChanged {
            state: NavigationState::Navigating,
        });
        assert_eq!(bus.subscriber_count(), 1);
        drop(keep);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(GuidanceEvent::StateChanged {
            state: NavigationState::Rerouting,
        })
        .unwrap();

        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["state"], "rerouting");
    }
}
