//! Distance-triggered maneuver announcements.
//!
//! Each transport mode and speed band has a list of remaining-distance
//! thresholds. A threshold fires once per step when the distance to the
//! next maneuver comes within a relative tolerance of it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::maneuver::{capitalize, decapitalize, format_distance};
use crate::route::TransportMode;

/// Above this speed driving uses the long-range thresholds (~80 km/h).
const HIGHWAY_SPEED_MPS: f64 = 80.0 / 3.6;

/// Below this distance announcements use the short phrasing.
const IMMINENT_DISTANCE_M: f64 = 50.0;

const WALKING_THRESHOLDS: [u32; 4] = [200, 100, 50, 20];
const CITY_THRESHOLDS: [u32; 4] = [500, 300, 100, 30];
const HIGHWAY_THRESHOLDS: [u32; 4] = [1000, 500, 200, 50];

/// What an announcement is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementKind {
    Depart,
    Approaching,
    Imminent,
    Arrived,
    Rerouting,
    Rerouted,
}

/// Text handed to the voice/instruction consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub kind: AnnouncementKind,
    pub text: String,
    /// Step the announcement was made on.
    pub step_index: usize,
}

impl Announcement {
    pub fn new(kind: AnnouncementKind, text: impl Into<String>, step_index: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            step_index,
        }
    }
}

/// Thresholds already announced for the current step.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementState {
    announced: BTreeSet<u32>,
}

impl AnnouncementState {
    pub fn clear(&mut self) {
        self.announced.clear();
    }

    pub fn is_announced(&self, threshold: u32) -> bool {
        self.announced.contains(&threshold)
    }

    /// Mark and return the first unannounced threshold within
    /// `tolerance` (relative) of `distance_m`.
    pub fn next_threshold(
        &mut self,
        thresholds: &[u32],
        distance_m: f64,
        tolerance: f64,
    ) -> Option<u32> {
        let hit = thresholds.iter().copied().find(|&t| {
            let value = f64::from(t);
            !self.announced.contains(&t) && (distance_m - value).abs() <= value * tolerance
        })?;
        self.announced.insert(hit);
        Some(hit)
    }
}

/// Threshold list for a transport mode and current speed.
pub fn thresholds_for(mode: TransportMode, speed_mps: f64) -> &'static [u32] {
    match mode {
        TransportMode::Walking => &WALKING_THRESHOLDS,
        TransportMode::Automobile if speed_mps <= HIGHWAY_SPEED_MPS => &CITY_THRESHOLDS,
        TransportMode::Automobile => &HIGHWAY_THRESHOLDS,
    }
}

/// Phrase an upcoming maneuver announced at `threshold_m` while the
/// traveler is `distance_m` away.
pub fn maneuver_announcement(
    maneuver: &str,
    threshold_m: u32,
    distance_m: f64,
    step_index: usize,
) -> Announcement {
    if distance_m < IMMINENT_DISTANCE_M {
        Announcement::new(AnnouncementKind::Imminent, capitalize(maneuver), step_index)
    } else {
        let text = format!(
            "In {}, {}",
            format_distance(f64::from(threshold_m)),
            decapitalize(maneuver)
        );
        Announcement::new(AnnouncementKind::Approaching, text, step_index)
    }
}
