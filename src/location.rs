//! Location fixes from the platform sensor source.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// One position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    /// Ground speed in m/s. Negative means unknown.
    pub speed_mps: f64,
    /// Course over ground in degrees, if the platform reported one.
    pub course_deg: Option<f64>,
    /// Horizontal accuracy radius in meters.
    pub accuracy_m: f64,
    pub timestamp: SystemTime,
}

impl LocationFix {
    /// A stationary, perfectly accurate fix. Use the `with_*` setters to
    /// fill in the rest.
    pub fn new(coordinate: Coordinate, timestamp: SystemTime) -> Self {
        Self {
            coordinate,
            speed_mps: 0.0,
            course_deg: None,
            accuracy_m: 0.0,
            timestamp,
        }
    }

    #[must_use]
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = speed_mps;
        self
    }

    #[must_use]
    pub fn with_course(mut self, course_deg: f64) -> Self {
        self.course_deg = Some(course_deg);
        self
    }

    #[must_use]
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = accuracy_m;
        self
    }

    /// Speed with unknown or invalid readings mapped to 0.
    pub fn speed(&self) -> f64 {
        if self.speed_mps.is_finite() && self.speed_mps > 0.0 {
            self.speed_mps
        } else {
            0.0
        }
    }

    /// Course if reported and finite. Platforms use negative values for
    /// "no course".
    pub fn course(&self) -> Option<f64> {
        self.course_deg.filter(|c| c.is_finite() && *c >= 0.0)
    }

    /// Coordinate is valid and accuracy is non-negative and within `max_accuracy_m`.
    pub fn is_plausible(&self, max_accuracy_m: f64) -> bool {
        self.coordinate.is_valid()
            && self.accuracy_m.is_finite()
            && self.accuracy_m >= 0.0
            && self.accuracy_m <= max_accuracy_m
    }
}
