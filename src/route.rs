//! Planned routes as consumed by the guidance engine.
//!
//! A [`Route`] is an immutable, ordered list of maneuver-to-maneuver
//! [`Step`]s. Each step carries the instruction for the maneuver at its
//! start, its own polyline and its length. Routes are replaced wholesale
//! on reroute, never edited in place.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GuidanceError;
use crate::geo::{distance, polyline_length, Coordinate};
use crate::maneuver::{capitalize, format_distance, turn_at, Turn};

/// How the traveler moves. Selects camera framing and announcement bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    #[default]
    Automobile,
    Walking,
}

impl TransportMode {
    /// Parse the integer code used across the JNI boundary
    /// (0 = automobile, 1 = walking).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TransportMode::Automobile),
            1 => Some(TransportMode::Walking),
            _ => None,
        }
    }
}

/// One maneuver-to-maneuver segment of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Instruction for the maneuver at the start of this step.
    pub instruction: String,
    /// Ordered coordinates of this step.
    pub polyline: Vec<Coordinate>,
    /// Length of the step in meters.
    pub distance_m: f64,
}

impl Step {
    /// Create a step whose length is measured from its polyline.
    pub fn new(instruction: impl Into<String>, polyline: Vec<Coordinate>) -> Self {
        let distance_m = polyline_length(&polyline);
        Self {
            instruction: instruction.into(),
            polyline,
            distance_m,
        }
    }

    /// Create a step with a length reported by the routing backend.
    pub fn with_distance(
        instruction: impl Into<String>,
        polyline: Vec<Coordinate>,
        distance_m: f64,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            polyline,
            distance_m,
        }
    }

    /// Coordinate where this step ends (the next maneuver point).
    pub fn end(&self) -> Option<Coordinate> {
        self.polyline.last().copied()
    }
}

/// An ordered, immutable sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    steps: Vec<Arc<Step>>,
    polyline: Vec<Coordinate>,
    destination: Coordinate,
}

impl Route {
    /// Build a route from its steps.
    ///
    /// Fails if there are no steps or any step has an empty polyline.
    pub fn new(steps: Vec<Step>) -> Result<Self, GuidanceError> {
        if steps.is_empty() {
            return Err(GuidanceError::EmptyRoute);
        }
        if let Some(index) = steps.iter().position(|s| s.polyline.is_empty()) {
            return Err(GuidanceError::EmptyStep { index });
        }

        let mut polyline: Vec<Coordinate> = Vec::new();
        for step in &steps {
            for &point in &step.polyline {
                // Drop the shared junction point between consecutive steps
                if polyline.last() != Some(&point) {
                    polyline.push(point);
                }
            }
        }

        let destination = *polyline.last().ok_or(GuidanceError::EmptyRoute)?;

        Ok(Self {
            steps: steps.into_iter().map(Arc::new).collect(),
            polyline,
            destination,
        })
    }

    /// Build a route from sparse waypoints, one step per leg.
    ///
    /// Step instructions describe the turn at each leg's start point; the
    /// first step starts navigation.
    pub fn from_waypoints(points: &[Coordinate]) -> Result<Self, GuidanceError> {
        if points.len() < 2 {
            return Err(GuidanceError::TooFewWaypoints {
                count: points.len(),
            });
        }

        let steps = points
            .windows(2)
            .enumerate()
            .map(|(i, leg)| {
                let turn = if i == 0 {
                    Turn::Start
                } else {
                    turn_at(points[i - 1], leg[0], leg[1])
                };
                let length = distance(leg[0], leg[1]);
                let text = format!(
                    "{}, then continue for {}",
                    capitalize(turn.text()),
                    format_distance(length)
                );
                Step::with_distance(text, leg.to_vec(), length)
            })
            .collect();

        Self::new(steps)
    }

    pub fn steps(&self) -> &[Arc<Step>] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Arc<Step>> {
        self.steps.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Concatenated polyline of all steps.
    pub fn polyline(&self) -> &[Coordinate] {
        &self.polyline
    }

    /// Last point of the last step.
    pub fn destination(&self) -> Coordinate {
        self.destination
    }

    /// Sum of all step distances in meters.
    pub fn distance_m(&self) -> f64 {
        self.steps.iter().map(|s| s.distance_m).sum()
    }

    /// Sum of the distances of steps after `index`.
    pub fn distance_after_step(&self, index: usize) -> f64 {
        self.steps
            .iter()
            .skip(index + 1)
            .map(|s| s.distance_m)
            .sum()
    }
}
