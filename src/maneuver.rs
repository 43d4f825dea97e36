//! Maneuver classification and instruction text.
//!
//! Computes the turn direction between consecutive route legs and renders
//! the distance and instruction strings used by the announcement logic.

use serde::{Deserialize, Serialize};

use crate::geo::{bearing, shortest_arc, Coordinate};

/// Turn direction categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Start,
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
    Arrive,
}

impl Turn {
    /// Instruction text for this maneuver, lower case.
    pub fn text(self) -> &'static str {
        match self {
            Turn::Start => "start navigation",
            Turn::Straight => "continue straight",
            Turn::SlightLeft => "keep slightly left",
            Turn::Left => "turn left",
            Turn::SharpLeft => "turn sharp left",
            Turn::SlightRight => "keep slightly right",
            Turn::Right => "turn right",
            Turn::SharpRight => "turn sharp right",
            Turn::UTurn => "make a U-turn",
            Turn::Arrive => "arrive at your destination",
        }
    }
}

/// Turn direction at `via` given the approach from `from` and the exit
/// toward `to`.
pub fn turn_at(from: Coordinate, via: Coordinate, to: Coordinate) -> Turn {
    // positive = right turn, negative = left turn
    let angle = shortest_arc(bearing(from, via), bearing(via, to));
    classify_turn(angle)
}

/// Smallest absolute bearing change for each turn category, largest first,
/// as (threshold, rightward, leftward).
const TURN_BANDS: [(f64, Turn, Turn); 4] = [
    (170.0, Turn::UTurn, Turn::UTurn),
    (120.0, Turn::SharpRight, Turn::SharpLeft),
    (60.0, Turn::Right, Turn::Left),
    (20.0, Turn::SlightRight, Turn::SlightLeft),
];

/// Classify a signed bearing change (positive = clockwise) into a turn.
pub fn classify_turn(angle: f64) -> Turn {
    TURN_BANDS
        .iter()
        .find(|(threshold, ..)| angle.abs() > *threshold)
        .map_or(Turn::Straight, |&(_, right, left)| {
            if angle > 0.0 {
                right
            } else {
                left
            }
        })
}

/// Render a distance the way it is spoken: whole tens of meters below
/// 1 km, then kilometers with a decimal only when it is not zero.
pub fn format_distance(meters: f64) -> String {
    let tens = (meters.max(0.0) / 10.0).round() * 10.0;
    if tens < 1000.0 {
        return format!("{tens:.0} m");
    }

    let km = (meters / 100.0).round() / 10.0;
    if km.fract() == 0.0 {
        format!("{km:.0} km")
    } else {
        format!("{km:.1} km")
    }
}

/// Upper-case the first character of an instruction.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character so an instruction can follow a comma.
pub fn decapitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
