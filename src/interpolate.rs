//! Motion interpolation between location fixes.
//!
//! Fixes arrive about once a second while the map renders at 30-60 Hz.
//! Each interpolator keeps the previous and the latest target sample and
//! blends between them over one fix interval, so the camera glides instead
//! of jumping.

use std::time::{Duration, Instant};

use crate::geo::{normalize_heading, shortest_arc, Coordinate};

/// Expected time between two fixes.
pub const FIX_INTERVAL: Duration = Duration::from_secs(1);

/// Values that can be blended between two samples.
pub trait Blend: Copy {
    /// Value at fraction `t` (0..=1) of the way from `self` to `target`.
    fn blend(self, target: Self, t: f64) -> Self;
}

impl Blend for f64 {
    fn blend(self, target: Self, t: f64) -> Self {
        self + (target - self) * t
    }
}

impl Blend for Coordinate {
    fn blend(self, target: Self, t: f64) -> Self {
        Coordinate {
            lat: self.lat.blend(target.lat, t),
            lon: self.lon.blend(target.lon, t),
        }
    }
}

/// Compass heading in degrees, blended along the shortest arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heading(pub f64);

impl Blend for Heading {
    fn blend(self, target: Self, t: f64) -> Self {
        Heading(normalize_heading(self.0 + shortest_arc(self.0, target.0) * t))
    }
}

impl From<f64> for Heading {
    fn from(degrees: f64) -> Self {
        Heading(degrees)
    }
}

/// Blends from the previous target to the latest over a fixed duration.
#[derive(Debug, Clone)]
pub struct Interpolator<T> {
    previous: Option<T>,
    target: Option<T>,
    updated_at: Option<Instant>,
    duration: Duration,
}

pub type LocationInterpolator = Interpolator<Coordinate>;
pub type HeadingInterpolator = Interpolator<Heading>;
pub type SpeedInterpolator = Interpolator<f64>;

impl<T: Blend> Default for Interpolator<T> {
    fn default() -> Self {
        Self::new(FIX_INTERVAL)
    }
}

impl<T: Blend> Interpolator<T> {
    pub fn new(duration: Duration) -> Self {
        Self {
            previous: None,
            target: None,
            updated_at: None,
            duration,
        }
    }

    /// Start blending toward `target`. The old target becomes the starting
    /// point.
    pub fn update_target(&mut self, target: T, now: Instant) {
        self.previous = self.target;
        self.target = Some(target);
        self.updated_at = Some(now);
    }

    /// Value at `now`. Before a second target arrives this is the target
    /// itself; `None` until any target is set.
    pub fn interpolate(&self, now: Instant) -> Option<T> {
        let target = self.target?;
        let (Some(previous), Some(updated_at)) = (self.previous, self.updated_at) else {
            return Some(target);
        };
        Some(previous.blend(target, self.progress(updated_at, now)))
    }

    pub fn target(&self) -> Option<T> {
        self.target
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.target = None;
        self.updated_at = None;
    }

    fn progress(&self, updated_at: Instant, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(updated_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}
