//! Follow-camera framing for navigation.
//!
//! The camera model picks an altitude and pitch from the transport mode and
//! current speed: the faster the traveler moves, the further ahead the map
//! needs to show. [`CameraTracker`] feeds each fix into the interpolators and
//! produces one [`FrameUpdate`] per render tick.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::geo::{normalize_heading, shortest_arc, Coordinate};
use crate::interpolate::{
    Blend, Heading, HeadingInterpolator, Interpolator, LocationInterpolator, SpeedInterpolator,
};
use crate::location::LocationFix;
use crate::route::TransportMode;

/// Altitude and pitch for a given motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraTarget {
    pub altitude_m: f64,
    pub pitch_deg: f64,
}

/// Full camera pose handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraPose {
    pub center: Coordinate,
    pub heading_deg: f64,
    pub altitude_m: f64,
    pub pitch_deg: f64,
}

impl Blend for CameraPose {
    fn blend(self, target: Self, t: f64) -> Self {
        CameraPose {
            center: self.center.blend(target.center, t),
            heading_deg: normalize_heading(
                self.heading_deg + shortest_arc(self.heading_deg, target.heading_deg) * t,
            ),
            altitude_m: self.altitude_m.blend(target.altitude_m, t),
            pitch_deg: self.pitch_deg.blend(target.pitch_deg, t),
        }
    }
}

pub type CameraInterpolator = Interpolator<CameraPose>;

/// Linear ramp from `(x0, y0)` to `(x1, y1)`, `x` assumed inside.
fn ramp(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}

/// Camera altitude and pitch for `mode` at `speed_mps`.
pub fn camera_target(mode: TransportMode, speed_mps: f64) -> CameraTarget {
    let speed = if speed_mps.is_finite() { speed_mps.max(0.0) } else { 0.0 };

    match mode {
        TransportMode::Automobile => {
            let altitude_m = if speed < 5.0 {
                500.0
            } else if speed < 22.0 {
                ramp(speed, 5.0, 22.0, 500.0, 1000.0)
            } else if speed < 33.0 {
                ramp(speed, 22.0, 33.0, 1000.0, 2000.0)
            } else {
                2000.0
            };
            CameraTarget {
                altitude_m,
                pitch_deg: 45.0,
            }
        }
        TransportMode::Walking => {
            let altitude_m = if speed < 0.5 {
                200.0
            } else if speed <= 2.0 {
                ramp(speed, 0.5, 2.0, 200.0, 300.0)
            } else {
                400.0
            };
            CameraTarget {
                altitude_m,
                pitch_deg: 30.0,
            }
        }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameUpdate {
    pub location: Coordinate,
    pub heading_deg: f64,
    pub speed_mps: f64,
    pub pose: CameraPose,
    /// Whether the renderer should move the camera. False while the user
    /// has taken manual control of the map.
    pub apply: bool,
}

/// Smooths fixes into per-frame camera poses.
#[derive(Debug, Clone)]
pub struct CameraTracker {
    mode: TransportMode,
    location: LocationInterpolator,
    heading: HeadingInterpolator,
    speed: SpeedInterpolator,
    camera: CameraInterpolator,
    auto_tracking: bool,
}

impl CameraTracker {
    /// Tracker with no fix yet and auto-tracking on.
    pub fn new(mode: TransportMode) -> Self {
        Self {
            mode,
            location: LocationInterpolator::default(),
            heading: HeadingInterpolator::default(),
            speed: SpeedInterpolator::default(),
            camera: CameraInterpolator::default(),
            auto_tracking: true,
        }
    }

    pub fn set_transport_mode(&mut self, mode: TransportMode) {
        self.mode = mode;
    }

    pub fn set_auto_tracking(&mut self, enabled: bool) {
        self.auto_tracking = enabled;
    }

    pub fn auto_tracking(&self) -> bool {
        self.auto_tracking
    }

    /// Retarget every interpolator at a new fix. A fix without course
    /// keeps the last heading.
    pub fn on_fix(&mut self, fix: &LocationFix, now: Instant) {
        let speed = fix.speed();
        self.location.update_target(fix.coordinate, now);
        self.speed.update_target(speed, now);

        let heading = match fix.course() {
            Some(course) => {
                let heading = Heading(normalize_heading(course));
                self.heading.update_target(heading, now);
                heading
            }
            None => self.heading.target().unwrap_or(Heading(0.0)),
        };

        let target = camera_target(self.mode, speed);
        self.camera.update_target(
            CameraPose {
                center: fix.coordinate,
                heading_deg: heading.0,
                altitude_m: target.altitude_m,
                pitch_deg: target.pitch_deg,
            },
            now,
        );
    }

    /// Interpolated state at `now`; `None` before the first fix.
    pub fn frame(&self, now: Instant) -> Option<FrameUpdate> {
        let location = self.location.interpolate(now)?;
        let pose = self.camera.interpolate(now)?;
        let Heading(heading_deg) = self
            .heading
            .interpolate(now)
            .unwrap_or(Heading(pose.heading_deg));

        Some(FrameUpdate {
            location,
            heading_deg,
            speed_mps: self.speed.interpolate(now).unwrap_or(0.0),
            pose,
            apply: self.auto_tracking,
        })
    }

    pub fn reset(&mut self) {
        self.location.reset();
        self.heading.reset();
        self.speed.reset();
        self.camera.reset();
    }
}

/// Fixed-rate frame clock for the interpolation loop.
#[derive(Debug)]
pub struct FrameTicker {
    interval: Interval,
}

impl FrameTicker {
    pub const MIN_HZ: u32 = 30;
    pub const MAX_HZ: u32 = 60;

    /// Tick at `hz`, clamped to 30-60 Hz. Late ticks are skipped rather
    /// than replayed in a burst. Must be called inside a Tokio runtime.
    pub fn new(hz: u32) -> Self {
        let mut interval = interval(Self::period(hz));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// Frame period for `hz` after clamping.
    pub fn period(hz: u32) -> Duration {
        Duration::from_secs(1) / hz.clamp(Self::MIN_HZ, Self::MAX_HZ)
    }

    /// Wait for the next frame and return its time.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await.into_std()
    }
}
