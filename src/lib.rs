pub mod android_jni;
pub mod announce;
pub mod camera;
pub mod config;
pub mod error;
pub mod geo;
pub mod gpx;
pub mod guidance;
pub mod interpolate;
pub mod location;
pub mod maneuver;
pub mod off_route;
pub mod route;
pub mod session;
pub mod simplify;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
