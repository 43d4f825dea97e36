//! GPX import for guidance.
//!
//! Wraps the `gpx` crate and turns a planned route (or, failing that, a
//! recorded track) into a guidance [`Route`] so a file can be navigated
//! without a routing backend.

use std::io::Read;

use crate::error::GuidanceError;
use crate::geo::Coordinate;
use crate::route::Route;
use crate::simplify::simplify;

/// Read the navigable points from a GPX document.
///
/// The first `<rte>` wins. Without one, the first `<trk>` is flattened
/// across its segments and simplified with `tolerance_m`.
pub fn read_waypoints<R: Read>(
    reader: R,
    tolerance_m: f64,
) -> Result<Vec<Coordinate>, GuidanceError> {
    let gpx = gpx::read(reader).map_err(|source| GuidanceError::Gpx { source })?;

    if let Some(route) = gpx.routes.iter().find(|r| r.points.len() >= 2) {
        return Ok(route.points.iter().map(to_coordinate).collect());
    }

    let track = gpx
        .tracks
        .iter()
        .map(|t| {
            t.segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .map(to_coordinate)
                .collect::<Vec<_>>()
        })
        .find(|points| points.len() >= 2)
        .ok_or(GuidanceError::NoGpxPoints)?;

    Ok(simplify(&track, tolerance_m))
}

/// Parse GPX bytes into a guidance route.
pub fn route_from_gpx(data: &[u8], tolerance_m: f64) -> Result<Route, GuidanceError> {
    let points = read_waypoints(data, tolerance_m)?;
    Route::from_waypoints(&points)
}

/// Parse GPX bytes and return the route as a JSON string.
pub fn route_from_gpx_json(data: &[u8], tolerance_m: f64) -> Result<String, String> {
    let route = route_from_gpx(data, tolerance_m).map_err(|e| format!("GPX import error: {e}"))?;
    serde_json::to_string(&route).map_err(|e| format!("JSON serialize error: {e}"))
}

fn to_coordinate(wp: &gpx::Waypoint) -> Coordinate {
    let p = wp.point();
    Coordinate {
        lat: p.y(),
        lon: p.x(),
    }
}
