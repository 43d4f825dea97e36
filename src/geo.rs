//! Geometry primitives for guidance.
//!
//! Platform-agnostic distance, segment and polyline computations. All
//! coordinates use WGS84 (lat/lon in degrees); short-range projections use
//! a planar approximation scaled by the latitude cosine.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Earth radius in meters (WGS84 mean).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Squared segment length (in scaled degrees) below which a segment is
/// treated as a single point.
const DEGENERATE_SEGMENT_SQ: f64 = 1e-10;

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Nearest segment of a polyline to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineMatch {
    /// Distance from the query point to the segment, in meters.
    pub distance_m: f64,
    /// Index of the segment start point (0-based).
    pub segment_index: usize,
}

impl PolylineMatch {
    /// Returned when no segment was examined.
    pub const NONE: PolylineMatch = PolylineMatch {
        distance_m: f64::MAX,
        segment_index: 0,
    };

    pub fn is_found(&self) -> bool {
        self.distance_m < f64::MAX
    }
}

/// Haversine distance between two coordinates in meters.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.min(1.0).sqrt().asin()
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[Coordinate]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Shortest distance from `point` to the segment `start`-`end`, in meters.
///
/// The projection parameter is computed in a planar approximation scaled
/// by the latitude cosine and clamped to the segment, so points beyond
/// either end measure to that endpoint.
pub fn distance_to_segment(point: Coordinate, start: Coordinate, end: Coordinate) -> f64 {
    let cos_lat = point.lat.to_radians().cos();

    let dx = (end.lon - start.lon) * cos_lat;
    let dy = end.lat - start.lat;
    let px = (point.lon - start.lon) * cos_lat;
    let py = point.lat - start.lat;

    let seg_len_sq = dx * dx + dy * dy;
    if seg_len_sq < DEGENERATE_SEGMENT_SQ {
        return distance(point, start);
    }

    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);
    let nearest = Coordinate {
        lat: start.lat + t * (end.lat - start.lat),
        lon: start.lon + t * (end.lon - start.lon),
    };

    distance(point, nearest)
}

/// Find the nearest segment of `polyline` to `point`.
///
/// `search_range` restricts the scan to segment indices in that range
/// (clipped to the polyline). A restricted scan reports the best segment
/// inside the window even when a closer one exists outside it.
///
/// Returns [`PolylineMatch::NONE`] if the polyline has fewer than 2 points
/// or the range selects no segment.
pub fn nearest_on_polyline(
    polyline: &[Coordinate],
    point: Coordinate,
    search_range: Option<Range<usize>>,
) -> PolylineMatch {
    if polyline.len() < 2 {
        return PolylineMatch::NONE;
    }

    let segment_count = polyline.len() - 1;
    let range = search_range.unwrap_or(0..segment_count);
    let end = range.end.min(segment_count);

    let mut best = PolylineMatch::NONE;
    for i in range.start..end {
        let dist = distance_to_segment(point, polyline[i], polyline[i + 1]);
        if dist < best.distance_m {
            best = PolylineMatch {
                distance_m: dist,
                segment_index: i,
            };
        }
    }

    best
}

/// Initial bearing from `a` to `b` in degrees [0, 360).
pub fn bearing(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_heading(y.atan2(x).to_degrees())
}

/// Wrap an angle in degrees into [0, 360).
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, in (-180, 180].
pub fn shortest_arc(from: f64, to: f64) -> f64 {
    (to - from + 540.0).rem_euclid(360.0) - 180.0
}
