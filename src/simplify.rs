//! Track thinning for GPX import.
//!
//! A recorded track has a vertex every few meters; turned into steps
//! directly it would produce one maneuver per GPS sample. Thinning keeps
//! only the vertices where the path actually bends, and each survivor
//! becomes a candidate turn in [`Route::from_waypoints`].
//!
//! [`Route::from_waypoints`]: crate::route::Route::from_waypoints

use crate::geo::{distance_to_segment, Coordinate};

/// Drop every vertex lying within `tolerance_m` of the chord between its
/// surviving neighbours (Ramer-Douglas-Peucker). Endpoints always survive.
///
/// Deviation is measured with [`distance_to_segment`], the same metric the
/// off-route detector uses, so a tolerance below the off-route threshold
/// keeps the thinned route inside the corridor of the recording.
pub fn simplify(points: &[Coordinate], tolerance_m: f64) -> Vec<Coordinate> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut spans = vec![(0, last)];
    while let Some((from, to)) = spans.pop() {
        let farthest = (from + 1..to)
            .map(|i| (i, distance_to_segment(points[i], points[from], points[to])))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((i, deviation)) = farthest {
            if deviation > tolerance_m {
                keep[i] = true;
                spans.push((from, i));
                spans.push((i, to));
            }
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}
