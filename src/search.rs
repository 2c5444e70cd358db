//! Index searches over coordinate sequences.
//!
//! Coordinates are assumed monotonic (or nearly so) but none of the
//! searches here rely on it except [`bracket`].

use std::cmp::Ordering;

fn distance_order(a: f64, b: f64) -> Ordering {
    // NaN coordinates sort last so they are never picked ahead of a real value
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn k_closest_by<F>(values: &[f64], k: usize, dist: F) -> Vec<usize>
where
    F: Fn(f64) -> f64,
{
    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .map(|(ii, &x)| (ii, dist(x)))
        .collect();
    // stable, so equal distances keep their sequence order
    order.sort_by(|a, b| distance_order(a.1, b.1));
    order.into_iter().take(k).map(|(ii, _)| ii).collect()
}

/// Indices of the `k` values nearest to `target`, nearest first.
///
/// Ties are broken toward the first occurrence in sequence order.  Fewer than
/// `k` indices are returned when `values` is shorter than `k`.
pub fn k_closest(values: &[f64], target: f64, k: usize) -> Vec<usize> {
    k_closest_by(values, k, |x| (x - target).abs())
}

/// Index of the value nearest to `target`
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    k_closest(values, target, 1).first().copied()
}

/// Distance between two angles on a circle of circumference `period`
pub fn cyclic_distance(a: f64, b: f64, period: f64) -> f64 {
    let d = (a - b).rem_euclid(period);
    d.min(period - d)
}

/// Like [`nearest_index`], but distances are measured around a circle so a
/// target just below the seam can resolve to the first element.
pub fn nearest_cyclic_index(values: &[f64], target: f64, period: f64) -> Option<usize> {
    k_closest_by(values, 1, |x| cyclic_distance(x, target, period))
        .first()
        .copied()
}

/// Index of a value exactly equal to `target`, falling back to the nearest.
///
/// Exact matches take precedence so that a time stored in the file is never
/// replaced by a neighbour at equal distance.
pub fn exact_or_nearest(values: &[f64], target: f64) -> Option<usize> {
    values
        .iter()
        .position(|&x| x == target)
        .or_else(|| nearest_index(values, target))
}

/// Pair of adjacent indices `(i, i + 1)` with `values[i] < target < values[i + 1]`
/// on an ascending sequence.  `None` if the target is stored exactly or lies
/// outside the sequence.
pub fn bracket(values: &[f64], target: f64) -> Option<(usize, usize)> {
    let upper = values.partition_point(|&x| x <= target);
    if upper == 0 || upper == values.len() {
        return None;
    }
    if values[upper - 1] == target {
        return None;
    }
    Some((upper - 1, upper))
}
