//! Resolve coordinate bounds to index windows on a single axis.
//!
//! Searches are nearest-neighbour, not range scans: a bound between two grid
//! points resolves to whichever point is closer.  Longitude is cyclic, and a
//! window whose end index precedes its start index wraps through index 0.

use std::ops::Range;

use log::debug;

use crate::error::{Result, SubsetError};
use crate::search::{nearest_cyclic_index, nearest_index};

const FULL_CIRCLE: f64 = 360.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Time,
    Level,
    Latitude,
    Longitude,
}

/// A pair of indices into one coordinate axis, both inclusive.
///
/// `start > end` only occurs on longitude and means the window wraps: it
/// covers `start..len` followed by `0..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    pub start: usize,
    pub end: usize,
}

impl IndexWindow {
    pub fn new(start: usize, end: usize) -> Self {
        IndexWindow { start, end }
    }

    /// The whole of an axis of length `len`
    pub fn full(len: usize) -> Self {
        IndexWindow::new(0, len.saturating_sub(1))
    }

    pub fn wraps(&self) -> bool {
        self.end < self.start
    }

    /// Same indices, smallest first
    pub fn sorted(&self) -> Self {
        IndexWindow::new(self.start.min(self.end), self.start.max(self.end))
    }

    /// Index ranges to read, in output order
    pub fn ranges(&self, axis_len: usize) -> Vec<Range<usize>> {
        if self.wraps() {
            vec![self.start..axis_len, 0..self.end + 1]
        } else {
            vec![self.start..self.end + 1]
        }
    }

    /// Number of points selected on an axis of length `axis_len`
    pub fn len(&self, axis_len: usize) -> usize {
        self.ranges(axis_len).iter().map(|r| r.len()).sum()
    }
}

/// How a longitude axis is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LonConvention {
    /// [0, 360)
    Unsigned,
    /// [-180, 180)
    Signed,
}

impl LonConvention {
    pub fn of(axis: &[f64]) -> Self {
        if axis.iter().any(|&x| x < 0.0) {
            LonConvention::Signed
        } else {
            LonConvention::Unsigned
        }
    }

    /// Express any longitude in this convention
    pub fn normalize(&self, lon: f64) -> f64 {
        match self {
            LonConvention::Unsigned => lon.rem_euclid(FULL_CIRCLE),
            LonConvention::Signed => (lon + 180.0).rem_euclid(FULL_CIRCLE) - 180.0,
        }
    }
}

/// Spacing of the first two points, or 0 for a single point
fn grid_step(axis: &[f64]) -> f64 {
    match axis {
        [a, b, ..] => (b - a).abs(),
        _ => 0.0,
    }
}

/// True if the axis spans the globe, allowing for one grid step at the seam
fn is_global(axis: &[f64]) -> bool {
    if axis.len() < 2 {
        return false;
    }
    let span = (axis[axis.len() - 1] - axis[0]).abs();
    span + grid_step(axis) >= FULL_CIRCLE - 1e-6
}

/// Walk eastward from the point nearest `lo` and stop at the point nearest
/// `lo + span`.  The walk only passes the last stored point when `crosses`.
fn eastward_window(axis: &[f64], lo: f64, span: f64, crosses: bool) -> Result<IndexWindow> {
    let start = if crosses {
        nearest_cyclic_index(axis, lo, FULL_CIRCLE)
    } else {
        nearest_index(axis, lo)
    }
    .ok_or_else(|| SubsetError::malformed("longitude axis has no usable values"))?;

    // offset of the start point from `lo`, in (-180, 180]
    let skew = (axis[start] - lo + 180.0).rem_euclid(FULL_CIRCLE) - 180.0;
    let order: Vec<usize> = if crosses {
        (start..axis.len()).chain(0..start).collect()
    } else {
        (start..axis.len()).collect()
    };
    let offsets: Vec<f64> = order
        .iter()
        .map(|&jj| (axis[jj] - axis[start]).rem_euclid(FULL_CIRCLE))
        .collect();
    let k = nearest(&offsets, span - skew)?;
    Ok(IndexWindow::new(start, order[k]))
}

fn nearest(axis: &[f64], value: f64) -> Result<usize> {
    nearest_index(axis, value)
        .ok_or_else(|| SubsetError::malformed("cannot search an empty coordinate axis"))
}

fn check_finite(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(SubsetError::malformed(format!(
            "{} must be finite, got {:?}",
            what, values
        )))
    }
}

fn check_ascending(what: &str, lower: f64, upper: f64) -> Result<()> {
    check_finite(what, &[lower, upper])?;
    if lower > upper {
        return Err(SubsetError::malformed(format!(
            "{} bounds must be ascending, got {} > {}",
            what, lower, upper
        )));
    }
    Ok(())
}

/// Indices of the axis values nearest `lower` and `upper`, in that order.
///
/// The pair is not sorted: on a descending axis `start > end`.
pub fn find_index_window(axis: &[f64], lower: f64, upper: f64) -> Result<IndexWindow> {
    Ok(IndexWindow::new(nearest(axis, lower)?, nearest(axis, upper)?))
}

/// Latitude window for an ascending `[lat_min, lat_max]` box, sorted so it
/// reads in storage order whether latitude is stored north-to-south or not.
pub fn resolve_latitude_window(axis: &[f64], lat_min: f64, lat_max: f64) -> Result<IndexWindow> {
    check_ascending("latitude", lat_min, lat_max)?;
    if lat_min < -90.0 || lat_max > 90.0 {
        return Err(SubsetError::malformed(format!(
            "latitude bounds [{}, {}] outside [-90, 90]",
            lat_min, lat_max
        )));
    }
    let w = find_index_window(axis, lat_min, lat_max)?.sorted();
    debug!("latitude [{}, {}] -> {:?}", lat_min, lat_max, w);
    Ok(w)
}

/// Level window for ascending `[level_min, level_max]`.
///
/// The pair stays in bound order; level differences rely on knowing which
/// index belongs to the first bound.
pub fn resolve_level_window(axis: &[f64], level_min: f64, level_max: f64) -> Result<IndexWindow> {
    check_ascending("level", level_min, level_max)?;
    let w = find_index_window(axis, level_min, level_max)?;
    debug!("level [{}, {}] -> {:?}", level_min, level_max, w);
    Ok(w)
}

/// Longitude window running eastward from `lon_min` to `lon_max`.
///
/// Bounds may be given in either sign convention; they are converted to the
/// convention the axis is stored in.  The end index only precedes the start
/// index when the request itself runs through the seam at the end of the
/// stored axis.  A request covering 360 degrees, less half a grid step,
/// returns the whole axis.
pub fn resolve_longitude_window(axis: &[f64], lon_min: f64, lon_max: f64) -> Result<IndexWindow> {
    check_ascending("longitude", lon_min, lon_max)?;
    if axis.is_empty() {
        return Err(SubsetError::malformed("cannot search an empty coordinate axis"));
    }
    if lon_max - lon_min >= FULL_CIRCLE {
        return Ok(IndexWindow::full(axis.len()));
    }

    let convention = LonConvention::of(axis);
    let (lo, hi) = (convention.normalize(lon_min), convention.normalize(lon_max));
    let w = if is_global(axis) {
        let span = lon_max - lon_min;
        if span >= FULL_CIRCLE - grid_step(axis) / 2.0 {
            return Ok(IndexWindow::full(axis.len()));
        }
        let seam = match convention {
            LonConvention::Unsigned => FULL_CIRCLE,
            LonConvention::Signed => FULL_CIRCLE / 2.0,
        };
        eastward_window(axis, lo, span, lo + span > seam)?
    } else {
        find_index_window(axis, lo, hi)?
    };
    debug!(
        "longitude [{}, {}] ({:?}: [{}, {}]) -> {:?}",
        lon_min, lon_max, convention, lo, hi, w
    );
    Ok(w)
}

/// Window covering `center ± half_width` on one axis.
///
/// Latitude saturates at the poles, longitude wraps.
pub fn resolve_center_window(
    axis: &[f64],
    center: f64,
    half_width: f64,
    kind: AxisKind,
) -> Result<IndexWindow> {
    check_finite("center window", &[center, half_width])?;
    if half_width < 0.0 {
        return Err(SubsetError::malformed(format!(
            "half width must not be negative, got {}",
            half_width
        )));
    }
    match kind {
        AxisKind::Latitude => {
            if !(-90.0..=90.0).contains(&center) {
                return Err(SubsetError::malformed(format!(
                    "center latitude {} outside [-90, 90]",
                    center
                )));
            }
            let lo = (center - half_width).max(-90.0);
            let hi = (center + half_width).min(90.0);
            resolve_latitude_window(axis, lo, hi)
        }
        AxisKind::Longitude => {
            resolve_longitude_window(axis, center - half_width, center + half_width)
        }
        AxisKind::Level | AxisKind::Time => {
            Ok(find_index_window(axis, center - half_width, center + half_width)?.sorted())
        }
    }
}

/// Coordinate values covered by `window`, in output order.
///
/// For a wrapped longitude window the values are made continuous through the
/// seam: on a [0, 360) axis the leading segment is expressed in negative
/// degrees (350 becomes -10), on a [-180, 180) axis the trailing segment is
/// carried past 180.
pub fn window_coordinates(axis: &[f64], window: IndexWindow, kind: AxisKind) -> Vec<f64> {
    if !window.wraps() {
        return axis[window.start..=window.end].to_vec();
    }
    let leading = &axis[window.start..];
    let trailing = &axis[..=window.end];
    if kind != AxisKind::Longitude {
        return leading.iter().chain(trailing).copied().collect();
    }
    match LonConvention::of(axis) {
        LonConvention::Unsigned => leading
            .iter()
            .map(|x| x - FULL_CIRCLE)
            .chain(trailing.iter().copied())
            .collect(),
        LonConvention::Signed => leading
            .iter()
            .copied()
            .chain(trailing.iter().map(|x| x + FULL_CIRCLE))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::assert_le;
    use itertools::Itertools;

    fn global_lon(step: f64) -> Vec<f64> {
        let n = (360.0 / step) as usize;
        (0..n).map(|ii| ii as f64 * step).collect()
    }

    fn era5_lat() -> Vec<f64> {
        // stored north to south
        (0..=180).map(|ii| 90.0 - ii as f64).collect()
    }

    fn strictly_ascending(v: &[f64]) -> bool {
        v.iter().tuple_windows().all(|(a, b)| a < b)
    }

    #[test]
    fn find_window_keeps_encounter_order() {
        let lat = era5_lat();
        let w = find_index_window(&lat, -10.0, 10.0).unwrap();
        assert_eq!(w, IndexWindow::new(100, 80));
        assert_eq!(w.sorted(), IndexWindow::new(80, 100));
    }

    #[test]
    fn latitude_window_reads_in_storage_order() {
        let lat = era5_lat();
        let w = resolve_latitude_window(&lat, -10.0, 10.0).unwrap();
        assert_le!(w.start, w.end);
        let coords = window_coordinates(&lat, w, AxisKind::Latitude);
        assert_eq!(coords.len(), 21);
        assert_eq!(coords[0], 10.0);
        assert_eq!(coords[20], -10.0);
    }

    #[test]
    fn descending_bounds_are_rejected() {
        let lat = era5_lat();
        assert!(matches!(
            resolve_latitude_window(&lat, 10.0, -10.0),
            Err(SubsetError::MalformedInput(_))
        ));
        assert!(resolve_latitude_window(&lat, -95.0, 0.0).is_err());
        assert!(resolve_level_window(&[1.0, 2.0], 2.0, 1.0).is_err());
        assert!(resolve_longitude_window(&global_lon(1.0), f64::NAN, 1.0).is_err());
        // wraps are written with a negative or >360 bound, never reversed
        assert!(resolve_longitude_window(&global_lon(1.0), 350.0, 10.0).is_err());
    }

    #[test]
    fn non_wrapping_longitude_is_ascending() {
        let lon = global_lon(0.25);
        for (lo, hi) in [(0.0, 10.0), (100.0, 250.5), (-170.0, -20.0), (181.0, 359.0)] {
            let w = resolve_longitude_window(&lon, lo, hi).unwrap();
            assert_le!(w.start, w.end, "window for [{}, {}]", lo, hi);
            let coords = window_coordinates(&lon, w, AxisKind::Longitude);
            assert!(strictly_ascending(&coords));
        }
    }

    #[test]
    fn wraparound_runs_through_zero() {
        let lon = global_lon(1.0);
        let w = resolve_longitude_window(&lon, -10.0, 10.0).unwrap();
        assert!(w.wraps());
        assert_eq!(w, IndexWindow::new(350, 10));
        assert_eq!(w.ranges(lon.len()), vec![350..360, 0..11]);
        assert_eq!(w.len(lon.len()), 21);

        let coords = window_coordinates(&lon, w, AxisKind::Longitude);
        let expected: Vec<f64> = (-10..=10).map(|x| x as f64).collect();
        assert_eq!(coords, expected);

        // the same box written in unsigned degrees
        let w2 = resolve_longitude_window(&lon, 350.0, 370.0).unwrap();
        assert_eq!(w, w2);
    }

    #[test]
    fn signed_axis_is_handled_at_the_boundary() {
        let lon: Vec<f64> = (0..360).map(|ii| ii as f64 - 180.0).collect();
        let w = resolve_longitude_window(&lon, 350.0, 10.0 + 360.0).unwrap();
        assert_eq!(w, IndexWindow::new(170, 190));
        assert!(!w.wraps());

        // across the dateline instead
        let w = resolve_longitude_window(&lon, 170.0, 190.0).unwrap();
        assert!(w.wraps());
        let coords = window_coordinates(&lon, w, AxisKind::Longitude);
        assert_eq!(coords.first(), Some(&170.0));
        assert_eq!(coords.last(), Some(&190.0));
        assert!(strictly_ascending(&coords));
    }

    #[test]
    fn full_circle_selects_whole_axis() {
        let lon = global_lon(0.5);
        let w = resolve_longitude_window(&lon, -180.0, 180.0).unwrap();
        assert_eq!(w, IndexWindow::full(lon.len()));
        assert_eq!(window_coordinates(&lon, w, AxisKind::Longitude), lon);
    }

    #[test]
    fn center_window_clamps_latitude() {
        let lat = era5_lat();
        let w = resolve_center_window(&lat, 85.0, 10.0, AxisKind::Latitude).unwrap();
        assert_eq!(w, IndexWindow::new(0, 15));
        assert!(resolve_center_window(&lat, 95.0, 1.0, AxisKind::Latitude).is_err());
        assert!(resolve_center_window(&lat, 0.0, -1.0, AxisKind::Latitude).is_err());
    }

    #[test]
    fn center_window_wraps_longitude() {
        let lon = global_lon(0.25);
        let w = resolve_center_window(&lon, 2.0, 5.0, AxisKind::Longitude).unwrap();
        assert!(w.wraps());
        assert_eq!(lon[w.start], 357.0);
        assert_eq!(lon[w.end], 7.0);

        let w = resolve_center_window(&lon, -178.0, 5.0, AxisKind::Longitude).unwrap();
        assert!(!w.wraps());
        assert_eq!(lon[w.start], 177.0);
        assert_eq!(lon[w.end], 187.0);
    }

    #[test]
    fn nearly_full_circle_selects_whole_axis() {
        let lon = global_lon(0.25);
        let w = resolve_longitude_window(&lon, 0.0, 359.9).unwrap();
        assert_eq!(w, IndexWindow::full(lon.len()));
        assert_eq!(w.len(lon.len()), 1440);

        let signed: Vec<f64> = lon.iter().map(|x| x - 180.0).collect();
        let w = resolve_longitude_window(&signed, -180.0, 179.9).unwrap();
        assert_eq!(w, IndexWindow::full(signed.len()));

        let w = resolve_center_window(&lon, 0.0, 179.95, AxisKind::Longitude).unwrap();
        assert_eq!(w.len(lon.len()), 1440);
        assert!(strictly_ascending(&window_coordinates(&lon, w, AxisKind::Longitude)));
    }

    #[test]
    fn bound_just_below_seam_stays_on_stored_side() {
        let lon = global_lon(0.25);
        let w = resolve_longitude_window(&lon, 5.0, 359.9).unwrap();
        assert!(!w.wraps());
        assert_eq!(w, IndexWindow::new(20, 1439));
        let coords = window_coordinates(&lon, w, AxisKind::Longitude);
        assert_eq!(coords.first(), Some(&5.0));
        assert_eq!(coords.last(), Some(&359.75));

        let w = resolve_center_window(&lon, 354.9, 5.0, AxisKind::Longitude).unwrap();
        assert!(!w.wraps());
        assert_eq!(lon[w.start], 350.0);
        assert_eq!(w.end, 1439);

        // both bounds inside the last grid cell
        let w = resolve_longitude_window(&lon, 359.9, 359.95).unwrap();
        assert_eq!(w, IndexWindow::new(1439, 1439));
    }

    #[test]
    fn bound_just_past_seam_wraps() {
        let lon = global_lon(0.25);
        let w = resolve_longitude_window(&lon, 350.0, 360.1).unwrap();
        assert!(w.wraps());
        assert_eq!(w, IndexWindow::new(1400, 0));
        let coords = window_coordinates(&lon, w, AxisKind::Longitude);
        assert_eq!(coords.first(), Some(&-10.0));
        assert_eq!(coords.last(), Some(&0.0));
        assert!(strictly_ascending(&coords));

        // starting just below the seam snaps forward to 0 without wrapping
        let w = resolve_longitude_window(&lon, 359.9, 365.0).unwrap();
        assert_eq!(w, IndexWindow::new(0, 20));

        // a wide wrap that stops short of a full circle
        let w = resolve_longitude_window(&lon, 10.0, 369.0).unwrap();
        assert!(w.wraps());
        assert_eq!(w, IndexWindow::new(40, 36));
        assert_eq!(w.len(lon.len()), 1437);
        assert!(strictly_ascending(&window_coordinates(&lon, w, AxisKind::Longitude)));
    }

    #[test]
    fn regional_axis_uses_plain_nearest() {
        let lon: Vec<f64> = (0..=40).map(|ii| 100.0 + ii as f64).collect();
        let w = resolve_longitude_window(&lon, 110.0, 120.0).unwrap();
        assert_eq!(w, IndexWindow::new(10, 20));
    }
}
