//! Read hyperslabs from the files a query needs and assemble them into one
//! array.
//!
//! Every read goes through [`read_block`], which handles one file and one
//! time range: it splits wrapped longitude windows into two reads and
//! applies the level reduction before anything is concatenated.

use std::ops::Range;

use clap::ValueEnum;
use log::{debug, info};
use ndarray::{concatenate, ArrayD, ArrayViewD, Axis};

use crate::axis::{AxisKind, IndexWindow};
use crate::error::{Result, SubsetError};
use crate::grid::GridFile;
use crate::locate::{FileSpan, InstantKind, InstantSpan};

/// What to do with the level axis of a 4-D variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Reduction {
    /// Keep the level axis
    #[default]
    Raw,
    /// Average over the selected levels
    LevelMean,
    /// Value at the first level bound minus value at the second
    LevelDifference,
}

/// Index windows for the non-time axes of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    /// Required for 4-D variables, absent for 3-D ones
    pub level: Option<IndexWindow>,
    pub latitude: IndexWindow,
    pub longitude: IndexWindow,
}

fn concat(axis: Axis, parts: &[ArrayD<f64>]) -> Result<ArrayD<f64>> {
    if parts.len() == 1 {
        return Ok(parts[0].clone());
    }
    let views: Vec<ArrayViewD<f64>> = parts.iter().map(|p| p.view()).collect();
    Ok(concatenate(axis, &views)?)
}

/// Read `lead` extents plus the longitude window, in two pieces if it wraps
fn read_lon_split<F: GridFile>(
    file: &F,
    variable: &str,
    lead: &[Range<usize>],
    longitude: IndexWindow,
    nlon: usize,
) -> Result<ArrayD<f64>> {
    let parts = longitude
        .ranges(nlon)
        .into_iter()
        .map(|r| {
            let mut extents = lead.to_vec();
            extents.push(r);
            file.read(variable, &extents)
        })
        .collect::<Result<Vec<_>>>()?;
    concat(Axis(lead.len()), &parts)
}

/// Read `time` from one file with the windows applied and levels reduced.
///
/// The result is `[time, level, lat, lon]` for raw reads of 4-D variables and
/// `[time, lat, lon]` otherwise.
pub fn read_block<F: GridFile>(
    file: &F,
    variable: &str,
    time: Range<usize>,
    windows: &Windows,
    reduction: Reduction,
) -> Result<ArrayD<f64>> {
    let shape = file.shape(variable)?;
    let nlon = shape.last().copied().unwrap_or(0);
    let lat = windows.latitude.sorted();
    let lat_range = lat.start..lat.end + 1;

    match (shape.len(), windows.level) {
        (3, None) => {
            if reduction != Reduction::Raw {
                return Err(SubsetError::malformed(format!(
                    "{:?} needs a level axis, \"{}\" has none",
                    reduction, variable
                )));
            }
            read_lon_split(file, variable, &[time, lat_range], windows.longitude, nlon)
        }
        (4, Some(level)) => match reduction {
            Reduction::Raw => {
                let level = level.sorted();
                let lead = [time, level.start..level.end + 1, lat_range];
                read_lon_split(file, variable, &lead, windows.longitude, nlon)
            }
            Reduction::LevelMean => {
                let level = level.sorted();
                let lead = [time, level.start..level.end + 1, lat_range];
                let data = read_lon_split(file, variable, &lead, windows.longitude, nlon)?;
                data.mean_axis(Axis(1))
                    .ok_or_else(|| SubsetError::malformed("empty level selection"))
            }
            Reduction::LevelDifference => {
                let single = |ilev: usize| -> Result<ArrayD<f64>> {
                    let lead = [time.clone(), ilev..ilev + 1, lat_range.clone()];
                    let data = read_lon_split(file, variable, &lead, windows.longitude, nlon)?;
                    Ok(data.index_axis_move(Axis(1), 0))
                };
                let first = single(level.start)?;
                let second = single(level.end)?;
                Ok(first - second)
            }
        },
        (ndim, level) => Err(SubsetError::malformed(format!(
            "\"{}\" has {} dimensions{}; expected (time, latitude, longitude) \
             or (time, level, latitude, longitude)",
            variable,
            ndim,
            if level.is_some() { " and a level window" } else { "" }
        ))),
    }
}

/// Read every span and join them along time, returning the data and its
/// time coordinate.
///
/// Times are expressed in the units of the first span's file.
pub fn read_subset<F: GridFile>(
    spans: &[FileSpan<F>],
    variable: &str,
    windows: &Windows,
    reduction: Reduction,
) -> Result<(ArrayD<f64>, Vec<f64>)> {
    let first = match spans.first() {
        Some(s) => s,
        None => return Err(SubsetError::UnhandledCase("no files selected".into())),
    };
    let units = first.series.time_units();

    let mut blocks = Vec::with_capacity(spans.len());
    let mut times = vec![];
    for s in spans {
        info!("Working on file: {}", s.series.path().display());
        blocks.push(read_block(
            &s.series.file,
            variable,
            s.range.clone(),
            windows,
            reduction,
        )?);
        if s.series.time_units() == units {
            times.extend_from_slice(s.times());
        } else {
            times.extend(s.range.clone().map(|ii| units.offset(&s.series.datetime(ii))));
        }
    }
    let data = concat(Axis(0), &blocks)?;
    debug!("stitched {} file(s) into {:?}", spans.len(), data.shape());
    Ok((data, times))
}

/// Linear interpolation, `w = 0` gives `a` and `w = 1` gives `b`
pub fn interpolate(a: &ArrayD<f64>, b: &ArrayD<f64>, w: f64) -> ArrayD<f64> {
    a * (1.0 - w) + b * w
}

/// Read the data at a single instant, interpolating between the two stored
/// times around it when it is not stored exactly.  The time axis is kept,
/// with length one.
pub fn read_instant<F: GridFile>(
    span: &InstantSpan<F>,
    variable: &str,
    windows: &Windows,
    reduction: Reduction,
) -> Result<ArrayD<f64>> {
    let kind = span.kind()?;
    let slices = span
        .endpoints()
        .into_iter()
        .map(|(series, ii)| read_block(&series.file, variable, ii..ii + 1, windows, reduction))
        .collect::<Result<Vec<_>>>()?;

    match (kind, slices.as_slice()) {
        (InstantKind::Exact, [only]) => Ok(only.clone()),
        (InstantKind::WithinFile | InstantKind::AcrossFiles, [a, b]) => {
            let w = span.weight()?;
            debug!("interpolating at {} with weight {}", span.target, w);
            Ok(interpolate(a, b, w))
        }
        (kind, _) => Err(SubsetError::UnhandledCase(format!(
            "{:?} with {} time slice(s)",
            kind,
            slices.len()
        ))),
    }
}

/// Drop time and level axes of length one, along with their entries in `dims`
pub fn squeeze(mut data: ArrayD<f64>, dims: &mut Vec<AxisKind>) -> ArrayD<f64> {
    for ax in (0..dims.len()).rev() {
        let degenerate = matches!(dims[ax], AxisKind::Time | AxisKind::Level)
            && data.len_of(Axis(ax)) == 1;
        if degenerate {
            data = data.index_axis_move(Axis(ax), 0);
            dims.remove(ax);
        }
    }
    data
}
