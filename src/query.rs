//! End-to-end subsetting: locate files, resolve index windows, read and
//! stitch.
//!
//! ```no_run
//! use e5subset::appconfig::SubsetConfigBuilder;
//! use e5subset::grid::nc::NetcdfSource;
//! use e5subset::query::{Region, SubsetRequestBuilder, Subsetter, TimeSelection};
//!
//! let config = SubsetConfigBuilder::default()
//!     .data_dir("/data/era5".into())
//!     .file_id("era5_pl_t_".into())
//!     .build()?;
//! let subsetter = Subsetter::new(NetcdfSource, config);
//! let request = SubsetRequestBuilder::default()
//!     .variable("t")
//!     .time(TimeSelection::Instant("2020-01-01 09".into()))
//!     .region(Region::Centered { lon: 151.2, lat: -33.9, half_width: 2.0 })
//!     .levels((850.0, 850.0))
//!     .build()?;
//! let result = subsetter.subset(&request)?;
//! println!("{:?}", result.data.shape());
//! # Ok::<(), anyhow::Error>(())
//! ```

use chrono::NaiveDateTime;
use derive_builder::Builder;
use log::{debug, info};
use ndarray::ArrayD;

use crate::appconfig::SubsetConfig;
use crate::axis::{
    resolve_center_window, resolve_latitude_window, resolve_level_window,
    resolve_longitude_window, window_coordinates, AxisKind, IndexWindow,
};
use crate::error::{Result, SubsetError};
use crate::grid::{GridFile, GridSource};
use crate::locate::Locator;
use crate::stitch::{read_instant, read_subset, squeeze, Reduction, Windows};
use crate::time::{parse_timestamp, TimeUnits};

/// Which times to extract
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSelection {
    /// Every stored time from `start` to `end`, bounds snapped to the
    /// nearest stored time
    Range { start: String, end: String },
    /// One instant, interpolated when it falls between stored times
    Instant(String),
}

/// Horizontal extent to extract
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    /// Ascending bounds.  Longitudes may be signed, e.g. -10 to 10 crosses
    /// the Greenwich meridian.
    Box {
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
    },
    /// `half_width` degrees either side of a point, in both directions
    Centered { lon: f64, lat: f64, half_width: f64 },
}

#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into))]
pub struct SubsetRequest {
    pub variable: String,
    pub time: TimeSelection,
    pub region: Region,
    /// Ascending level bounds; all levels when absent
    #[builder(default)]
    pub levels: Option<(f64, f64)>,
    #[builder(default)]
    pub reduction: Reduction,
}

/// A subset and its coordinates.
///
/// `dims` names the axes of `data` in order.  Time and level axes of length
/// one are squeezed out of `data`, but their coordinates are still reported.
#[derive(Debug, Clone)]
pub struct SubsetResult {
    pub data: ArrayD<f64>,
    pub dims: Vec<AxisKind>,
    pub times: Vec<f64>,
    /// Units of `times`, taken from the first file read
    pub time_units: String,
    /// `None` when the level axis was reduced away or the variable has none
    pub levels: Option<Vec<f64>>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
}

impl SubsetResult {
    pub fn coordinate(&self, kind: AxisKind) -> Option<&[f64]> {
        match kind {
            AxisKind::Time => Some(&self.times),
            AxisKind::Level => self.levels.as_deref(),
            AxisKind::Latitude => Some(&self.latitudes),
            AxisKind::Longitude => Some(&self.longitudes),
        }
    }

    /// The time coordinate as calendar times
    pub fn datetimes(&self) -> Result<Vec<NaiveDateTime>> {
        let units = TimeUnits::parse(&self.time_units)?;
        self.times.iter().map(|&t| units.datetime(t)).collect()
    }
}

/// Non-time coordinates of the file the read starts in
struct Axes {
    ndim: usize,
    levels: Option<Vec<f64>>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
}

/// Runs requests against the file series described by a [`SubsetConfig`]
pub struct Subsetter<S> {
    source: S,
    config: SubsetConfig,
}

impl<S: GridSource> Subsetter<S> {
    pub fn new(source: S, config: SubsetConfig) -> Self {
        Subsetter { source, config }
    }

    pub fn config(&self) -> &SubsetConfig {
        &self.config
    }

    fn read_axes<F: GridFile>(&self, file: &F, variable: &str) -> Result<Axes> {
        let c = &self.config;
        let shape = file.shape(variable)?;
        let latitudes = file.coordinate(&c.latitude_name)?;
        let longitudes = file.coordinate(&c.longitude_name)?;
        let levels = match shape.len() {
            3 => None,
            4 => Some(file.coordinate(&c.level_name)?),
            n => {
                return Err(SubsetError::malformed(format!(
                    "\"{}\" has {} dimensions, expected 3 or 4",
                    variable, n
                )))
            }
        };
        let mut expected = vec![latitudes.len(), longitudes.len()];
        if let Some(levels) = &levels {
            expected.insert(0, levels.len());
        }
        if shape[1..] != expected[..] {
            return Err(SubsetError::malformed(format!(
                "\"{}\" in {} has shape {:?}, which does not match its coordinates {:?}",
                variable,
                file.path().display(),
                shape,
                expected
            )));
        }
        Ok(Axes {
            ndim: shape.len(),
            levels,
            latitudes,
            longitudes,
        })
    }

    fn windows(&self, request: &SubsetRequest, axes: &Axes) -> Result<Windows> {
        let (latitude, longitude) = match request.region {
            Region::Box {
                lat_min,
                lat_max,
                lon_min,
                lon_max,
            } => (
                resolve_latitude_window(&axes.latitudes, lat_min, lat_max)?,
                resolve_longitude_window(&axes.longitudes, lon_min, lon_max)?,
            ),
            Region::Centered {
                lon,
                lat,
                half_width,
            } => {
                if half_width <= 0.0 {
                    return Err(SubsetError::malformed(format!(
                        "half width must be positive, got {}",
                        half_width
                    )));
                }
                (
                    resolve_center_window(&axes.latitudes, lat, half_width, AxisKind::Latitude)?,
                    resolve_center_window(&axes.longitudes, lon, half_width, AxisKind::Longitude)?,
                )
            }
        };
        let level = match (&axes.levels, request.levels) {
            (Some(levels), Some((lo, hi))) => Some(resolve_level_window(levels, lo, hi)?),
            (Some(levels), None) => Some(IndexWindow::full(levels.len())),
            (None, Some(_)) => {
                return Err(SubsetError::malformed(format!(
                    "level bounds given but \"{}\" has no level axis",
                    request.variable
                )))
            }
            (None, None) => None,
        };
        if axes.levels.is_none() && request.reduction != Reduction::Raw {
            return Err(SubsetError::malformed(format!(
                "{:?} needs a level axis, \"{}\" has none",
                request.reduction, request.variable
            )));
        }
        let w = Windows {
            level,
            latitude,
            longitude,
        };
        debug!("index windows {:?}", w);
        Ok(w)
    }

    pub fn subset(&self, request: &SubsetRequest) -> Result<SubsetResult> {
        if request.variable.is_empty() {
            return Err(SubsetError::malformed("no variable name given"));
        }
        let c = &self.config;
        let paths = self.source.discover(&c.data_dir, &c.file_id)?;
        info!(
            "{} file(s) matching \"{}*\" in {}",
            paths.len(),
            c.file_id,
            c.data_dir.display()
        );
        let locator = Locator::new(&self.source, &paths, &c.time_name).check_order(c.check_file_order);

        let (data, times, time_units, windows, axes) = match &request.time {
            TimeSelection::Range { start, end } => {
                let (start, end) = (parse_timestamp(start)?, parse_timestamp(end)?);
                let spans = locator.locate_range(&start, &end)?;
                let first = match spans.first() {
                    Some(s) => &s.series,
                    None => return Err(SubsetError::UnhandledCase("no files selected".into())),
                };
                let axes = self.read_axes(&first.file, &request.variable)?;
                let windows = self.windows(request, &axes)?;
                let (data, times) =
                    read_subset(&spans, &request.variable, &windows, request.reduction)?;
                (data, times, first.units.clone(), windows, axes)
            }
            TimeSelection::Instant(t) => {
                let span = locator.locate_instant(&parse_timestamp(t)?)?;
                let first = match span.files.first() {
                    Some(f) => f,
                    None => return Err(SubsetError::UnhandledCase("no files selected".into())),
                };
                let axes = self.read_axes(&first.file, &request.variable)?;
                let windows = self.windows(request, &axes)?;
                let data = read_instant(&span, &request.variable, &windows, request.reduction)?;
                (data, vec![span.target_offset()], first.units.clone(), windows, axes)
            }
        };

        let keeps_levels = request.reduction == Reduction::Raw;
        let levels = match (&axes.levels, windows.level) {
            (Some(levels), Some(w)) if keeps_levels => Some(window_coordinates(
                levels,
                w.sorted(),
                AxisKind::Level,
            )),
            _ => None,
        };
        let mut dims = vec![AxisKind::Time, AxisKind::Latitude, AxisKind::Longitude];
        if axes.ndim == 4 && keeps_levels {
            dims.insert(1, AxisKind::Level);
        }
        let data = squeeze(data, &mut dims);

        Ok(SubsetResult {
            data,
            dims,
            times,
            time_units,
            levels,
            latitudes: window_coordinates(&axes.latitudes, windows.latitude, AxisKind::Latitude),
            longitudes: window_coordinates(&axes.longitudes, windows.longitude, AxisKind::Longitude),
        })
    }
}
