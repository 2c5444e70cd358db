//! Find which files of a time-partitioned series hold a requested time range
//! or instant, and where in each file's time axis the bounds fall.
//!
//! Files are visited in order and opened one at a time.  The scan stops as
//! soon as the request is resolved, so later files are never opened.

use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use itertools::Itertools;
use log::{info, warn};

use crate::error::{Result, SubsetError};
use crate::grid::{GridFile, GridSource};
use crate::search::{bracket, exact_or_nearest};
use crate::time::TimeUnits;

/// An open file of the series together with its time axis
pub struct SeriesFile<F> {
    pub file: F,
    pub times: Vec<f64>,
    /// `units` attribute of the time coordinate
    pub units: String,
    time_units: TimeUnits,
    datetimes: Vec<NaiveDateTime>,
}

impl<F: GridFile> SeriesFile<F> {
    fn open<S>(source: &S, path: &Path, time_name: &str) -> Result<Self>
    where
        S: GridSource<File = F>,
    {
        let file = source.open(path)?;
        let times = file.coordinate(time_name)?;
        let units = file.units(time_name)?;
        let time_units = TimeUnits::parse(&units)?;
        if times.is_empty() {
            return Err(SubsetError::malformed(format!(
                "time axis of {} is empty",
                path.display()
            )));
        }
        if !times.iter().tuple_windows().all(|(a, b)| a < b) {
            return Err(SubsetError::malformed(format!(
                "time axis of {} is not strictly increasing",
                path.display()
            )));
        }
        let datetimes = times
            .iter()
            .map(|&t| time_units.datetime(t))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| SubsetError::malformed(format!("{} in {}", e, path.display())))?;
        Ok(SeriesFile {
            file,
            times,
            units,
            time_units,
            datetimes,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn first(&self) -> f64 {
        self.times[0]
    }

    pub fn last(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn last_index(&self) -> usize {
        self.times.len() - 1
    }

    pub fn time_units(&self) -> &TimeUnits {
        &self.time_units
    }

    /// `t` expressed in this file's time units
    pub fn offset(&self, t: &NaiveDateTime) -> f64 {
        self.time_units.offset(t)
    }

    pub fn datetime(&self, index: usize) -> NaiveDateTime {
        self.datetimes[index]
    }

    /// Stored index equal to `t`, otherwise the nearest one
    fn index_of(&self, t: f64) -> Result<usize> {
        exact_or_nearest(&self.times, t).ok_or_else(|| {
            SubsetError::UnhandledCase(format!("no time index for {} in {}", t, self.path().display()))
        })
    }
}

/// Visits files in order, checking the series as it goes
struct Scan<'a, S: GridSource> {
    source: &'a S,
    paths: std::slice::Iter<'a, PathBuf>,
    time_name: &'a str,
    check_order: bool,
    previous_end: Option<(PathBuf, NaiveDateTime)>,
    first_units: Option<String>,
}

impl<'a, S: GridSource> Scan<'a, S> {
    fn visit(&mut self, path: &Path) -> Result<SeriesFile<S::File>> {
        let series = SeriesFile::open(self.source, path, self.time_name)?;

        match &self.first_units {
            None => self.first_units = Some(series.units.clone()),
            Some(units) if *units != series.units => warn!(
                "{} has time units \"{}\", earlier files have \"{}\"",
                path.display(),
                series.units,
                units
            ),
            Some(_) => {}
        }

        if self.check_order {
            if let Some((previous, previous_end)) = &self.previous_end {
                if series.datetime(0) <= *previous_end {
                    return Err(SubsetError::FileOrder {
                        previous: previous.clone(),
                        next: path.to_path_buf(),
                    });
                }
            }
            self.previous_end = Some((path.to_path_buf(), series.datetime(series.last_index())));
        }
        Ok(series)
    }
}

impl<'a, S: GridSource> Iterator for Scan<'a, S> {
    type Item = Result<SeriesFile<S::File>>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(self.visit(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanRole {
    /// The whole request lies in one file
    Only,
    First,
    /// Entire time axis included
    Middle,
    Last,
}

/// The portion of one file's time axis that a range query needs
pub struct FileSpan<F> {
    pub series: SeriesFile<F>,
    pub range: Range<usize>,
    pub role: SpanRole,
}

impl<F: GridFile> FileSpan<F> {
    /// Stored times covered by this span
    pub fn times(&self) -> &[f64] {
        &self.series.times[self.range.clone()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seek {
    Start,
    End,
    Done,
}

/// Files and time indices surrounding a single instant.
///
/// One file with one index is an exact match; otherwise the two indices are
/// the stored times either side of `target`, in the same file or in two
/// adjacent files.
pub struct InstantSpan<F> {
    pub files: Vec<SeriesFile<F>>,
    pub indices: Vec<usize>,
    pub target: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantKind {
    Exact,
    WithinFile,
    AcrossFiles,
}

impl<F: GridFile> InstantSpan<F> {
    pub fn kind(&self) -> Result<InstantKind> {
        let kind = match (self.files.len(), self.indices.len()) {
            (1, 1) => InstantKind::Exact,
            (1, 2) => InstantKind::WithinFile,
            (2, 2) => InstantKind::AcrossFiles,
            (nf, ni) => {
                return Err(SubsetError::UnhandledCase(format!(
                    "{} file(s) with {} time index(es) around {}",
                    nf, ni, self.target
                )))
            }
        };
        for (series, index) in self.endpoints() {
            if index >= series.times.len() {
                return Err(SubsetError::UnhandledCase(format!(
                    "time index {} outside {} (length {})",
                    index,
                    series.path().display(),
                    series.times.len()
                )));
            }
        }
        Ok(kind)
    }

    /// `(file, index)` for each time point, earliest first
    pub fn endpoints(&self) -> Vec<(&SeriesFile<F>, usize)> {
        if self.files.len() == 1 {
            self.indices.iter().map(|&ii| (&self.files[0], ii)).collect()
        } else {
            self.files.iter().zip(self.indices.iter().copied()).collect()
        }
    }

    /// Fraction of the way from the first time point to the second
    pub fn weight(&self) -> Result<f64> {
        let points = self.endpoints();
        if points.len() != 2 {
            return Ok(0.0);
        }
        let (fa, ia) = points[0];
        let (fb, ib) = points[1];
        let (a, b) = (fa.datetime(ia), fb.datetime(ib));
        let interval = (b - a).num_milliseconds();
        if interval <= 0 {
            return Err(SubsetError::UnhandledCase(format!(
                "bracketing times {} and {} are not increasing",
                a, b
            )));
        }
        Ok((self.target - a).num_milliseconds() as f64 / interval as f64)
    }

    /// `target` in the time units of the first file
    pub fn target_offset(&self) -> f64 {
        self.files[0].offset(&self.target)
    }
}

/// Resolves times against an ordered list of files
pub struct Locator<'a, S> {
    source: &'a S,
    paths: &'a [PathBuf],
    time_name: &'a str,
    check_order: bool,
}

impl<'a, S: GridSource> Locator<'a, S> {
    pub fn new(source: &'a S, paths: &'a [PathBuf], time_name: &'a str) -> Self {
        Locator {
            source,
            paths,
            time_name,
            check_order: true,
        }
    }

    /// Fail with `FileOrder` when a file does not start after the previous one ends
    pub fn check_order(mut self, check: bool) -> Self {
        self.check_order = check;
        self
    }

    fn scan(&self) -> Result<Scan<'a, S>> {
        if self.paths.is_empty() {
            return Err(SubsetError::malformed("no files to search"));
        }
        Ok(Scan {
            source: self.source,
            paths: self.paths.iter(),
            time_name: self.time_name,
            check_order: self.check_order,
            previous_end: None,
            first_units: None,
        })
    }

    /// Spans covering `[start, end]`, in file order.
    ///
    /// Bounds resolve to the nearest stored time, exact matches first.  A
    /// bound in the gap between two files goes to whichever neighbour is
    /// nearer, the earlier file on a tie.
    pub fn locate_range(
        &self,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
    ) -> Result<Vec<FileSpan<S::File>>> {
        if start > end {
            return Err(SubsetError::malformed(format!(
                "time range starts at {} after it ends at {}",
                start, end
            )));
        }
        let mut state = Seek::Start;
        let mut spans = vec![];
        let mut skipped: Option<SeriesFile<S::File>> = None;

        for series in self.scan()? {
            let series = series?;
            state = match state {
                Seek::Start => {
                    let lower = series.offset(start);
                    if lower > series.last() {
                        skipped = Some(series);
                        continue;
                    }
                    if lower >= series.first() {
                        let i0 = series.index_of(lower)?;
                        start_in(series, i0, end, &mut spans)?
                    } else {
                        let previous = skipped.take().ok_or_else(|| {
                            SubsetError::unavailable(
                                format!("start {}", start),
                                format!(
                                    "precedes the first time {} in {}",
                                    series.datetime(0),
                                    series.path().display()
                                ),
                            )
                        })?;
                        let gap_before = *start - previous.datetime(previous.last_index());
                        let gap_after = series.datetime(0) - *start;
                        if gap_before <= gap_after {
                            let last = previous.last_index();
                            spans.push(span(previous, last..last + 1));
                            seek_end(series, end, &mut spans)?
                        } else {
                            start_in(series, 0, end, &mut spans)?
                        }
                    }
                }
                Seek::End => seek_end(series, end, &mut spans)?,
                Seek::Done => Seek::Done,
            };
            if state == Seek::Done {
                break;
            }
        }

        match state {
            Seek::Done => {}
            Seek::Start => {
                return Err(SubsetError::unavailable(
                    format!("start {}", start),
                    "follows the last time in the file series",
                ))
            }
            Seek::End => {
                return Err(SubsetError::unavailable(
                    format!("end {}", end),
                    "follows the last time in the file series",
                ))
            }
        }

        assign_roles(&mut spans);
        for s in spans.iter() {
            info!(
                "{:?} file: {} [{}..{})",
                s.role,
                s.series.path().display(),
                s.range.start,
                s.range.end
            );
        }
        Ok(spans)
    }

    /// Files and indices around a single instant, see [`InstantSpan`]
    pub fn locate_instant(&self, target: &NaiveDateTime) -> Result<InstantSpan<S::File>> {
        let mut previous: Option<SeriesFile<S::File>> = None;
        for series in self.scan()? {
            let series = series?;
            let t = series.offset(target);
            if t > series.last() {
                previous = Some(series);
                continue;
            }

            let (files, indices) = if t >= series.first() {
                info!("Time {} in {}", target, series.path().display());
                if let Some(idx) = series.times.iter().position(|&x| x == t) {
                    (vec![series], vec![idx])
                } else {
                    let (i0, i1) = bracket(&series.times, t).ok_or_else(|| {
                        SubsetError::UnhandledCase(format!(
                            "cannot bracket {} in {}",
                            target,
                            series.path().display()
                        ))
                    })?;
                    (vec![series], vec![i0, i1])
                }
            } else {
                let previous = previous.ok_or_else(|| {
                    SubsetError::unavailable(
                        format!("time {}", target),
                        format!(
                            "precedes the first time {} in {}",
                            series.datetime(0),
                            series.path().display()
                        ),
                    )
                })?;
                info!(
                    "Time {} between {} and {}",
                    target,
                    previous.path().display(),
                    series.path().display()
                );
                let last = previous.last_index();
                (vec![previous, series], vec![last, 0])
            };
            return Ok(InstantSpan {
                files,
                indices,
                target: *target,
            });
        }
        Err(SubsetError::unavailable(
            format!("time {}", target),
            "follows the last time in the file series",
        ))
    }
}

fn span<F>(series: SeriesFile<F>, range: Range<usize>) -> FileSpan<F> {
    FileSpan {
        series,
        range,
        role: SpanRole::Middle,
    }
}

/// The start lies in `series` at `i0`; either the end does too or the
/// search moves on
fn start_in<F: GridFile>(
    series: SeriesFile<F>,
    i0: usize,
    end: &NaiveDateTime,
    spans: &mut Vec<FileSpan<F>>,
) -> Result<Seek> {
    let upper = series.offset(end);
    if upper <= series.last() {
        let i1 = series.index_of(upper)?;
        spans.push(span(series, i0..i1 + 1));
        Ok(Seek::Done)
    } else {
        let n = series.times.len();
        spans.push(span(series, i0..n));
        Ok(Seek::End)
    }
}

fn seek_end<F: GridFile>(
    series: SeriesFile<F>,
    end: &NaiveDateTime,
    spans: &mut Vec<FileSpan<F>>,
) -> Result<Seek> {
    let upper = series.offset(end);
    if upper < series.first() {
        // end falls in the gap before this file
        let previous_end = match spans.last() {
            Some(s) => s.series.datetime(s.series.last_index()),
            None => return Err(SubsetError::UnhandledCase("end seen before start".into())),
        };
        if *end - previous_end > series.datetime(0) - *end {
            spans.push(span(series, 0..1));
        }
        return Ok(Seek::Done);
    }
    if upper <= series.last() {
        let i1 = series.index_of(upper)?;
        spans.push(span(series, 0..i1 + 1));
        Ok(Seek::Done)
    } else {
        let n = series.times.len();
        spans.push(span(series, 0..n));
        Ok(Seek::End)
    }
}

fn assign_roles<F>(spans: &mut [FileSpan<F>]) {
    let n = spans.len();
    for (ii, s) in spans.iter_mut().enumerate() {
        s.role = match (ii, n) {
            (_, 1) => SpanRole::Only,
            (0, _) => SpanRole::First,
            (ii, n) if ii == n - 1 => SpanRole::Last,
            _ => SpanRole::Middle,
        };
    }
}
