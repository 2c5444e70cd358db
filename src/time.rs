//! Conversion between timestamp strings and the numeric time coordinate of a
//! file, described by a CF style units string such as
//! `"hours since 1900-01-01 00:00:00.0"`.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, SubsetError};

/// Beyond any representable date, but well inside `Duration`'s range
const MAX_MILLISECONDS: f64 = 1e17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStep {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeStep {
    pub fn seconds(&self) -> f64 {
        match self {
            TimeStep::Seconds => 1.0,
            TimeStep::Minutes => 60.0,
            TimeStep::Hours => 3600.0,
            TimeStep::Days => 86400.0,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => Some(TimeStep::Seconds),
            "minutes" | "minute" | "mins" | "min" => Some(TimeStep::Minutes),
            "hours" | "hour" | "hrs" | "hr" | "h" => Some(TimeStep::Hours),
            "days" | "day" | "d" => Some(TimeStep::Days),
            _ => None,
        }
    }
}

/// Parsed form of a `"<step> since <epoch>"` units attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub step: TimeStep,
    pub epoch: NaiveDateTime,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self> {
        let invalid = || SubsetError::InvalidTimeUnits(units.to_string());
        let mut parts = units.trim().splitn(3, char::is_whitespace);
        let step = parts.next().and_then(TimeStep::parse).ok_or_else(invalid)?;
        match parts.next() {
            Some(word) if word.eq_ignore_ascii_case("since") => {}
            _ => return Err(invalid()),
        }
        let epoch = parts
            .next()
            .and_then(|s| parse_timestamp(s).ok())
            .ok_or_else(invalid)?;
        Ok(TimeUnits { step, epoch })
    }

    /// Offset of `t` from the epoch, in units of the time step
    pub fn offset(&self, t: &NaiveDateTime) -> f64 {
        let elapsed = *t - self.epoch;
        elapsed.num_milliseconds() as f64 / 1000.0 / self.step.seconds()
    }

    /// Inverse of [`TimeUnits::offset`], to the nearest millisecond.
    ///
    /// Fails for values that are not finite or fall outside the calendar.
    pub fn datetime(&self, value: f64) -> Result<NaiveDateTime> {
        let out_of_range =
            || SubsetError::malformed(format!("time value {} is out of range", value));
        let ms = (value * self.step.seconds() * 1000.0).round();
        if !ms.is_finite() || ms.abs() > MAX_MILLISECONDS {
            return Err(out_of_range());
        }
        self.epoch
            .checked_add_signed(Duration::milliseconds(ms as i64))
            .ok_or_else(out_of_range)
    }
}

/// Parse `"YYYY-MM-DD"`, `"YYYY-MM-DD hh"`, `"YYYY-MM-DD hh:mm"` or
/// `"YYYY-MM-DD hh:mm:ss[.f]"`.  A `T` separator and a trailing `Z`/`UTC`
/// are accepted too.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let invalid = || SubsetError::InvalidTimestamp(s.to_string());
    let trimmed = s.trim();
    let trimmed = trimmed
        .strip_suffix("UTC")
        .or_else(|| trimmed.strip_suffix('Z'))
        .unwrap_or(trimmed)
        .trim_end();

    let (date_str, time_str) = match trimmed.split_once(&[' ', 'T'][..]) {
        Some((d, t)) => (d, t.trim()),
        None => (trimmed, ""),
    };
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| invalid())?;

    let time_str = match time_str.split(':').count() {
        _ if time_str.is_empty() => "00:00:00".to_string(),
        1 => format!("{time_str}:00:00"),
        2 => format!("{time_str}:00"),
        _ => time_str.to_string(),
    };
    let time = NaiveTime::parse_from_str(&time_str, "%H:%M:%S%.f").map_err(|_| invalid())?;
    Ok(NaiveDateTime::new(date, time))
}

/// Numeric offset of `timestamp` in a file whose time axis has `units`.
pub fn time_since(timestamp: &str, units: &str) -> Result<f64> {
    let units = TimeUnits::parse(units)?;
    Ok(units.offset(&parse_timestamp(timestamp)?))
}

/// Timestamp of a numeric time coordinate in a file whose time axis has `units`.
pub fn to_datetime(value: f64, units: &str) -> Result<NaiveDateTime> {
    TimeUnits::parse(units)?.datetime(value)
}
