//! Spatio-temporal subsetting of time-partitioned reanalysis files.
//!
//! A dataset such as ERA5 is stored as a sequence of files, each covering a
//! slice of the time axis on the same level/latitude/longitude grid.  This
//! crate finds the files a request needs, resolves coordinate bounds to
//! index windows (wrapping through the Greenwich meridian when necessary),
//! reads only the required hyperslabs and joins them into one array.
//!
//! See [`query::Subsetter`] for the entry point.

pub mod appconfig;
pub mod axis;
pub mod cmdline;
pub mod error;
pub mod grid;
pub mod locate;
pub mod main_body;
pub mod query;
pub mod search;
pub mod stitch;
pub mod time;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Result, SubsetError};
pub use query::{
    Region, SubsetRequest, SubsetRequestBuilder, SubsetResult, Subsetter, TimeSelection,
};
pub use stitch::Reduction;
