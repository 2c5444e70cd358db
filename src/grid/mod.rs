//! The array-file backend.
//!
//! A [`GridSource`] discovers and opens files; an opened [`GridFile`] exposes
//! named variables, their shapes and `units` attributes, and reads hyperslabs
//! as `f64` arrays.  Subsetting logic only talks to these traits, so the
//! same code runs against netCDF files ([`nc::NetcdfSource`]) and in-memory
//! grids ([`memory::MemorySource`]).

pub mod memory;
pub mod nc;

use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::ArrayD;

use crate::error::{Result, SubsetError};

pub trait GridFile {
    /// Path this file was opened from, used in messages
    fn path(&self) -> &Path;

    /// Shape of a variable, outermost dimension first
    fn shape(&self, name: &str) -> Result<Vec<usize>>;

    /// The `units` attribute of a variable
    fn units(&self, name: &str) -> Result<String>;

    /// Read a hyperslab, one index range per dimension
    fn read(&self, name: &str, extents: &[Range<usize>]) -> Result<ArrayD<f64>>;

    /// Read a whole one-dimensional coordinate variable
    fn coordinate(&self, name: &str) -> Result<Vec<f64>> {
        let shape = self.shape(name)?;
        if shape.len() != 1 {
            return Err(SubsetError::malformed(format!(
                "coordinate \"{}\" in {} has {} dimensions, expected 1",
                name,
                self.path().display(),
                shape.len()
            )));
        }
        #[allow(clippy::single_range_in_vec_init)]
        let values = self.read(name, &[0..shape[0]])?;
        Ok(values.into_raw_vec())
    }
}

pub trait GridSource {
    type File: GridFile;

    fn open(&self, path: &Path) -> Result<Self::File>;

    /// Files in `dir` whose names start with `file_id`, sorted lexicographically.
    ///
    /// Callers rely on lexical order being chronological order, e.g. date
    /// stamped file names.
    fn discover(&self, dir: &Path, file_id: &str) -> Result<Vec<PathBuf>> {
        let mut files = vec![];
        for entry in dir.read_dir()? {
            let entry = entry?;
            let matches = entry
                .file_name()
                .to_str()
                .map_or(false, |name| name.starts_with(file_id));
            if matches && entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        if files.is_empty() {
            return Err(SubsetError::NoFiles {
                dir: dir.to_path_buf(),
                file_id: file_id.to_string(),
            });
        }
        files.sort();
        Ok(files)
    }
}

/// Check that `extents` selects a non-empty block inside `shape`
pub(crate) fn check_extents(name: &str, shape: &[usize], extents: &[Range<usize>]) -> Result<()> {
    let out_of_bounds = |detail: String| SubsetError::OutOfBounds {
        variable: name.to_string(),
        detail,
    };
    if shape.len() != extents.len() {
        return Err(out_of_bounds(format!(
            "{} ranges given for {} dimensions",
            extents.len(),
            shape.len()
        )));
    }
    for (dim, (r, &len)) in extents.iter().zip(shape).enumerate() {
        if r.start >= r.end || r.end > len {
            return Err(out_of_bounds(format!(
                "range {:?} on dimension {} of length {}",
                r, dim, len
            )));
        }
    }
    Ok(())
}
