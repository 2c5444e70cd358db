//! In-memory grids, used for tests, benchmarks and callers that already hold
//! their data in arrays.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array1, ArrayD, Axis, Slice};

use super::{check_extents, GridFile, GridSource};
use crate::error::{Result, SubsetError};

#[derive(Debug, Clone)]
struct MemoryVariable {
    data: ArrayD<f64>,
    units: Option<String>,
}

/// A set of named arrays standing in for one file
#[derive(Debug, Clone, Default)]
pub struct MemoryGrid {
    variables: HashMap<String, MemoryVariable>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: &str, data: ArrayD<f64>, units: Option<&str>) -> Self {
        self.insert(name, data, units);
        self
    }

    pub fn with_coordinate(self, name: &str, values: Vec<f64>, units: Option<&str>) -> Self {
        self.with_variable(name, Array1::from(values).into_dyn(), units)
    }

    pub fn insert(&mut self, name: &str, data: ArrayD<f64>, units: Option<&str>) {
        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                data,
                units: units.map(str::to_string),
            },
        );
    }
}

/// Handle returned by [`MemorySource::open`]
#[derive(Debug, Clone)]
pub struct MemoryFile {
    path: PathBuf,
    grid: Arc<MemoryGrid>,
}

impl MemoryFile {
    fn variable(&self, name: &str) -> Result<&MemoryVariable> {
        self.grid
            .variables
            .get(name)
            .ok_or_else(|| SubsetError::MissingVariable {
                name: name.to_string(),
                path: self.path.clone(),
            })
    }
}

impl GridFile for MemoryFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn shape(&self, name: &str) -> Result<Vec<usize>> {
        Ok(self.variable(name)?.data.shape().to_vec())
    }

    fn units(&self, name: &str) -> Result<String> {
        self.variable(name)?
            .units
            .clone()
            .ok_or_else(|| SubsetError::MissingAttribute {
                attribute: "units".to_string(),
                variable: name.to_string(),
            })
    }

    fn read(&self, name: &str, extents: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let data = &self.variable(name)?.data;
        check_extents(name, data.shape(), extents)?;
        let mut view = data.view();
        for (ii, r) in extents.iter().enumerate() {
            view.slice_axis_inplace(Axis(ii), Slice::from(r.clone()));
        }
        Ok(view.to_owned())
    }
}

/// A directory of in-memory "files", keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<PathBuf, Arc<MemoryGrid>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: AsRef<Path>>(&mut self, path: P, grid: MemoryGrid) {
        self.files.insert(path.as_ref().to_path_buf(), Arc::new(grid));
    }
}

impl GridSource for MemorySource {
    type File = MemoryFile;

    fn open(&self, path: &Path) -> Result<MemoryFile> {
        let grid = self.files.get(path).ok_or_else(|| {
            SubsetError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ))
        })?;
        Ok(MemoryFile {
            path: path.to_path_buf(),
            grid: Arc::clone(grid),
        })
    }

    fn discover(&self, dir: &Path, file_id: &str) -> Result<Vec<PathBuf>> {
        // BTreeMap keys iterate in lexical order already
        let files: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with(file_id))
            })
            .cloned()
            .collect();
        if files.is_empty() {
            return Err(SubsetError::NoFiles {
                dir: dir.to_path_buf(),
                file_id: file_id.to_string(),
            });
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    fn grid() -> MemoryGrid {
        let data = Array::from_shape_fn(IxDyn(&[2, 3, 4]), |ix| {
            (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64
        });
        MemoryGrid::new()
            .with_variable("t2m", data, Some("K"))
            .with_coordinate("latitude", vec![1.0, 0.0, -1.0], Some("degrees_north"))
    }

    #[test]
    fn reads_hyperslab() {
        let mut src = MemorySource::new();
        src.insert("/data/a.nc", grid());
        let f = src.open(Path::new("/data/a.nc")).unwrap();
        let x = f.read("t2m", &[1..2, 0..3, 2..4]).unwrap();
        assert_eq!(x.shape(), &[1, 3, 2]);
        assert_eq!(x[[0, 2, 1]], 123.0);
        assert_eq!(f.coordinate("latitude").unwrap(), vec![1.0, 0.0, -1.0]);
        assert_eq!(f.units("t2m").unwrap(), "K");
    }

    #[test]
    fn missing_things_are_errors() {
        let mut src = MemorySource::new();
        src.insert("/data/a.nc", grid());
        let f = src.open(Path::new("/data/a.nc")).unwrap();
        assert!(matches!(
            f.read("u", &[0..1]),
            Err(SubsetError::MissingVariable { .. })
        ));
        assert!(matches!(
            f.read("t2m", &[0..3, 0..3, 0..4]),
            Err(SubsetError::OutOfBounds { .. })
        ));
        assert!(src.open(Path::new("/data/b.nc")).is_err());
    }

    #[test]
    fn discover_is_lexical() {
        let mut src = MemorySource::new();
        src.insert("/data/e5_2020-02.nc", MemoryGrid::new());
        src.insert("/data/e5_2020-01.nc", MemoryGrid::new());
        src.insert("/other/e5_2019-12.nc", MemoryGrid::new());
        let files = src.discover(Path::new("/data"), "e5_").unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/data/e5_2020-01.nc"),
                PathBuf::from("/data/e5_2020-02.nc")
            ]
        );
    }
}
