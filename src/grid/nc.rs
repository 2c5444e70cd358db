use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::ArrayD;

use super::{check_extents, GridFile, GridSource};
use crate::error::{Result, SubsetError};

/// Opens netCDF files with libnetcdf
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfSource;

impl GridSource for NetcdfSource {
    type File = NetcdfGrid;

    fn open(&self, path: &Path) -> Result<NetcdfGrid> {
        debug!("Opening {}", path.display());
        let file = netcdf::open(path)?;
        Ok(NetcdfGrid {
            path: path.to_path_buf(),
            file,
        })
    }
}

/// An open netCDF file.  The handle is closed when this is dropped.
pub struct NetcdfGrid {
    path: PathBuf,
    file: netcdf::File,
}

/// Packing attributes of a variable, see CF conventions section 8.1
#[derive(Debug, Clone, Copy, PartialEq)]
struct Packing {
    scale_factor: f64,
    add_offset: f64,
    fill_value: Option<f64>,
    missing_value: Option<f64>,
}

impl Packing {
    fn unpack(&self, raw: f64) -> f64 {
        if self.fill_value == Some(raw) || self.missing_value == Some(raw) {
            f64::NAN
        } else {
            raw * self.scale_factor + self.add_offset
        }
    }

    fn is_identity(&self) -> bool {
        self.scale_factor == 1.0
            && self.add_offset == 0.0
            && self.fill_value.is_none()
            && self.missing_value.is_none()
    }
}

fn numeric_attribute(v: &netcdf::Variable, name: &str) -> Result<Option<f64>> {
    let att = match v.attributes().find(|a| a.name() == name) {
        Some(att) => att,
        None => return Ok(None),
    };
    let value = match att.value()? {
        netcdf::AttributeValue::Double(x) => Some(x),
        netcdf::AttributeValue::Float(x) => Some(x as f64),
        netcdf::AttributeValue::Int(x) => Some(x as f64),
        netcdf::AttributeValue::Short(x) => Some(x as f64),
        _ => None,
    };
    Ok(value)
}

impl NetcdfGrid {
    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| SubsetError::MissingVariable {
                name: name.to_string(),
                path: self.path.clone(),
            })
    }

    fn packing(v: &netcdf::Variable) -> Result<Packing> {
        Ok(Packing {
            scale_factor: numeric_attribute(v, "scale_factor")?.unwrap_or(1.0),
            add_offset: numeric_attribute(v, "add_offset")?.unwrap_or(0.0),
            fill_value: numeric_attribute(v, "_FillValue")?,
            missing_value: numeric_attribute(v, "missing_value")?,
        })
    }
}

impl GridFile for NetcdfGrid {
    fn path(&self) -> &Path {
        &self.path
    }

    fn shape(&self, name: &str) -> Result<Vec<usize>> {
        let v = self.variable(name)?;
        Ok(v.dimensions().iter().map(|d| d.len()).collect())
    }

    fn units(&self, name: &str) -> Result<String> {
        let v = self.variable(name)?;
        let missing = || SubsetError::MissingAttribute {
            attribute: "units".to_string(),
            variable: name.to_string(),
        };
        let att = v.attributes().find(|a| a.name() == "units").ok_or_else(missing)?;
        match att.value()? {
            netcdf::AttributeValue::Str(s) => Ok(s),
            _ => Err(missing()),
        }
    }

    fn read(&self, name: &str, extents: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let v = self.variable(name)?;
        let shape: Vec<usize> = v.dimensions().iter().map(|d| d.len()).collect();
        check_extents(name, &shape, extents)?;

        let mut data = v.get::<f64, _>(extents.to_vec())?;
        let packing = Self::packing(&v)?;
        if !packing.is_identity() {
            data.mapv_inplace(|x| packing.unpack(x));
        }
        Ok(data)
    }
}
