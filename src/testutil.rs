//! Synthetic ERA5-like file series shared by the unit tests.

use ndarray::{Array, IxDyn};

use crate::grid::memory::{MemoryGrid, MemorySource};

pub(crate) const UNITS: &str = "hours since 2020-01-01 00:00:00";
pub(crate) const DATA_DIR: &str = "/era5";
pub(crate) const FILE_ID: &str = "e5_pl_";

pub(crate) fn levels() -> Vec<f64> {
    vec![500.0, 850.0, 1000.0]
}

/// 30 degree grid, stored north to south like ERA5
pub(crate) fn latitudes() -> Vec<f64> {
    (0..7).map(|ii| 90.0 - 30.0 * ii as f64).collect()
}

pub(crate) fn longitudes() -> Vec<f64> {
    (0..12).map(|ii| 30.0 * ii as f64).collect()
}

/// Value of the synthetic field; linear in time so interpolation is exact
pub(crate) fn field(t: f64, level: usize, lat: usize, lon: usize) -> f64 {
    t + 1000.0 * level as f64 + 10.0 * lat as f64 + 0.5 * lon as f64
}

pub(crate) fn steps(start: f64, count: usize) -> Vec<f64> {
    (0..count).map(|ii| start + 6.0 * ii as f64).collect()
}

/// One file holding a 4-D `t` and a 3-D `sp` on the synthetic grid
pub(crate) fn era5_file(times: &[f64], units: &str) -> MemoryGrid {
    let (nt, nlev, nlat, nlon) = (
        times.len(),
        levels().len(),
        latitudes().len(),
        longitudes().len(),
    );
    let t = Array::from_shape_fn(IxDyn(&[nt, nlev, nlat, nlon]), |ix| {
        field(times[ix[0]], ix[1], ix[2], ix[3])
    });
    let sp = Array::from_shape_fn(IxDyn(&[nt, nlat, nlon]), |ix| {
        field(times[ix[0]], 0, ix[1], ix[2])
    });
    MemoryGrid::new()
        .with_coordinate("time", times.to_vec(), Some(units))
        .with_coordinate("level", levels(), Some("millibars"))
        .with_coordinate("latitude", latitudes(), Some("degrees_north"))
        .with_coordinate("longitude", longitudes(), Some("degrees_east"))
        .with_variable("t", t, Some("K"))
        .with_variable("sp", sp, Some("Pa"))
}

pub(crate) fn file_path(ii: usize) -> String {
    format!("{}/{}{:02}.nc", DATA_DIR, FILE_ID, ii)
}

/// A series of files in `DATA_DIR`, one per entry of `file_times`
pub(crate) fn series(file_times: &[Vec<f64>]) -> MemorySource {
    let mut source = MemorySource::new();
    for (ii, times) in file_times.iter().enumerate() {
        source.insert(file_path(ii), era5_file(times, UNITS));
    }
    source
}

/// Three files of four 6-hourly steps: 2020-01-01 00 to 2020-01-03 18
pub(crate) fn three_days() -> MemorySource {
    series(&[steps(0.0, 4), steps(24.0, 4), steps(48.0, 4)])
}

/// Write the 3-D `sp` field of the synthetic grid as a netCDF series in `dir`
pub(crate) fn write_netcdf_series(dir: &std::path::Path, file_times: &[Vec<f64>]) {
    let lat = latitudes();
    let lon = longitudes();
    for (ii, times) in file_times.iter().enumerate() {
        let fname = dir.join(format!("{}{:02}.nc", FILE_ID, ii));
        let mut file = netcdf::create(&fname).unwrap();
        file.add_dimension("time", times.len()).unwrap();
        file.add_dimension("latitude", lat.len()).unwrap();
        file.add_dimension("longitude", lon.len()).unwrap();
        {
            let mut v = file.add_variable::<f64>("time", &["time"]).unwrap();
            v.put_attribute("units", UNITS).unwrap();
            v.put_values(times, ..).unwrap();
        }
        {
            let mut v = file.add_variable::<f64>("latitude", &["latitude"]).unwrap();
            v.put_values(&lat, ..).unwrap();
        }
        {
            let mut v = file.add_variable::<f64>("longitude", &["longitude"]).unwrap();
            v.put_values(&lon, ..).unwrap();
        }
        let mut values = vec![];
        for &t in times.iter() {
            for jj in 0..lat.len() {
                for kk in 0..lon.len() {
                    values.push(field(t, 0, jj, kk));
                }
            }
        }
        let mut v = file
            .add_variable::<f64>("sp", &["time", "latitude", "longitude"])
            .unwrap();
        v.put_values(&values, ..).unwrap();
    }
}
