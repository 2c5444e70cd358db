use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Where the file series lives and what its coordinates are called
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct SubsetConfig {
    /// Directory holding the files
    pub data_dir: PathBuf,

    /// Filename prefix; files are `{file_id}*`, sorted by name
    pub file_id: String,

    pub time_name: String,
    pub level_name: String,
    pub latitude_name: String,
    pub longitude_name: String,

    /// Fail if a file does not start after the previous one ends
    pub check_file_order: bool,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        SubsetConfig {
            data_dir: PathBuf::from("."),
            file_id: "era5_".to_string(),
            time_name: "time".to_string(),
            level_name: "level".to_string(),
            latitude_name: "latitude".to_string(),
            longitude_name: "longitude".to_string(),
            check_file_order: true,
        }
    }
}
