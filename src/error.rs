use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by this crate
#[derive(Error, Debug)]
pub enum SubsetError {
    /// The requested time lies outside what the file series covers
    #[error("data is unavailable for {bound}: {reason}")]
    DataUnavailable { bound: String, reason: String },
    /// The time bracketing produced a file/index combination the reader
    /// does not know how to combine
    #[error("unhandled time selection: {0}")]
    UnhandledCase(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("no files matching \"{file_id}*\" in {dir}")]
    NoFiles { dir: PathBuf, file_id: String },
    #[error("files are not in chronological order: {previous} is followed by {next}")]
    FileOrder { previous: PathBuf, next: PathBuf },
    #[error("variable \"{name}\" not found in {path}")]
    MissingVariable { name: String, path: PathBuf },
    #[error("attribute \"{attribute}\" missing or not a string on variable \"{variable}\"")]
    MissingAttribute { attribute: String, variable: String },
    #[error("unsupported time units: \"{0}\"")]
    InvalidTimeUnits(String),
    #[error("could not parse timestamp \"{0}\"")]
    InvalidTimestamp(String),
    #[error("read of \"{variable}\" out of bounds: {detail}")]
    OutOfBounds { variable: String, detail: String },
    #[error(transparent)]
    NetCdf(#[from] netcdf::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, SubsetError>;

impl SubsetError {
    pub(crate) fn unavailable(bound: impl Into<String>, reason: impl Into<String>) -> Self {
        SubsetError::DataUnavailable {
            bound: bound.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        SubsetError::MalformedInput(msg.into())
    }
}
