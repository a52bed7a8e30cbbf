//! The [`DnaBarcoderError`] `enum` definition and error messages.
//!
use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;
use std::string::FromUtf8Error;
use thiserror::Error;

/// The [`DnaBarcoderError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum DnaBarcoderError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("TSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid UTF-8 in sequence header: {0}")]
    Utf8Error(#[from] FromUtf8Error),

    // File parsing related errors
    #[error("Integer parsing error: {0}")]
    ParseIntError(#[from] ParseIntError),
    #[error("Float parsing error: {0}")]
    ParseFloatError(#[from] ParseFloatError),
    #[error("Classification file is invalid: {0}")]
    InvalidClassificationFile(String),
    #[error("Sequence file '{0}' has no file name")]
    InvalidSequenceFilename(PathBuf),

    // Configuration errors
    #[error("The rank '{0}' is not given in the classification.")]
    MissingRankColumn(String),
    #[error("No sequence id column named '{0}' in the classification. Please specify the sequence id column name by using --idcolumnname.")]
    MissingIdColumn(String),
    #[error("Classification position {0} is out of range: the classification has {1} columns")]
    RankPositionOutOfRange(usize, usize),
    #[error("Unsupported plot type '{0}': must be either 'boxplot' or 'plot'")]
    UnsupportedPlotType(String),

    // External aligner errors
    #[error("Aligner command '{0}' failed: {1}")]
    AlignerFailed(String, String),
    #[error("Aligner produced no hit table at {0}")]
    MissingAlignerOutput(PathBuf),
}
