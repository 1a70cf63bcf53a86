// mitgcmrs-strat/src/stratification/errors.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StratificationBuilderError {
    #[error("Unitialized field on StratificationBuilder: {0}")]
    UninitializedFieldError(String),
    #[error("{0} has shape {1:?} but the grid is {2:?}")]
    FieldShapeMismatch(&'static str, (usize, usize, usize), (usize, usize, usize)),
    #[error("rho_const must be > 0, but got {0}")]
    InvalidRhoConst(f64),
    #[error("gravity must be > 0, but got {0}")]
    InvalidGravity(f64),
}

#[derive(Error, Debug)]
pub enum ComparisonPlotError {
    #[error("nlevels must be >= 2, but got {0}")]
    InvalidNlevelsValue(usize),
    #[error("nlevels must not exceed the number of vertical levels ({1}), but got {0}")]
    NlevelsExceedsGrid(usize, usize),
    #[error("longitude index {0} is out of range for a grid with nx = {1}")]
    LongitudeIndexOutOfRange(usize, usize),
}

#[derive(Error, Debug)]
pub enum ProfileExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
