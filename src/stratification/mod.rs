// mitgcmrs-strat/src/stratification/mod.rs

mod builder;
mod errors;
mod stratification;

pub use builder::{StratificationBuilder, DEFAULT_GRAVITY, DEFAULT_RHO_CONST};
pub use errors::{ComparisonPlotError, ProfileExportError, StratificationBuilderError};
pub use stratification::Stratification;
