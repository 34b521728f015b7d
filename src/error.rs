use std::path::PathBuf;

use thiserror::Error;

/// Domain failures raised while cleaning, preparing or charting forest data.
#[derive(Debug, Error)]
pub enum ForestError {
    #[error("{}: missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{context}: '{value}' is not a number")]
    InvalidNumber { context: String, value: String },
    #[error("{context}: '{value}' is not a valid year")]
    InvalidYear { context: String, value: String },
    #[error("multiple types found in {table} data: {types}")]
    MultipleTypes { table: String, types: String },
    #[error("{0} data is empty")]
    EmptyTable(String),
    #[error("unknown forest type '{0}'")]
    UnknownType(String),
    #[error("unknown tree species '{0}'")]
    UnknownSpecies(String),
    #[error("unknown colour scale '{0}'")]
    UnknownColourScale(String),
    #[error("invalid colour '{0}'")]
    InvalidColour(String),
}
