use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::Field;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No .{extension} result files found in {}", dir.display())]
    NoInputFiles { dir: PathBuf, extension: String },
    #[error("{} is missing column {column}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{} does not match the result schema: {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Unknown field {0}")]
    UnknownField(String),
    #[error("At least one group key is required")]
    NoGroupKeys,
    #[error("At least one metric is required")]
    NoMetrics,
    #[error("Field {0} cannot be used as a group key")]
    NotCategorical(Field),
    #[error("Field {0} is not numeric")]
    NotNumeric(Field),
    #[error("Aggregation is not grouped by {0}")]
    MissingKey(Field),
    #[error("Aggregation has no metric {0}")]
    MissingMetric(Field),
    #[error("Series need exactly two group keys, got {0}")]
    SeriesKeys(usize),
    #[error("Invalid filter pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No series to draw for {}", path.display())]
    EmptySeries { path: PathBuf },
    #[error("Output directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },
    #[error("Drawing {} failed: {source}", path.display())]
    Draw {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
