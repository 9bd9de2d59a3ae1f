//! Error taxonomy shared by the loader, the aggregator, and the snapshot cache.
//!
//! Load failures (`SourceUnavailable`, `SchemaMismatch`, `Csv`, `Encoding`,
//! and the quantity checks) abort the load. `FieldCoercion` is produced by the
//! cell parsers in [`crate::data`] and is always absorbed into a null by the
//! loader. `UnknownColumn`, `NonNumericMeasure` and `MeasureOverflow` only
//! fail the aggregation call that raised them.

use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = ReportError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("source {path:?} is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("missing required column(s): {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },
    #[error("column '{column}' cannot interpret '{value}'")]
    FieldCoercion { column: &'static str, value: String },
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("column '{0}' is not numeric and cannot be used as a measure")]
    NonNumericMeasure(String),
    #[error("sum of '{0}' exceeds the representable range")]
    MeasureOverflow(String),
    #[error("row {row}: quantity '{value}' is not a whole number")]
    FractionalQuantity { row: usize, value: String },
    #[error("row {row}: quantity '{value}' is negative")]
    NegativeQuantity { row: usize, value: String },
    #[error("row {row}: quantity '{value}' is too large")]
    QuantityOutOfRange { row: usize, value: String },
    #[error("row {row}: text is not valid in encoding {encoding}")]
    Encoding { row: usize, encoding: &'static str },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
