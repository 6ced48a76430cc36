//! Error types for the district ETL pipeline.
//!
//! - [`CsvError`] - reading, decoding, parsing and writing CSV files
//! - [`SchemaError`] - expected columns or column ranges absent from an input
//! - [`TransformError`] - failures inside one of the two transforms
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Data-quality conditions (zero denominators, unlabeled finance columns)
//! are not errors. They are counted on the transform outputs and logged.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing CSV tables.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("Cannot access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV record.
    #[error("Line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Failed to serialize a table.
    #[error("Failed to write CSV: {0}")]
    Write(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::Parse {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// An input does not carry the columns the dataset vintage promises.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// One or more required columns are absent.
    #[error("Table '{table}' is missing columns: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    /// A column range boundary is absent.
    #[error("Column range boundary '{column}' not found (range '{start}' to '{end}')")]
    MissingRangeBoundary {
        column: String,
        start: String,
        end: String,
    },

    /// The end of a column range sits before its start.
    #[error("Column range '{start}' to '{end}' is inverted")]
    InvertedRange { start: String, end: String },

    /// A configured column-name pattern does not compile.
    #[error("Invalid column pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A schema override file could not be read.
    #[error("Cannot read schema '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema override file could not be parsed.
    #[error("Invalid schema: {0}")]
    Invalid(#[from] serde_json::Error),
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors raised by the proficiency and finance transforms.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Schema mismatch.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A year or count cell holds something other than a number.
    ///
    /// `row` is the 1-based data row of the input table named `table`.
    #[error("Table '{table}', row {row}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        table: String,
        column: String,
        row: usize,
        value: String,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Schema error raised outside a transform (e.g. loading an override).
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Transformation error.
    #[error("Transform error in {stage}: {source}")]
    Transform {
        stage: &'static str,
        #[source]
        source: TransformError,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn in_stage(stage: &'static str) -> impl FnOnce(TransformError) -> Self {
        move |source| PipelineError::Transform { stage, source }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for schema checks.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let schema_err = SchemaError::MissingColumns {
            table: "staar".into(),
            columns: vec!["numerator".into(), "denominator".into()],
        };
        let transform_err: TransformError = schema_err.into();
        let pipeline_err = PipelineError::in_stage("proficiency")(transform_err);
        let msg = pipeline_err.to_string();
        assert!(msg.contains("proficiency"));
        assert!(msg.contains("numerator, denominator"));

        let pipeline_err: PipelineError = CsvError::EmptyFile.into();
        assert!(pipeline_err.to_string().contains("empty"));
    }

    #[test]
    fn test_range_error_format() {
        let err = SchemaError::MissingRangeBoundary {
            column: "EINTRAN4".into(),
            start: "TOTAL PROGRAM OPERATING EXPENDITURES".into(),
            end: "EINTRAN4".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'EINTRAN4' not found"));
        assert!(msg.contains("TOTAL PROGRAM OPERATING EXPENDITURES"));
    }

    #[test]
    fn test_invalid_number_format() {
        let err = TransformError::InvalidNumber {
            table: "campstaar2".into(),
            column: "denominator".into(),
            row: 7,
            value: "n/a".into(),
        };
        assert_eq!(
            err.to_string(),
            "Table 'campstaar2', row 7, column 'denominator': 'n/a' is not a number"
        );
    }
}
