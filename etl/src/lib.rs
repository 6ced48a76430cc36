//! # district-etl - district-level STAAR and PEIMS tables
//!
//! Turns the campus-level STAAR proficiency files and the summarized PEIMS
//! financial file into two clean, single-year, district-keyed tables ready
//! to be joined.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │  CSV Files  │────▶│   Parser    │────▶│    Transform     │────▶│  CSV Files  │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (STAAR / PEIMS)  │     │ (2019 only) │
//! └─────────────┘     └─────────────┘     └──────────────────┘     └─────────────┘
//!                                                   ▲
//!                                          ┌────────┴────────┐
//!                                          │     Schema      │
//!                                          │ (vintage names) │
//!                                          └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use district_etl::{run_pipeline, PipelineOptions};
//!
//! fn main() {
//!     let report = run_pipeline(&PipelineOptions::default()).unwrap();
//!     println!("{} districts with finance data", report.finance_output.rows);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Run log
//! - [`models`] - The [`Table`] column model
//! - [`parser`] - CSV reading and writing with encoding detection
//! - [`schema`] - Dataset-vintage column names, ranges and labels
//! - [`transform`] - Proficiency aggregation, finance reshaping, pipeline
//! - [`validation`] - Output checks and quality report

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Configuration
pub mod schema;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{CsvError, PipelineError, SchemaError, TransformError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::Table;

// =============================================================================
// Re-exports - CSV
// =============================================================================

pub use parser::{
    decode_content,
    detect_encoding,
    parse_bytes_auto,
    parse_str,
    read_table,
    to_csv_string,
    write_table,
    ParseResult,
};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use schema::{
    ColumnLabel,
    ColumnRange,
    DistrictPolicy,
    EtlSchema,
    FinanceSchema,
    NameOp,
    ProficiencySchema,
    DEFAULT_TARGET_YEAR,
};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use transform::{
    aggregate_proficiency,
    reshape_finance,
    run_finance,
    run_pipeline,
    run_proficiency,
    FileInfo,
    FinanceOutput,
    PipelineOptions,
    ProficiencyOutput,
    RunReport,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{validate_finance_table, validate_proficiency_table, QualityReport};
