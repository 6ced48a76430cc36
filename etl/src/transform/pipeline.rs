//! High-level pipeline API: read, transform, validate, write.
//!
//! # Example
//!
//! ```rust,ignore
//! use district_etl::{run_pipeline, PipelineOptions};
//!
//! let report = run_pipeline(&PipelineOptions::default())?;
//! println!("{} district proficiency rows", report.proficiency_output.rows);
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_error, log_info, log_success, log_warning, LogEntry, LOG_COLLECTOR};
use crate::models::Table;
use crate::parser::{read_table, write_table, ParseResult};
use crate::schema::{EtlSchema, FinanceSchema, ProficiencySchema};
use crate::transform::finance::{reshape_finance, FinanceOutput};
use crate::transform::proficiency::{aggregate_proficiency, ProficiencyOutput};
use crate::validation::{validate_finance_table, validate_proficiency_table, QualityReport};

pub const DEFAULT_FINANCE_INPUT: &str = "data/in/2007-2021-summaried-peims-financial-data.csv";
pub const DEFAULT_STAAR_INPUT_A: &str = "data/in/tidy_campstaar1_2012to2019.csv";
pub const DEFAULT_STAAR_INPUT_B: &str = "data/in/tidy_campstaar2_2013to2019.csv";
pub const DEFAULT_STAAR_OUTPUT: &str = "data/inter/clean_staar_2019.csv";
pub const DEFAULT_FINANCE_OUTPUT: &str = "data/inter/clean_peims_2019.csv";

/// Options for the full pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub finance_input: PathBuf,
    pub staar_input_a: PathBuf,
    pub staar_input_b: PathBuf,
    pub staar_output: PathBuf,
    pub finance_output: PathBuf,

    /// Column names, ranges, labels and target year
    pub schema: EtlSchema,

    /// Field delimiter for every input and output
    pub delimiter: u8,

    /// Write the run report as JSON here
    pub report_path: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            finance_input: PathBuf::from(DEFAULT_FINANCE_INPUT),
            staar_input_a: PathBuf::from(DEFAULT_STAAR_INPUT_A),
            staar_input_b: PathBuf::from(DEFAULT_STAAR_INPUT_B),
            staar_output: PathBuf::from(DEFAULT_STAAR_OUTPUT),
            finance_output: PathBuf::from(DEFAULT_FINANCE_OUTPUT),
            schema: EtlSchema::default(),
            delimiter: b',',
            report_path: None,
        }
    }
}

/// Shape and encoding of one file touched by the run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    pub rows: usize,
    pub columns: usize,
}

impl FileInfo {
    fn input(path: &Path, parsed: &ParseResult) -> Self {
        let (rows, columns) = parsed.table.shape();
        Self {
            path: path.to_path_buf(),
            encoding: Some(parsed.encoding.clone()),
            rows,
            columns,
        }
    }

    fn output(path: &Path, table: &Table) -> Self {
        let (rows, columns) = table.shape();
        Self {
            path: path.to_path_buf(),
            encoding: None,
            rows,
            columns,
        }
    }
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub target_year: i64,
    pub inputs: Vec<FileInfo>,
    pub proficiency_output: FileInfo,
    pub finance_output: FileInfo,
    pub quality: QualityReport,
    pub log: Vec<LogEntry>,
}

/// A transform output that passed through validation but is not written yet.
struct Prepared<T> {
    output: T,
    inputs: Vec<FileInfo>,
    issues: Vec<String>,
}

fn prepare_proficiency(
    input_a: &Path,
    input_b: &Path,
    schema: &ProficiencySchema,
    delimiter: u8,
) -> PipelineResult<Prepared<ProficiencyOutput>> {
    log_info("📖 Reading STAAR campus files...");
    let a = read_input(input_a, delimiter)?;
    let b = read_input(input_b, delimiter)?;
    let inputs = vec![FileInfo::input(input_a, &a), FileInfo::input(input_b, &b)];

    log_info("⚙️  Aggregating campuses to districts...");
    let output = aggregate_proficiency(&a.table, &b.table, schema)
        .map_err(PipelineError::in_stage("proficiency"))?;
    let issues = report_validation("proficiency", validate_proficiency_table(&output.table, schema));

    Ok(Prepared {
        output,
        inputs,
        issues,
    })
}

fn prepare_finance(
    input: &Path,
    schema: &FinanceSchema,
    delimiter: u8,
) -> PipelineResult<Prepared<FinanceOutput>> {
    log_info("📖 Reading PEIMS finance file...");
    let parsed = read_input(input, delimiter)?;
    let inputs = vec![FileInfo::input(input, &parsed)];

    log_info("⚙️  Reshaping finance columns...");
    let output =
        reshape_finance(&parsed.table, schema).map_err(PipelineError::in_stage("finance"))?;
    let issues = report_validation("finance", validate_finance_table(&output.table, schema));

    Ok(Prepared {
        output,
        inputs,
        issues,
    })
}

/// Read both STAAR files, aggregate, validate and write the district table.
pub fn run_proficiency(
    input_a: &Path,
    input_b: &Path,
    output: &Path,
    schema: &ProficiencySchema,
    delimiter: u8,
) -> PipelineResult<(ProficiencyOutput, Vec<FileInfo>)> {
    let prepared = prepare_proficiency(input_a, input_b, schema, delimiter)?;
    write_output(&prepared.output.table, output, delimiter)?;
    Ok((prepared.output, prepared.inputs))
}

/// Read the PEIMS file, reshape, validate and write the district table.
pub fn run_finance(
    input: &Path,
    output: &Path,
    schema: &FinanceSchema,
    delimiter: u8,
) -> PipelineResult<(FinanceOutput, Vec<FileInfo>)> {
    let prepared = prepare_finance(input, schema, delimiter)?;
    write_output(&prepared.output.table, output, delimiter)?;
    Ok((prepared.output, prepared.inputs))
}

/// Run both transforms end to end.
///
/// 1. Read the two STAAR files and the PEIMS file
/// 2. Aggregate proficiency, reshape finance
/// 3. Validate both outputs
/// 4. Write both outputs (and the report, if asked)
///
/// Nothing is written unless every earlier step succeeded for both tables.
pub fn run_pipeline(options: &PipelineOptions) -> PipelineResult<RunReport> {
    // Start the report log from this run only
    LOG_COLLECTOR.drain();

    let proficiency = prepare_proficiency(
        &options.staar_input_a,
        &options.staar_input_b,
        &options.schema.proficiency,
        options.delimiter,
    )?;
    let finance = prepare_finance(
        &options.finance_input,
        &options.schema.finance,
        options.delimiter,
    )?;

    write_output(&proficiency.output.table, &options.staar_output, options.delimiter)?;
    write_output(&finance.output.table, &options.finance_output, options.delimiter)?;

    let quality = QualityReport::default()
        .with_proficiency(&proficiency.output, proficiency.issues)
        .with_finance(&finance.output, finance.issues);

    if quality.is_clean() {
        log_success("No data-quality issues");
    } else {
        log_warning("Outputs written with data-quality issues, see report");
    }

    let mut inputs = proficiency.inputs;
    inputs.extend(finance.inputs);

    let report = RunReport {
        target_year: options.schema.proficiency.target_year,
        inputs,
        proficiency_output: FileInfo::output(&options.staar_output, &proficiency.output.table),
        finance_output: FileInfo::output(&options.finance_output, &finance.output.table),
        quality,
        log: LOG_COLLECTOR.drain(),
    };

    if let Some(ref path) = options.report_path {
        let json = serde_json::to_string_pretty(&report)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        log_success(format!("💾 Report saved to: {}", path.display()));
    }

    Ok(report)
}

fn write_output(table: &Table, path: &Path, delimiter: u8) -> PipelineResult<()> {
    write_table(table, path, delimiter)?;
    log_success(format!("💾 Saved to: {}", path.display()));
    Ok(())
}

fn read_input(path: &Path, delimiter: u8) -> PipelineResult<ParseResult> {
    let parsed = read_table(path, delimiter)?;
    let (rows, columns) = parsed.table.shape();
    log_success(format!(
        "{}: {} rows, {} columns ({})",
        path.display(),
        rows,
        columns,
        parsed.encoding
    ));
    Ok(parsed)
}

/// Log validation issues and hand them on to the quality report.
fn report_validation(stage: &str, result: Result<(), Vec<String>>) -> Vec<String> {
    match result {
        Ok(()) => {
            log_success(format!("✔️  {} output valid", stage));
            Vec::new()
        }
        Err(issues) => {
            log_warning(format!("{} output has {} issue(s)", stage, issues.len()));
            for issue in issues.iter().take(5) {
                log_error(issue.clone());
            }
            issues
        }
    }
}
