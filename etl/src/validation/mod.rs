//! Output checks and the data-quality report.
//!
//! The transforms never fail on data-quality conditions; they count them.
//! This module checks the finished tables against the shape downstream joins
//! expect and gathers every counter into one [`QualityReport`].
//!
//! # Checks
//!
//! ## Proficiency
//! - Columns are exactly `District, Proficiency, Rate`
//! - `District` is six digits
//! - `Rate` is empty or a number in `0..=100`
//! - One row per (District, Proficiency)
//!
//! ## Finance
//! - First column is `District`, six digits, unique per row
//! - No general-fund or `ALL FUNDS-` column survived

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

use crate::models::Table;
use crate::schema::{FinanceSchema, ProficiencySchema};
use crate::transform::{FinanceOutput, ProficiencyOutput};

static DISTRICT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").expect("static regex"));

/// Issues past this many are summarized in one line.
const MAX_ISSUES: usize = 20;

/// Check a district proficiency table.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` listing the issues otherwise
pub fn validate_proficiency_table(
    table: &Table,
    schema: &ProficiencySchema,
) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();

    let expected = [
        schema.district_label.as_str(),
        schema.proficiency_label.as_str(),
        schema.rate_label.as_str(),
    ];
    if table.headers() != expected {
        issues.push(format!(
            "Expected columns [{}], found [{}]",
            expected.join(", "),
            table.headers().join(", ")
        ));
        return Err(issues);
    }

    let mut seen = HashSet::new();
    for (i, row) in table.rows().iter().enumerate() {
        let (district, proficiency, rate) = (&row[0], &row[1], &row[2]);

        if !DISTRICT_ID.is_match(district) {
            issues.push(format!("Row {}: district '{}' is not six digits", i + 1, district));
        }
        if !rate.is_empty() {
            match rate.parse::<f64>() {
                Ok(r) if (0.0..=100.0).contains(&r) => {}
                _ => issues.push(format!("Row {}: rate '{}' outside 0-100", i + 1, rate)),
            }
        }
        if !seen.insert((district.as_str(), proficiency.as_str())) {
            issues.push(format!(
                "Row {}: duplicate district/proficiency pair ({}, {})",
                i + 1,
                district,
                proficiency
            ));
        }
    }

    finish(issues)
}

/// Check a curated finance table.
pub fn validate_finance_table(table: &Table, schema: &FinanceSchema) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();

    let district_label = schema
        .labels
        .iter()
        .find(|l| l.source == schema.district_alias)
        .map(|l| l.label.as_str())
        .unwrap_or(schema.district_alias.as_str());

    match table.headers().first() {
        Some(first) if first == district_label => {}
        other => {
            issues.push(format!(
                "First column should be '{}', found {:?}",
                district_label, other
            ));
            return Err(issues);
        }
    }

    for header in table.headers() {
        if header.to_lowercase().starts_with("gen") {
            issues.push(format!("General-fund column survived: '{}'", header));
        }
        if !schema.all_funds_prefix.is_empty() && header.contains(&schema.all_funds_prefix) {
            issues.push(format!("Prefix not stripped: '{}'", header));
        }
    }

    let mut seen = HashSet::new();
    for (i, row) in table.rows().iter().enumerate() {
        let district = &row[0];
        if !DISTRICT_ID.is_match(district) {
            issues.push(format!("Row {}: district '{}' is not six digits", i + 1, district));
        }
        if !seen.insert(district.as_str()) {
            issues.push(format!("Row {}: district '{}' appears twice", i + 1, district));
        }
    }

    finish(issues)
}

fn finish(mut issues: Vec<String>) -> Result<(), Vec<String>> {
    if issues.is_empty() {
        return Ok(());
    }
    if issues.len() > MAX_ISSUES {
        let extra = issues.len() - MAX_ISSUES;
        issues.truncate(MAX_ISSUES);
        issues.push(format!("... and {} more", extra));
    }
    Err(issues)
}

/// Everything a human should look at before trusting the outputs.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub duplicates_removed: usize,
    pub skipped_rows: usize,
    pub zero_denominators: usize,
    pub dropped_finance_columns: usize,
    pub unlabeled_columns: Vec<String>,
    pub duplicate_labels: Vec<String>,
    pub proficiency_issues: Vec<String>,
    pub finance_issues: Vec<String>,
}

impl QualityReport {
    pub fn with_proficiency(mut self, out: &ProficiencyOutput, issues: Vec<String>) -> Self {
        self.duplicates_removed = out.duplicates_removed;
        self.skipped_rows = out.skipped_rows;
        self.zero_denominators = out.zero_denominators;
        self.proficiency_issues = issues;
        self
    }

    pub fn with_finance(mut self, out: &FinanceOutput, issues: Vec<String>) -> Self {
        self.dropped_finance_columns = out.dropped_columns;
        self.unlabeled_columns = out.unlabeled_columns.clone();
        self.duplicate_labels = out.duplicate_labels.clone();
        self.finance_issues = issues;
        self
    }

    /// True when nothing needs a second look.
    pub fn is_clean(&self) -> bool {
        self.skipped_rows == 0
            && self.zero_denominators == 0
            && self.unlabeled_columns.is_empty()
            && self.duplicate_labels.is_empty()
            && self.proficiency_issues.is_empty()
            && self.finance_issues.is_empty()
    }
}
