//! PEIMS finance table curation.
//!
//! The summarized PEIMS file reports every expenditure category twice
//! (general fund only and all funds) next to subtotal rollups of those same
//! categories. This module keeps one all-funds figure per category for the
//! target year and gives each surviving column a readable label.
//!
//! The order of steps matters: the general-fund filter must run before the
//! `ALL FUNDS-` prefix is stripped (otherwise `GENERAL ADMINISTRAT` would be
//! taken for a general-fund column), and the rollup ranges are named by
//! their stripped labels.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::parse_year;
use crate::error::TransformResult;
use crate::logs::{log_info, log_success, log_warning, log_warning_indent};
use crate::models::Table;
use crate::schema::{apply_all, FinanceSchema};

/// Curated finance table plus a trace of what was pruned.
#[derive(Debug, Clone, Serialize)]
pub struct FinanceOutput {
    /// `District` followed by the labeled expenditure columns
    pub table: Table,
    /// Columns removed by range, name or general-fund filter
    pub dropped_columns: usize,
    /// Columns that kept a generically cleaned name with no label
    pub unlabeled_columns: Vec<String>,
    /// Labels shared by more than one column after cleanup
    pub duplicate_labels: Vec<String>,
}

/// Prune and relabel the PEIMS finance table for one year.
pub fn reshape_finance(input: &Table, schema: &FinanceSchema) -> TransformResult<FinanceOutput> {
    let general_fund = schema.general_fund_regex()?;
    input.require_columns([
        &schema.name_column,
        &schema.district_column,
        &schema.year_column,
    ])?;

    let mut df = input.clone();
    let mut dropped_columns = 0;

    df.drop_columns([&schema.name_column])?;
    dropped_columns += 1;

    for range in &schema.revenue_ranges {
        dropped_columns += df.drop_range(&range.start, &range.end)?.len();
    }

    let year_idx = df.require_column(&schema.year_column)?;
    df.retain_rows(|row| parse_year(&row[year_idx]) == Some(schema.target_year));
    df.drop_columns([&schema.year_column])?;
    log_info(format!(
        "{} district rows for {}",
        df.shape().0,
        schema.target_year
    ));

    let general = df.drop_columns_where(|name| general_fund.is_match(name));
    dropped_columns += general.len();
    log_info(format!("Dropped {} general-fund columns", general.len()));

    if !schema.all_funds_prefix.is_empty() {
        df.rename_headers(|name| name.replace(schema.all_funds_prefix.as_str(), ""));
    }

    df.map_column(&schema.district_column, |raw| {
        schema.district_policy.apply(raw, schema.district_width)
    })?;

    for range in &schema.rollup_ranges {
        dropped_columns += df.drop_range(&range.start, &range.end)?.len();
    }

    df.rename_columns(&HashMap::from([(
        schema.district_column.clone(),
        schema.district_alias.clone(),
    )]));
    df.rename_headers(|name| apply_all(&schema.name_ops, name));

    let labels = schema.label_map();
    df.rename_columns(&labels);

    let known: HashSet<&str> = labels.values().map(String::as_str).collect();
    let unlabeled_columns: Vec<String> = df
        .headers()
        .iter()
        .filter(|h| !known.contains(h.as_str()))
        .cloned()
        .collect();
    if !unlabeled_columns.is_empty() {
        log_warning(format!(
            "{} columns kept without a label:",
            unlabeled_columns.len()
        ));
        for name in &unlabeled_columns {
            log_warning_indent(format!("'{}'", name), 1);
        }
    }

    let duplicate_labels = df.duplicate_headers();
    for name in &duplicate_labels {
        log_warning(format!("Column label '{}' appears more than once", name));
    }

    let table = df.with_name("finance");
    let (n_rows, n_cols) = table.shape();
    log_success(format!("Finance table: ({}, {})", n_rows, n_cols));

    Ok(FinanceOutput {
        table,
        dropped_columns,
        unlabeled_columns,
        duplicate_labels,
    })
}
