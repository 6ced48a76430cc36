//! Campus-to-district roll-up of STAAR proficiency records.
//!
//! # Flow
//!
//! ```text
//! campstaar1 ─┐
//!             ├─▶ union ─▶ pad campus ─▶ dedup ─▶ Σ num / Σ den per group ─▶ all/all/all slice ─▶ rate ─▶ 2019
//! campstaar2 ─┘
//! ```
//!
//! Counts are summed, never averaged, so large and small campuses weigh in
//! proportion to the students they tested.
//!
//! Campus numbers and years are put in canonical form before duplicates are
//! collapsed, so `1902001` and `001902001` (or `2019` and `2019.0`) are the
//! same record. Every other cell is compared as text.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{parse_count, parse_year, round_half_even};
use crate::error::{TransformError, TransformResult};
use crate::logs::{log_info, log_success, log_warning, log_warning_indent};
use crate::models::Table;
use crate::schema::{zero_pad, ProficiencySchema};

/// District-level proficiency table plus what was discarded on the way.
#[derive(Debug, Clone, Serialize)]
pub struct ProficiencyOutput {
    /// `District, Proficiency, Rate`
    pub table: Table,
    /// Exact duplicate rows collapsed after the union
    pub duplicates_removed: usize,
    /// Rows skipped because a grouping field was empty
    pub skipped_rows: usize,
    /// Output rows whose rate is missing because nobody was tested
    pub zero_denominators: usize,
}

/// (test_year, district, grade_level, subject, proficiency, demog)
type GroupKey = (i64, String, String, String, String, String);

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    numerator: f64,
    denominator: f64,
}

/// Aggregate two campus-level STAAR tables to district proficiency rates.
///
/// Both tables must carry every column [`ProficiencySchema::required_columns`]
/// names. The result holds one row per (District, Proficiency) for the
/// schema's target year and `all` slice, ordered by district then category.
pub fn aggregate_proficiency(
    table_a: &Table,
    table_b: &Table,
    schema: &ProficiencySchema,
) -> TransformResult<ProficiencyOutput> {
    let required = schema.required_columns();
    table_a.require_columns(&required)?;
    table_b.require_columns(&required)?;
    check_numbers(table_a, schema)?;
    check_numbers(table_b, schema)?;

    let mut df = table_a.concat(table_b);
    df.map_column(&schema.campus_column, |campus| {
        let campus = campus.trim();
        if campus.is_empty() {
            String::new()
        } else {
            zero_pad(campus, schema.campus_width)
        }
    })?;
    df.map_column(&schema.year_column, |year| {
        parse_year(year).map_or_else(|| year.to_string(), |y| y.to_string())
    })?;

    let duplicates_removed = df.dedup();
    if duplicates_removed > 0 {
        log_info(format!("Collapsed {} duplicate rows", duplicates_removed));
    }

    df.drop_columns(&schema.metadata_columns)?;
    df.drop_columns([&schema.legacy_rate_column])?;

    let (groups, skipped_rows) = group_counts(&df, schema)?;
    if skipped_rows > 0 {
        log_warning(format!(
            "{} rows skipped with an empty grouping field",
            skipped_rows
        ));
    }

    let mut rows = Vec::new();
    let mut zero_denominators = 0;

    for ((year, district, grade, subject, proficiency, demog), counts) in &groups {
        let in_slice = *grade == schema.all_grades
            && *subject == schema.all_subjects
            && *demog == schema.all_students;
        if !in_slice || *year != schema.target_year {
            continue;
        }

        let rate = if counts.denominator == 0.0 {
            zero_denominators += 1;
            log_warning_indent(
                format!("District {} / {}: zero denominator, rate left empty", district, proficiency),
                1,
            );
            String::new()
        } else {
            let value = round_half_even(
                counts.numerator / counts.denominator * 100.0,
                schema.rate_decimals,
            );
            format!("{:.*}", schema.rate_decimals as usize, value)
        };

        rows.push(vec![district.clone(), proficiency.clone(), rate]);
    }

    if zero_denominators > 0 {
        log_warning(format!("{} district rates undefined (zero denominator)", zero_denominators));
    }

    let table = Table::new(
        vec![
            schema.district_label.clone(),
            schema.proficiency_label.clone(),
            schema.rate_label.clone(),
        ],
        rows,
    )
    .with_name("proficiency");

    let (n_rows, n_cols) = table.shape();
    log_success(format!("Proficiency table: ({}, {})", n_rows, n_cols));

    Ok(ProficiencyOutput {
        table,
        duplicates_removed,
        skipped_rows,
        zero_denominators,
    })
}

/// Reject a year or count that is not a number, naming the input table and
/// its 1-based data row. Empty cells pass: an empty year is skipped later and
/// an empty count sums as zero.
fn check_numbers(table: &Table, schema: &ProficiencySchema) -> TransformResult<()> {
    let year = table.require_column(&schema.year_column)?;
    let counts = [
        (table.require_column(&schema.numerator_column)?, &schema.numerator_column),
        (table.require_column(&schema.denominator_column)?, &schema.denominator_column),
    ];
    let invalid = |column: &str, i: usize, value: &str| TransformError::InvalidNumber {
        table: table.name().to_string(),
        column: column.to_string(),
        row: i + 1,
        value: value.to_string(),
    };

    for (i, row) in table.rows().iter().enumerate() {
        let value = &row[year];
        if !value.trim().is_empty() && parse_year(value).is_none() {
            return Err(invalid(schema.year_column.as_str(), i, value.as_str()));
        }
        for (idx, column) in counts {
            if parse_count(&row[idx]).is_none() {
                return Err(invalid(column.as_str(), i, row[idx].as_str()));
            }
        }
    }
    Ok(())
}

/// Sum numerator and denominator per group key.
///
/// Rows with an empty key field cannot be grouped and are counted instead.
fn group_counts(
    df: &Table,
    schema: &ProficiencySchema,
) -> TransformResult<(BTreeMap<GroupKey, Counts>, usize)> {
    let year = df.require_column(&schema.year_column)?;
    let campus = df.require_column(&schema.campus_column)?;
    let grade = df.require_column(&schema.grade_column)?;
    let subject = df.require_column(&schema.subject_column)?;
    let proficiency = df.require_column(&schema.proficiency_column)?;
    let demog = df.require_column(&schema.demog_column)?;
    let numerator = df.require_column(&schema.numerator_column)?;
    let denominator = df.require_column(&schema.denominator_column)?;

    let mut groups: BTreeMap<GroupKey, Counts> = BTreeMap::new();
    let mut skipped = 0;

    for row in df.rows() {
        let keys = [
            &row[year],
            &row[campus],
            &row[grade],
            &row[subject],
            &row[proficiency],
            &row[demog],
        ];
        if keys.iter().any(|k| k.trim().is_empty()) {
            skipped += 1;
            continue;
        }

        let (Some(test_year), Some(num), Some(den)) = (
            parse_year(&row[year]),
            parse_count(&row[numerator]),
            parse_count(&row[denominator]),
        ) else {
            skipped += 1;
            continue;
        };

        let district: String = row[campus].chars().take(schema.district_width).collect();
        let key = (
            test_year,
            district,
            row[grade].clone(),
            row[subject].clone(),
            row[proficiency].clone(),
            row[demog].clone(),
        );

        let entry = groups.entry(key).or_default();
        entry.numerator += num;
        entry.denominator += den;
    }

    Ok((groups, skipped))
}
