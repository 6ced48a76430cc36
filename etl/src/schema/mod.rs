//! Dataset-vintage configuration.
//!
//! Every column name, column range, prefix and label the transforms rely on
//! lives here as the `Default` of a serde struct. The defaults describe the
//! 2012-2019 tidy STAAR campus files and the 2007-2021 summarized PEIMS
//! financial file. A newer vintage is a JSON override, not a code change:
//!
//! ```rust,ignore
//! let schema = EtlSchema::load("schema-2021.json")?;
//! ```
//!
//! Fields absent from an override keep their default.

pub mod operations;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{SchemaError, SchemaResult};

pub use operations::{apply_all, zero_pad, DistrictPolicy, NameOp};

/// Year both outputs are restricted to.
pub const DEFAULT_TARGET_YEAR: i64 = 2019;

/// Inclusive run of columns, named by its first and last column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub start: String,
    pub end: String,
}

impl ColumnRange {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// Source column name to output label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLabel {
    pub source: String,
    pub label: String,
}

// =============================================================================
// Proficiency (STAAR)
// =============================================================================

/// Columns and slice sentinels of the campus-level STAAR files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProficiencySchema {
    pub campus_column: String,
    pub year_column: String,
    pub grade_column: String,
    pub subject_column: String,
    pub proficiency_column: String,
    pub demog_column: String,
    pub numerator_column: String,
    pub denominator_column: String,

    /// Release metadata, dropped after de-duplication
    pub metadata_columns: Vec<String>,
    /// Precomputed rate, dropped and recomputed at district level
    pub legacy_rate_column: String,

    pub campus_width: usize,
    /// Leading characters of a campus number that form its district
    pub district_width: usize,

    pub all_grades: String,
    pub all_subjects: String,
    pub all_students: String,

    pub target_year: i64,
    pub rate_decimals: u32,

    pub district_label: String,
    pub proficiency_label: String,
    pub rate_label: String,
}

impl Default for ProficiencySchema {
    fn default() -> Self {
        Self {
            campus_column: "campus_number".into(),
            year_column: "test_year".into(),
            grade_column: "grade_level".into(),
            subject_column: "subject".into(),
            proficiency_column: "proficiency".into(),
            demog_column: "demog".into(),
            numerator_column: "numerator".into(),
            denominator_column: "denominator".into(),
            metadata_columns: vec![
                "data_release".into(),
                "data_category".into(),
                "data_level".into(),
                "release_year".into(),
            ],
            legacy_rate_column: "new_rate".into(),
            campus_width: 9,
            district_width: 6,
            all_grades: "all".into(),
            all_subjects: "all_subjects".into(),
            all_students: "all_students".into(),
            target_year: DEFAULT_TARGET_YEAR,
            rate_decimals: 2,
            district_label: "District".into(),
            proficiency_label: "Proficiency".into(),
            rate_label: "Rate".into(),
        }
    }
}

impl ProficiencySchema {
    /// Every column an input file must carry.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols = vec![
            self.campus_column.as_str(),
            self.year_column.as_str(),
            self.grade_column.as_str(),
            self.subject_column.as_str(),
            self.proficiency_column.as_str(),
            self.demog_column.as_str(),
            self.numerator_column.as_str(),
            self.denominator_column.as_str(),
            self.legacy_rate_column.as_str(),
        ];
        cols.extend(self.metadata_columns.iter().map(String::as_str));
        cols
    }
}

// =============================================================================
// Finance (PEIMS)
// =============================================================================

/// Columns, rollup ranges and labels of the summarized PEIMS file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceSchema {
    pub name_column: String,
    pub district_column: String,
    pub year_column: String,

    /// Revenue block, dropped before any renaming
    pub revenue_ranges: Vec<ColumnRange>,

    /// Columns matching this pattern hold general-fund-only figures
    pub general_fund_pattern: String,
    /// Prefix removed from the surviving all-funds columns
    pub all_funds_prefix: String,

    pub district_width: usize,
    pub district_policy: DistrictPolicy,

    /// Subtotal rollups, named after the prefix is stripped
    pub rollup_ranges: Vec<ColumnRange>,

    /// Intermediate name of the district column during cleanup
    pub district_alias: String,

    /// Generic label cleanup, applied in order
    pub name_ops: Vec<NameOp>,

    /// Final labels, keyed by the cleaned name
    pub labels: Vec<ColumnLabel>,

    pub target_year: i64,
}

impl Default for FinanceSchema {
    fn default() -> Self {
        Self {
            name_column: "DISTRICT NAME".into(),
            district_column: "DISTRICT NUMBER".into(),
            year_column: "YEAR".into(),
            revenue_ranges: vec![ColumnRange::new(
                "GEN FUNDS-LOCAL TAX REVENUE FROM M&O",
                "ALL FUNDS-TOTAL OPERATING, OTR, DEBT SERV FIN, AND TRS EST REVEN",
            )],
            general_fund_pattern: "(?i)^gen".into(),
            all_funds_prefix: "ALL FUNDS-".into(),
            district_width: 6,
            district_policy: DistrictPolicy::default(),
            rollup_ranges: vec![
                ColumnRange::new(
                    "TOTAL OPERATING EXPENDITURES BY OBJ",
                    "TOTAL NON-OPER AND OPER OEXPENDITURES BY OBJ",
                ),
                ColumnRange::new(
                    "TOTAL OPERATE EXPEND BY FUNCTION",
                    "TOT OPER AND NON-OPER EXP BY FUNCTION",
                ),
                ColumnRange::new("TOTAL PROGRAM OPERATING EXPENDITURES", "EINTRAN4"),
                ColumnRange::new("INTERGOVERN CHARGES EXPEND", "FALL SURVEY ENROLLMENT"),
            ],
            district_alias: "DISTRICT".into(),
            name_ops: vec![
                NameOp::remove("EXPENDITURES"),
                NameOp::remove("EXPEND"),
                NameOp::remove("EXP"),
                NameOp::remove("TOTAL"),
                NameOp::remove("FCT"),
                NameOp::replace("--", "-"),
                NameOp::replace(" , ", ","),
                NameOp::Trim,
            ],
            labels: default_labels(),
            target_year: DEFAULT_TARGET_YEAR,
        }
    }
}

fn default_labels() -> Vec<ColumnLabel> {
    [
        ("DISTRICT", "District"),
        ("PAYROLL", "Payroll"),
        ("PROFESSIONAL & CONTRACTED SERVICES", "Professional & Contracted"),
        ("SUPPLIES & MATERIALS", "Supplies & Materials"),
        ("OTHER OPERATING", "Other Operating"),
        ("INSTRUCTION + TRANSFER -11,95", "Instruction & Transfer"),
        ("INSTRUC RESOURCE MEDIA SERVICE, 12", "Instructional Resource Media"),
        ("CURRICULUM/STAFF DEVELOPMENT,13", "Curriculum/Staff Development"),
        ("INSTRUC LEADERSHIP,21", "Instructional Leadership"),
        ("CAMPUS ADMINISTRATION,23", "Campus Administration"),
        ("GUIDANCE 7 COUNSELING SERVICES,31", "Guidance & Counseling"),
        ("SOCIAL WORK SERVICES,32", "Social Work"),
        ("HEALTH SERVICES,33", "Health Services"),
        ("TRANSPORTATION,34", "Transportation"),
        ("FOOD SERVICE,35", "Food Service"),
        ("EXTRACURRICULAR ,36", "Extracurricular"),
        ("GENERAL ADMINISTRAT -41,80,92", "General Administration"),
        ("PLANT MAINTENANCE/OPERA,51", "Plant Maintenance/Operation"),
        ("SECURITY/MONITORING SERVICE,5", "Security & Monitoring"),
        ("DATA PROCESSING SERVICES, 53", "Data Processing"),
        ("COMMUNITY SERVICES, 61", "Community Services"),
        ("REGULAR PROGRAM -11", "Regular Program"),
        ("GIFTED/TALENTED PROGRAM -21", "Gifted & Talented Program"),
        ("CAREER & TECHNOLOGY PGM -22", "Career & Technology Program"),
        ("STUDENTS WITH DISABILITIES PGM -23", "Students with Disabilities"),
        ("STATE COMPENSATORY ED -24, 29, 30, 34", "State Compensatory Education"),
        ("BILINGUAL PROGRAM -25", "Bilingual Program"),
        ("HIGH SCHOOL ALLOTMENT PROGRAM-91", "High School Allotment"),
        ("PREKINDERGARTEN-32,35", "Pre-K"),
        ("PREKINDERGARTEN  BILINGUAL-32", "Pre-K Bilingual"),
        ("PREKINDERGARTEN  COMP ED-32", "Pre-K Comp Ed"),
        ("PREKINDERGARTEN  REGULAR-32", "Pre-K Regular"),
        ("PREKINDERGARTEN  SPECIAL ED-32", "Pre-K Special Education"),
        ("ATHLETICS PROGRAM-91", "Athletics Program"),
        ("UNDISTRIBUTED PROGRAM -99", "Undistributed Program"),
        ("OTHER USES", "Other Uses"),
    ]
    .into_iter()
    .map(|(source, label)| ColumnLabel {
        source: source.to_string(),
        label: label.to_string(),
    })
    .collect()
}

impl FinanceSchema {
    /// Label lookup keyed by cleaned source name.
    pub fn label_map(&self) -> HashMap<String, String> {
        self.labels
            .iter()
            .map(|l| (l.source.clone(), l.label.clone()))
            .collect()
    }

    pub fn general_fund_regex(&self) -> SchemaResult<regex::Regex> {
        regex::Regex::new(&self.general_fund_pattern).map_err(|e| SchemaError::InvalidPattern {
            pattern: self.general_fund_pattern.clone(),
            message: e.to_string(),
        })
    }
}

// =============================================================================
// Combined schema
// =============================================================================

/// Both dataset schemas, as loaded from an override file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlSchema {
    pub proficiency: ProficiencySchema,
    pub finance: FinanceSchema,
}

impl EtlSchema {
    /// Parse a schema from JSON string
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let schema: Self = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load a schema override file
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Override the target year of both datasets.
    pub fn with_target_year(mut self, year: i64) -> Self {
        self.proficiency.target_year = year;
        self.finance.target_year = year;
        self
    }

    /// Check every configured pattern compiles.
    pub fn validate(&self) -> SchemaResult<()> {
        self.finance.general_fund_regex()?;
        for op in &self.finance.name_ops {
            op.validate()?;
        }
        Ok(())
    }
}
