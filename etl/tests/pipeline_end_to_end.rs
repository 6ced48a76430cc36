//! End-to-end run over small STAAR and PEIMS files written to a temp dir.

use district_etl::{
    parse_str, read_table, run_pipeline, write_table, PipelineError, PipelineOptions, Table,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const STAAR_HEADERS: &[&str] = &[
    "data_release",
    "data_category",
    "data_level",
    "release_year",
    "campus_number",
    "test_year",
    "grade_level",
    "subject",
    "proficiency",
    "demog",
    "numerator",
    "denominator",
    "new_rate",
];

fn staar_row<'a>(campus: &'a str, year: &'a str, prof: &'a str, num: &'a str, den: &'a str) -> [&'a str; 13] {
    [
        "r2", "staar", "campus", "2019", campus, year, "all", "all_subjects", prof,
        "all_students", num, den, "",
    ]
}

fn write_staar(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let a_rows = [
        staar_row("123001", "2019", "meets", "10", "100"),
        staar_row("123001", "2018", "meets", "50", "100"),
        staar_row("456001", "2019", "meets", "0", "0"),
    ];
    let b_rows = [
        staar_row("123002", "2019", "meets", "20", "100"),
        // Same record as in the first file
        staar_row("123001", "2019", "meets", "10", "100"),
    ];

    let a = Table::from_str_rows(
        STAAR_HEADERS,
        &a_rows.iter().map(|r| &r[..]).collect::<Vec<_>>(),
    );
    let b = Table::from_str_rows(
        STAAR_HEADERS,
        &b_rows.iter().map(|r| &r[..]).collect::<Vec<_>>(),
    );

    let a_path = dir.join("in/campstaar1.csv");
    let b_path = dir.join("in/campstaar2.csv");
    write_table(&a, &a_path, b',').unwrap();
    write_table(&b, &b_path, b',').unwrap();
    (a_path, b_path)
}

fn write_peims(dir: &Path) -> std::path::PathBuf {
    let headers = [
        "DISTRICT NAME",
        "DISTRICT NUMBER",
        "YEAR",
        "GEN FUNDS-LOCAL TAX REVENUE FROM M&O",
        "ALL FUNDS-TOTAL OPERATING, OTR, DEBT SERV FIN, AND TRS EST REVEN",
        "GEN FUNDS-PAYROLL EXPENDITURES",
        "ALL FUNDS-PAYROLL EXPENDITURES",
        "ALL FUNDS-TOTAL OPERATING EXPENDITURES BY OBJ",
        "ALL FUNDS-TOTAL NON-OPER AND OPER OEXPENDITURES BY OBJ",
        "ALL FUNDS-FOOD SERVICE,35",
        "ALL FUNDS-TOTAL OPERATE EXPEND BY FUNCTION",
        "ALL FUNDS-TOT OPER AND NON-OPER EXP BY FUNCTION",
        "ALL FUNDS-REGULAR PROGRAM -11",
        "ALL FUNDS-TOTAL PROGRAM OPERATING EXPENDITURES",
        "EINTRAN4",
        "ALL FUNDS-OTHER USES",
        "ALL FUNDS-INTERGOVERN CHARGES EXPEND",
        "FALL SURVEY ENROLLMENT",
    ];
    let rows: [&[&str]; 2] = [
        &[
            "TEST ISD", "'000123", "2019", "1", "2", "3", "300", "400", "500", "40", "600",
            "700", "250", "800", "0", "5", "6", "900",
        ],
        &[
            "TEST ISD", "'000123", "2018", "1", "2", "3", "290", "400", "500", "39", "600",
            "700", "240", "800", "0", "5", "6", "880",
        ],
    ];

    let path = dir.join("in/peims.csv");
    write_table(&Table::from_str_rows(&headers, &rows), &path, b',').unwrap();
    path
}

fn options(dir: &TempDir) -> PipelineOptions {
    let (staar_a, staar_b) = write_staar(dir.path());
    PipelineOptions {
        finance_input: write_peims(dir.path()),
        staar_input_a: staar_a,
        staar_input_b: staar_b,
        staar_output: dir.path().join("inter/clean_staar_2019.csv"),
        finance_output: dir.path().join("inter/clean_peims_2019.csv"),
        report_path: Some(dir.path().join("inter/report.json")),
        ..PipelineOptions::default()
    }
}

#[test]
fn test_full_run_writes_both_tables() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);

    let report = run_pipeline(&opts).unwrap();

    let staar = fs::read_to_string(&opts.staar_output).unwrap();
    assert_eq!(
        staar,
        "District,Proficiency,Rate\n000123,meets,15.00\n000456,meets,\n"
    );

    let peims = read_table(&opts.finance_output, b',').unwrap().table;
    assert_eq!(
        peims.headers(),
        &["District", "Payroll", "Food Service", "Regular Program", "Other Uses"]
    );
    assert_eq!(peims.rows(), &[vec!["000123", "300", "40", "250", "5"]]);

    assert_eq!(report.target_year, 2019);
    assert_eq!(report.inputs.len(), 3);
    assert_eq!(report.quality.duplicates_removed, 1);
    assert_eq!(report.quality.zero_denominators, 1);
    assert!(report.quality.unlabeled_columns.is_empty());
    assert!(!report.quality.is_clean());
}

#[test]
fn test_report_written_as_json() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);

    run_pipeline(&opts).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(opts.report_path.as_ref().unwrap()).unwrap())
            .unwrap();
    assert_eq!(json["targetYear"], 2019);
    assert_eq!(json["proficiencyOutput"]["rows"], 2);
    assert_eq!(json["financeOutput"]["columns"], 5);
    assert_eq!(json["quality"]["zeroDenominators"], 1);
}

#[test]
fn test_rerun_is_identical() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);

    run_pipeline(&opts).unwrap();
    let first = fs::read_to_string(&opts.staar_output).unwrap();
    run_pipeline(&opts).unwrap();
    let second = fs::read_to_string(&opts.staar_output).unwrap();

    assert_eq!(first, second);
    assert!(parse_str(&second, b',').is_ok());
}

#[test]
fn test_schema_drift_surfaces_missing_boundary() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);

    let drifted = Table::from_str_rows(
        &["DISTRICT NAME", "DISTRICT NUMBER", "YEAR", "ALL FUNDS-PAYROLL"],
        &[&["TEST ISD", "'000123", "2019", "1"]],
    );
    write_table(&drifted, &opts.finance_input, b',').unwrap();

    let err = run_pipeline(&opts).unwrap_err();
    assert!(matches!(err, PipelineError::Transform { stage: "finance", .. }));
    assert!(err.to_string().contains("GEN FUNDS-LOCAL TAX REVENUE FROM M&O"));
    assert!(!opts.staar_output.exists());
    assert!(!opts.finance_output.exists());
}

#[test]
fn test_missing_finance_input_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let opts = PipelineOptions {
        finance_input: dir.path().join("in/missing_peims.csv"),
        ..options(&dir)
    };

    let err = run_pipeline(&opts).unwrap_err();
    assert!(matches!(err, PipelineError::Csv(_)));
    assert!(!opts.staar_output.exists());
    assert!(!opts.finance_output.exists());
    assert!(!opts.report_path.as_ref().unwrap().exists());
}

#[test]
fn test_failed_rerun_keeps_previous_outputs() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);
    run_pipeline(&opts).unwrap();
    let staar_before = fs::read_to_string(&opts.staar_output).unwrap();

    // Rerun for another year after the finance input went away
    let rerun = PipelineOptions {
        schema: opts.schema.clone().with_target_year(2018),
        ..opts.clone()
    };
    fs::remove_file(&rerun.finance_input).unwrap();

    assert!(run_pipeline(&rerun).is_err());
    assert_eq!(fs::read_to_string(&opts.staar_output).unwrap(), staar_before);
}

#[test]
fn test_report_log_holds_only_this_run() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);

    let first = run_pipeline(&opts).unwrap();
    let second = run_pipeline(&opts).unwrap();

    for report in [&first, &second] {
        let reads = report
            .log
            .iter()
            .filter(|e| e.message.contains("Reading PEIMS"))
            .count();
        assert_eq!(reads, 1);
        assert!(report.log[0].message.contains("Reading STAAR"));
    }
}
