//! district-etl CLI - build the 2019 district STAAR and PEIMS tables
//!
//! # Commands
//!
//! ```bash
//! district-etl                         # Run both transforms with the default paths
//! district-etl run --year 2018         # Same, with overrides
//! district-etl staar a.csv b.csv       # Proficiency aggregation only
//! district-etl peims finance.csv       # Finance reshaping only
//! district-etl schema                  # Print the built-in schema as JSON
//! ```
//!
//! Every `run` option can also come from the environment (or a `.env` file):
//! `ETL_FINANCE`, `ETL_STAAR_A`, `ETL_STAAR_B`, `ETL_STAAR_OUT`,
//! `ETL_FINANCE_OUT`, `ETL_YEAR`, `ETL_SCHEMA`.

use clap::{Args, Parser, Subcommand};
use district_etl::transform::{
    DEFAULT_FINANCE_INPUT, DEFAULT_FINANCE_OUTPUT, DEFAULT_STAAR_INPUT_A, DEFAULT_STAAR_INPUT_B,
    DEFAULT_STAAR_OUTPUT,
};
use district_etl::{run_finance, run_pipeline, run_proficiency, EtlSchema, PipelineOptions};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "district-etl")]
#[command(about = "Build district-level STAAR proficiency and PEIMS finance tables", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both transforms (the default)
    Run(RunArgs),

    /// Aggregate the two STAAR campus files to district rates
    Staar {
        /// First STAAR campus file
        input_a: PathBuf,

        /// Second STAAR campus file
        input_b: PathBuf,

        /// Output file
        #[arg(short, long, default_value = DEFAULT_STAAR_OUTPUT)]
        output: PathBuf,

        #[command(flatten)]
        overrides: SchemaArgs,
    },

    /// Reshape the PEIMS finance file
    Peims {
        /// PEIMS financial file
        input: PathBuf,

        /// Output file
        #[arg(short, long, default_value = DEFAULT_FINANCE_OUTPUT)]
        output: PathBuf,

        #[command(flatten)]
        overrides: SchemaArgs,
    },

    /// Print the built-in schema as JSON (a starting point for --schema)
    Schema,
}

#[derive(Args, Clone, Debug)]
struct RunArgs {
    /// PEIMS financial file
    #[arg(long, env = "ETL_FINANCE", default_value = DEFAULT_FINANCE_INPUT)]
    finance: PathBuf,

    /// First STAAR campus file
    #[arg(long, env = "ETL_STAAR_A", default_value = DEFAULT_STAAR_INPUT_A)]
    staar_a: PathBuf,

    /// Second STAAR campus file
    #[arg(long, env = "ETL_STAAR_B", default_value = DEFAULT_STAAR_INPUT_B)]
    staar_b: PathBuf,

    /// District proficiency output
    #[arg(long, env = "ETL_STAAR_OUT", default_value = DEFAULT_STAAR_OUTPUT)]
    staar_out: PathBuf,

    /// District finance output
    #[arg(long, env = "ETL_FINANCE_OUT", default_value = DEFAULT_FINANCE_OUTPUT)]
    finance_out: PathBuf,

    /// Write a JSON run report
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    overrides: SchemaArgs,
}

#[derive(Args, Clone, Debug)]
struct SchemaArgs {
    /// Target year (default: 2019)
    #[arg(long, env = "ETL_YEAR")]
    year: Option<i64>,

    /// Schema override file (JSON)
    #[arg(long, env = "ETL_SCHEMA")]
    schema: Option<PathBuf>,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        None => cmd_run(cli.run),
        Some(Commands::Run(args)) => cmd_run(args),
        Some(Commands::Staar {
            input_a,
            input_b,
            output,
            overrides,
        }) => cmd_staar(&input_a, &input_b, &output, &overrides),
        Some(Commands::Peims {
            input,
            output,
            overrides,
        }) => cmd_peims(&input, &output, &overrides),
        Some(Commands::Schema) => cmd_schema(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_schema(args: &SchemaArgs) -> Result<EtlSchema, Box<dyn std::error::Error>> {
    let schema = match args.schema {
        Some(ref path) => {
            eprintln!("📋 Schema: {}", path.display());
            EtlSchema::load(path)?
        }
        None => EtlSchema::default(),
    };

    Ok(match args.year {
        Some(year) => schema.with_target_year(year),
        None => schema,
    })
}

fn cmd_run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = PipelineOptions {
        finance_input: args.finance,
        staar_input_a: args.staar_a,
        staar_input_b: args.staar_b,
        staar_output: args.staar_out,
        finance_output: args.finance_out,
        schema: load_schema(&args.overrides)?,
        report_path: args.report,
        ..PipelineOptions::default()
    };

    let report = run_pipeline(&options)?;

    eprintln!(
        "\n✨ Done! {} proficiency rows, {} finance rows for {}",
        report.proficiency_output.rows, report.finance_output.rows, report.target_year
    );
    Ok(())
}

fn cmd_staar(
    input_a: &Path,
    input_b: &Path,
    output: &Path,
    overrides: &SchemaArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(overrides)?;
    let (out, _) = run_proficiency(input_a, input_b, output, &schema.proficiency, b',')?;

    eprintln!(
        "\n✨ Done! {} rows ({} duplicates collapsed, {} undefined rates)",
        out.table.shape().0,
        out.duplicates_removed,
        out.zero_denominators
    );
    Ok(())
}

fn cmd_peims(
    input: &Path,
    output: &Path,
    overrides: &SchemaArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(overrides)?;
    let (out, _) = run_finance(input, output, &schema.finance, b',')?;

    eprintln!(
        "\n✨ Done! {} districts, {} columns ({} unlabeled)",
        out.table.shape().0,
        out.table.shape().1,
        out.unlabeled_columns.len()
    );
    Ok(())
}

fn cmd_schema() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", EtlSchema::default().to_json()?);
    Ok(())
}
