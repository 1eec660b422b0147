use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use grant_wrangler::config::{resolve_encoding, ConfigFile, PipelineConfig};
use grant_wrangler::constants;
use grant_wrangler::logging;
use grant_wrangler::parser::{find_field_windows, windows_to_row, HtmlTextExtractor, TextExtractor};
use grant_wrangler::pipeline::ingestion::{load_source, SourceOutcome};
use grant_wrangler::pipeline::processing::program::score_program_table;
use grant_wrangler::pipeline::processing::scoring::ScoreWeights;
use grant_wrangler::pipeline::storage::{persist_all, Artifact, CsvTableWriter, OutputTable, TableWriter};
use grant_wrangler::{OutputTargets, Pipeline, WranglerError};

#[derive(Parser)]
#[command(name = "grant-wrangler")]
#[command(about = "Wrangle many grant exports into one clean, scored master table")]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Also write JSON logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map, score, deduplicate and filter every CSV/TSV in a folder
    Wrangle(WrangleArgs),
    /// Score a program/accelerator dataset
    Program {
        /// Path to the programs CSV/TSV
        csv: PathBuf,
        /// Output path; prints the scored table when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Evaluation date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Turn one saved HTML grant page into a canonical row
    Extract {
        /// Path to the HTML page
        #[arg(long)]
        html: PathBuf,
        /// One-row canonical CSV output
        #[arg(long)]
        out: PathBuf,
        /// Optional JSON copy of the row
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

#[derive(Args)]
struct WrangleArgs {
    /// Folder containing .csv/.tsv/.tab files
    #[arg(long, default_value = constants::DEFAULT_INPUT_DIR)]
    input: PathBuf,

    /// Output master CSV path
    #[arg(long, default_value = constants::DEFAULT_OUTPUT_CSV)]
    out: PathBuf,

    /// Optional spreadsheet mirror of the master table
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// Weights: relevance fit ease
    #[arg(long, num_args = 3, value_names = ["RELEVANCE", "FIT", "EASE"], allow_negative_numbers = true)]
    weights: Option<Vec<f64>>,

    /// Keep items with Deadline >= this date (YYYY-MM-DD) or 'today'
    #[arg(long)]
    deadline_cutoff: Option<String>,

    /// Abort on the first unreadable, empty or header-less file
    #[arg(long)]
    strict: bool,

    /// Print a quick summary to stdout
    #[arg(long)]
    print_summary: bool,

    /// Rows shown in the summary
    #[arg(long)]
    top: Option<usize>,

    /// Text encoding of the input files
    #[arg(long)]
    encoding: Option<String>,

    /// Evaluation date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    as_of: Option<String>,

    /// TOML file with weights, cutoff, encoding and extra header aliases
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_as_of(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| WranglerError::Config(format!("invalid --as-of '{}': {}", value, e)).into())
}

fn build_config(args: &WrangleArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();
    if let Some(path) = &args.config {
        config = config.apply_file(ConfigFile::load(path)?)?;
    }
    if let Some(weights) = &args.weights {
        config = config.with_weights(ScoreWeights::from_slice(weights)?);
    }
    if let Some(cutoff) = &args.deadline_cutoff {
        config = config.with_cutoff(cutoff.clone());
    }
    if args.strict {
        config = config.with_strict(true);
    }
    if let Some(label) = &args.encoding {
        config = config.with_encoding(resolve_encoding(label)?);
    }
    if let Some(as_of) = &args.as_of {
        config = config.with_as_of(parse_as_of(as_of)?);
    }
    if let Some(top) = args.top {
        config.top_n = top;
    }
    Ok(config)
}

fn run_wrangle(args: WrangleArgs) -> Result<()> {
    let config = build_config(&args)?;
    let top_n = config.top_n;
    info!(
        input = %args.input.display(),
        out = %args.out.display(),
        as_of = %config.as_of,
        strict = config.strict,
        "starting wrangle"
    );

    let pipeline = Pipeline::new(config);
    let result = pipeline.run(&args.input)?;

    let targets = OutputTargets {
        csv: args.out.clone(),
        xlsx: args.xlsx.clone(),
    };
    let written = pipeline.write(&result, &targets)?;
    info!(
        rows = result.records.len(),
        files = written.files.len(),
        sha256 = %written.csv_sha256,
        "wrangle complete"
    );

    if args.print_summary {
        print!("{}", result.summary(top_n, Some(written.csv_sha256)));
    }
    Ok(())
}

fn run_program(path: &Path, out: Option<&Path>, as_of: Option<&str>) -> Result<()> {
    let as_of = match as_of {
        Some(value) => parse_as_of(value)?,
        None => PipelineConfig::default().as_of,
    };

    let mut table = match load_source(path, encoding_rs::UTF_8) {
        SourceOutcome::Loaded(table) => table,
        SourceOutcome::Skipped(skip) => {
            return Err(WranglerError::SourceRejected {
                path: skip.path,
                reason: skip.reason,
            }
            .into())
        }
    };

    let scores = score_program_table(&mut table, as_of);
    info!(rows = scores.len(), "scored programs");

    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().context("flushing program table")?;

    match out {
        Some(path) => persist_all(&[Artifact {
            path: path.to_path_buf(),
            bytes,
        }])?,
        None => io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

fn run_extract(html: &Path, out: &Path, json: Option<&Path>) -> Result<()> {
    let bytes = fs::read(html).with_context(|| format!("reading {}", html.display()))?;
    let text = HtmlTextExtractor.extract_text(&bytes)?;
    let windows = find_field_windows(&text);
    info!(page = %html.display(), fields = windows.len(), "keyword windows found");

    let row = windows_to_row(&windows, &html.display().to_string());
    let pipeline = Pipeline::new(PipelineConfig::default());
    let records = pipeline.score_rows(vec![row]);

    let table = OutputTable::from_records(&records, &[]);
    let mut artifacts = vec![Artifact {
        path: out.to_path_buf(),
        bytes: CsvTableWriter.render(&table)?,
    }];
    if let (Some(path), Some(record)) = (json, records.first()) {
        artifacts.push(Artifact {
            path: path.to_path_buf(),
            bytes: serde_json::to_vec_pretty(record)?,
        });
    }
    persist_all(&artifacts)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Wrangle(args) => run_wrangle(args),
        Commands::Program { csv, out, as_of } => run_program(&csv, out.as_deref(), as_of.as_deref()),
        Commands::Extract { html, out, json } => run_extract(&html, &out, json.as_deref()),
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    // dropped on return, which flushes the file log
    let _guard = logging::init_logging(cli.verbose, cli.log_dir.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
