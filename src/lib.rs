pub mod cli;
pub mod data;
pub mod infer;
pub mod io_utils;
pub mod reconcile;
pub mod rows;
pub mod schema;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, OutputFormat},
    reconcile::LogFacade,
    rows::RowBatch,
    schema::{Schema, earthquake_schema},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("quake_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Reconcile(args) => handle_reconcile(&args),
        Commands::Schema(args) => handle_schema(&args),
    }
}

fn load_batch(input: &Path, delimiter: Option<u8>, encoding: Option<&str>) -> Result<RowBatch> {
    let delimiter = io_utils::resolve_input_delimiter(input, delimiter);
    let encoding = io_utils::resolve_encoding(encoding)?;
    info!(
        "Reading '{}' with delimiter '{}'",
        input.display(),
        printable_delimiter(delimiter)
    );
    let reader = io_utils::open_input(input)?;
    RowBatch::from_reader(reader, delimiter, encoding)
        .with_context(|| format!("Parsing CSV from {input:?}"))
}

fn emit_schema(schema: &Schema, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) if !io_utils::is_dash(path) => schema
            .save(path)
            .with_context(|| format!("Writing schema to {path:?}")),
        _ => {
            print!("{}", schema.to_yaml_string()?);
            Ok(())
        }
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let batch = load_batch(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
    )?;
    let schema = infer::infer_schema(&batch);
    for column in &schema.columns {
        debug!("Column '{}' inferred as {}", column.name, column.datatype);
    }
    emit_schema(&schema, args.output.as_deref())?;
    info!(
        "Inferred schema for {} column(s) from {} row(s)",
        schema.len(),
        batch.len()
    );
    Ok(())
}

fn handle_reconcile(args: &cli::ReconcileArgs) -> Result<()> {
    let expected = match &args.schema {
        Some(path) => {
            Schema::load(path).with_context(|| format!("Loading schema from {path:?}"))?
        }
        None => earthquake_schema(),
    };
    let batch = load_batch(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
    )?;
    let row_count = batch.len();
    let reconciled = rows::reconcile_batch(batch, &expected, &LogFacade)
        .with_context(|| format!("Reconciling {:?} against expected schema", args.input))?;

    for column in reconciled.summary.widened() {
        debug!("Widened column '{column}' to float64");
    }
    info!(
        "Reconciled {} row(s): {} column(s) widened, {} column(s) converted",
        row_count,
        reconciled.summary.widened().count(),
        reconciled.summary.converted().count()
    );

    let output = io_utils::open_output(args.output.as_deref())?;
    match args.format {
        OutputFormat::Csv => {
            let mut writer = io_utils::csv_writer(output, b',');
            rows::write_csv(&reconciled.batch, &mut writer)?;
        }
        OutputFormat::Jsonl => rows::write_json_lines(&reconciled.batch, output)?,
    }
    if let Some(path) = &args.output {
        info!("Wrote {row_count} row(s) to {path:?}");
    }
    Ok(())
}

fn handle_schema(args: &cli::SchemaArgs) -> Result<()> {
    let schema = earthquake_schema();
    emit_schema(&schema, args.output.as_deref())?;
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
