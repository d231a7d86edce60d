use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use qcwatch::export::{export_to_file, report_json, write_summary};
use qcwatch::{DataSource, FileSource, Pipeline, QcConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "qcwatch")]
#[command(about = "Run quality control checks over time-series data")]
struct Args {
    /// Path to the JSON data file
    #[arg(short, long)]
    data: PathBuf,

    /// QC plan (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// System name for the data columns, overriding the plan
    #[arg(short, long)]
    system: Option<String>,

    /// Export the report to a JSON file; printed to stdout when absent
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Compute one QCI for the whole run instead of one per day
    #[arg(long)]
    overall: bool,

    /// Log filter used when RUST_LOG is unset (e.g., "info", "qcwatch_core=debug")
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let mut config = match &args.config {
        Some(path) => QcConfig::load(path)?,
        None => QcConfig::default(),
    };
    if let Some(system) = args.system {
        config.system_name = Some(system);
    }

    let mut source = FileSource::new(&args.data);
    let frame = source.load()?;
    info!("Loaded {} rows, {} columns from {}", frame.n_rows(), frame.n_cols(), source.description());

    let report = Pipeline::new(config).run(frame, !args.overall)?;

    match &args.export {
        Some(path) => {
            export_to_file(&report, path)?;
            write_summary(&report, &mut io::stdout().lock())?;
            println!("Exported report to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report_json(&report))?),
    }
    Ok(())
}
