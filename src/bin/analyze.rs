//! Command-line driver for a workspace analysis run.
//!
//! ## Usage
//!
//! ```sh
//! synthstats --workspace-dir ./ws
//! synthstats --workspace-dir ./ws --no-value-protection --max-workers 4
//! synthstats --workspace-dir ./ws --config analyze.json --log-file analyze.log
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::*;
use log::LevelFilter;

use synthstats::bridge::workspace::{read_json, Workspace};
use synthstats::stats::{TableRole, TableStats};
use synthstats::{AnalyzeConfig, LogObserver, Result};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "synthstats",
    version,
    about = "Privacy-protected column statistics over partitioned tables"
)]
struct Args {
    /// Workspace holding `OriginalData/` and receiving `ModelStore/`.
    #[arg(long)]
    workspace_dir: PathBuf,

    /// Release exact values for the target table (context tables stay protected).
    #[arg(long)]
    no_value_protection: bool,

    /// Upper bound on worker threads per partition.
    #[arg(long)]
    max_workers: Option<usize>,

    /// JSON file with an `AnalyzeConfig`; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append log output to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> std::io::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.is_test(false);
    builder.filter_level(LevelFilter::Info);
    builder.parse_default_env();

    // Custom formatter: just print the level and message
    builder.format(|buf, record| {
        writeln!(buf, "[{}] {}", record.level(), record.args())?;
        buf.flush()?;
        Ok(())
    });

    if let Some(path) = log_file {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    let _ = builder.try_init();
    Ok(())
}

fn load_config(args: &Args) -> Result<AnalyzeConfig> {
    let mut config = match &args.config {
        Some(path) => AnalyzeConfig::from_json_file(path)?,
        None => AnalyzeConfig::default(),
    };
    if args.no_value_protection {
        config.value_protection = false;
    }
    if let Some(max_workers) = args.max_workers {
        config.max_workers = max_workers;
    }
    Ok(config)
}

fn print_summary(workspace: &Workspace, role: TableRole, stats: &TableStats) {
    let path = workspace.final_stats_path(role);
    println!(
        "{} {} ({} columns)",
        format!("[{}]", role.as_str()).bold(),
        path.display(),
        stats.columns.len()
    );
    if let (Some(trn), Some(val)) = (stats.no_of_training_records, stats.no_of_validation_records) {
        println!(
            "  records: {} training / {} validation",
            trn.to_string().green(),
            val.to_string().yellow()
        );
    }
    if let Some(is_sequential) = stats.is_sequential {
        println!("  sequential: {}", is_sequential.to_string().cyan());
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    synthstats::analyze(&args.workspace_dir, &config, &LogObserver, None)?;

    let workspace = Workspace::new(&args.workspace_dir);
    for role in [TableRole::Target, TableRole::Context] {
        let path = workspace.final_stats_path(role);
        if path.exists() {
            let stats: TableStats = read_json(&path)?;
            print_summary(&workspace, role, &stats);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_logging(args.log_file.as_ref()) {
        eprintln!("{} cannot open log file: {}", "error:".red().bold(), err);
        return ExitCode::FAILURE;
    }
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
