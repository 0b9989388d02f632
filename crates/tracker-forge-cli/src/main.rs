//! forge - assembles per-entity tracker workbooks from a template

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracker_forge::{
    AssemblyConfig, BatchReport, BatchRunner, ExcelLauncher, HostLauncher, SnapshotLauncher,
};

#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about = "Assemble tracker workbooks from a template")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble one output workbook per input in the data folder
    Run {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Spreadsheet host to drive
        #[arg(short, long, value_enum, default_value_t = Backend::Excel)]
        backend: Backend,
    },

    /// Print the validated merge plan
    Plan {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Hidden Excel under WINE
    Excel,
    /// JSON workbook snapshots, no Excel required
    Snapshot,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, backend } => run(&config, backend),
        Commands::Plan { config } => show_plan(&config).map(|()| ExitCode::SUCCESS),
    }
}

fn load(path: &Path) -> Result<AssemblyConfig> {
    AssemblyConfig::load(path)
        .with_context(|| format!("Failed to load configuration '{}'", path.display()))
}

fn run(config_path: &Path, backend: Backend) -> Result<ExitCode> {
    let config = load(config_path)?;
    tracing::info!(config = %config_path.display(), "starting batch");
    let report = match backend {
        Backend::Excel => {
            let settings = config.excel.clone().unwrap_or_default();
            run_batch(&config, ExcelLauncher::from_settings(&settings))?
        }
        Backend::Snapshot => run_batch(&config, SnapshotLauncher)?,
    };

    print_report(&report);
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_batch<L: HostLauncher>(config: &AssemblyConfig, launcher: L) -> Result<BatchReport> {
    let runner = BatchRunner::from_config(config, launcher).context("Invalid region list")?;
    runner.run(&config.input_source()).with_context(|| {
        format!(
            "Batch over '{}' could not start",
            config.data_folder.display()
        )
    })
}

fn print_report(report: &BatchReport) {
    for item in &report.items {
        match &item.result {
            Ok(outcome) => {
                println!("ok      {}", item.output_path.display());
                for (region, merge) in outcome.degraded() {
                    println!("          {region}: {merge}");
                }
                for sheet in &outcome.appended_sheets {
                    println!("          + sheet {sheet}");
                }
            }
            Err(e) => println!("failed  {}: {e}", item.input.display()),
        }
    }
    println!(
        "{} processed, {} failed",
        report.succeeded().count(),
        report.failed().count()
    );
}

fn show_plan(config_path: &Path) -> Result<()> {
    let config = load(config_path)?;
    let plan = config.plan().context("Invalid region list")?;

    println!("Template: {}", config.template_path.display());
    println!("Data:     {}", config.data_folder.display());
    println!("Output:   {}", config.output_folder.display());
    println!("Inputs:   *.{}", config.extensions.join(", *."));
    println!("Regions:");
    for (i, region) in plan.iter().enumerate() {
        println!("  {:>2}. {region}", i + 1);
    }
    Ok(())
}
