mod commands;
mod config;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::irr::IrrArgs;
use commands::ma::{AnalyzeArgs, EstimateCashFlowArgs, ProFormaArgs, ProjectArgs, SynergyValueArgs};
use commands::scenarios::{BreakEvenArgs, SensitivityArgs, SweepArgs};

/// M&A deal valuation with decimal precision
#[derive(Parser)]
#[command(
    name = "dealm",
    version,
    about = "M&A deal valuation with decimal precision",
    long_about = "A CLI for all-cash M&A deal analysis: pro forma consolidation, \
                  cash flow estimation, synergy projections, bisection IRR, \
                  probability-weighted scenario sweeps and break-even searches."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Log line format on stderr
    #[arg(long, default_value = "pretty", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Consolidate acquirer and target into pro forma financials
    ProForma(ProFormaArgs),
    /// Reported or estimated OCF, CapEx and FCF for one entity
    EstimateCashFlow(EstimateCashFlowArgs),
    /// Project a holding-period cash flow stream
    Project(ProjectArgs),
    /// Solve the IRR of a cash flow stream
    Irr(IrrArgs),
    /// Sweep synergy scenarios and compute the expected IRR
    Sweep(SweepArgs),
    /// Find the synergy level or price at which a target IRR is reached
    BreakEven(BreakEvenArgs),
    /// Two-way IRR sensitivity grid
    Sensitivity(SensitivityArgs),
    /// Value created by revenue synergies at a revenue multiple
    SynergyValue(SynergyValueArgs),
    /// End-to-end deal analysis from a fact store
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, &cli.log_format);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::ProForma(args) => commands::ma::run_pro_forma(args),
        Commands::EstimateCashFlow(args) => commands::ma::run_estimate_cash_flow(args),
        Commands::Project(args) => commands::ma::run_project(args),
        Commands::Irr(args) => commands::irr::run_irr(args),
        Commands::Sweep(args) => commands::scenarios::run_sweep(args),
        Commands::BreakEven(args) => commands::scenarios::run_break_even(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::SynergyValue(args) => commands::ma::run_synergy_value(args),
        Commands::Analyze(args) => commands::ma::run_analyze(args),
        Commands::Version => {
            println!("dealm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
