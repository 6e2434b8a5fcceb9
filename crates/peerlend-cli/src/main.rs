mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::amortization::{EmiArgs, ScheduleArgs};
use commands::arrears::LateFeeArgs;
use commands::rates::RateArgs;

/// Peer-to-peer lending ledger calculations
#[derive(Parser)]
#[command(
    name = "plend",
    version,
    about = "Peer-to-peer lending ledger calculations",
    long_about = "A CLI for the peerlend engine's calculators with decimal \
                  precision. Quotes fixed installments (EMI), full \
                  amortization schedules, risk-tiered rates, and the cost of \
                  settling an installment late."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote the fixed periodic installment for a principal/rate/term triple
    Emi(EmiArgs),
    /// Full declining-balance amortization schedule
    Schedule(ScheduleArgs),
    /// Risk-tiered annual rate for a principal
    Rate(RateArgs),
    /// Cost of settling an installment late
    LateFee(LateFeeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Emi(args) => commands::amortization::run_emi(args),
        Commands::Schedule(args) => commands::amortization::run_schedule(args),
        Commands::Rate(args) => commands::rates::run_rate(args),
        Commands::LateFee(args) => commands::arrears::run_late_fee(args),
        Commands::Version => {
            println!("plend {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
