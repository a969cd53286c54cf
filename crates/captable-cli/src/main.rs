mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::cap_table::{CapTableArgs, DefaultsArgs};
use commands::conversion::ConvertNoteArgs;
use commands::scenarios::{ScenariosArgs, SensitivityArgs};
use commands::valuation::ExitValuationArgs;
use commands::waterfall::{DebtScheduleArgs, ModelArgs, WaterfallArgs};

/// Startup cap-table dilution and exit-waterfall modelling
#[derive(Parser)]
#[command(
    name = "captable",
    version,
    about = "Startup cap-table dilution and exit-waterfall modelling",
    long_about = "Builds a round-by-round cap table (founder, seed, Series A/B, convertible \
                  notes and a hybrid equity/debt/convertible round) with option-pool \
                  top-ups, then distributes an exit valuation through a debt-first \
                  waterfall with MoIC and IRR per stakeholder. Set RUST_LOG=debug to \
                  trace each round."
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
    /// Run the full model: cap table, exit valuation and waterfall
    Model(ModelArgs),
    /// Build the round-by-round cap table
    CapTable(CapTableArgs),
    /// Distribute an exit through the debt-first waterfall
    Waterfall(WaterfallArgs),
    /// Select an exit valuation from ARR and EBITDA multiples
    ExitValuation(ExitValuationArgs),
    /// Convert a single convertible note into shares
    ConvertNote(ConvertNoteArgs),
    /// Interest-bearing debt outstanding by year
    DebtSchedule(DebtScheduleArgs),
    /// Run named scenarios against a base input
    Scenarios(ScenariosArgs),
    /// Sweep one assumption across a range
    Sensitivity(SensitivityArgs),
    /// Print the default model input
    Defaults(DefaultsArgs),
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

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Model(args) => commands::waterfall::run_full_model(args),
        Commands::CapTable(args) => commands::cap_table::run_cap_table(args),
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args),
        Commands::ExitValuation(args) => commands::valuation::run_exit_valuation(args),
        Commands::ConvertNote(args) => commands::conversion::run_convert_note(args),
        Commands::DebtSchedule(args) => commands::waterfall::run_debt_schedule(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenario_analysis(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity_sweep(args),
        Commands::Defaults(args) => commands::cap_table::run_defaults(args),
        Commands::Version => {
            println!("captable {}", env!("CARGO_PKG_VERSION"));
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
