pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "comptoir",
    about = "Comptoir operator CLI",
    long_about = "Operate Comptoir migrations, demo fixtures, readiness checks, and stock reports.",
    after_help = "Examples:\n  comptoir doctor --json\n  comptoir migrate\n  comptoir low-stock"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset (idempotent across runs)")]
    Seed,
    #[command(about = "Validate config, database connectivity, and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(name = "low-stock", about = "List products at or below their stock alert threshold")]
    LowStock,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::LowStock => commands::low_stock::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
