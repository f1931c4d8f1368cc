pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "moldquote",
    about = "Moldquote operator CLI",
    long_about = "Inspect configuration, check readiness, apply migrations, and price a part from the terminal.",
    after_help = "Examples:\n  moldquote doctor --json\n  moldquote config\n  moldquote estimate --material ABS --size 10x5x2 --quantity 50"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LINE token readiness, DB connectivity and the price table")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Estimate production cost with the configured material prices")]
    Estimate {
        #[arg(long, help = "Material name as listed in the price table")]
        material: String,
        #[arg(long, help = "Part size in cm, e.g. 10.5x4.5x3")]
        size: String,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..), help = "Number of parts")]
        quantity: u32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Estimate { material, size, quantity } => {
            commands::estimate::run(&material, &size, quantity)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
