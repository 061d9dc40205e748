pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use wayfare_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "wayfare",
    about = "Wayfare lead wizard CLI",
    long_about = "Inspect wizard step plans and configuration, and replay scripted answers through the lead wizard.",
    after_help = "Examples:\n  wayfare plan --services flight,hotel\n  wayfare plan --preselected car\n  wayfare config\n  wayfare submit --answers lead.json --dry-run"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a wayfare.toml file (must exist when given)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Print the step sequence for a service selection")]
    Plan {
        #[arg(long, value_delimiter = ',', help = "Services picked in guided mode")]
        services: Vec<String>,
        #[arg(long, help = "Open the wizard pre-selected on a single service")]
        preselected: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Drive a wizard session from an answers file and submit the lead")]
    Submit {
        #[arg(long, help = "JSON file with the wizard answers")]
        answers: PathBuf,
        #[arg(long, help = "Validate and print the payload without sending it")]
        dry_run: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    // Config errors are reported by the commands that need it.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Plan { services, preselected } => {
            commands::plan::run(&services, preselected.as_deref())
        }
        Command::Config => commands::config::run(options),
        Command::Submit { answers, dry_run } => commands::submit::run(options, &answers, dry_run),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the command result line.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
