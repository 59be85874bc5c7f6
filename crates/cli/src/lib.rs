pub mod commands;

use std::process::ExitCode;

use agrimarket_core::config::{AppConfig, LogFormat, LoadOptions};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "agrimarket",
    about = "Agrimarket recommendation operator CLI",
    long_about = "Apply migrations, load the demo marketplace, inspect configuration, and run customer profiling and recommendation jobs.",
    after_help = "Examples:\n  agrimarket migrate\n  agrimarket recommend --customer-id 9201\n  agrimarket preferred --customer-id 9201 --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo marketplace and verify it")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Recompute and store one customer's behavioral profile")]
    Profile {
        #[arg(long, help = "Customer identifier")]
        customer_id: i64,
    },
    #[command(about = "Regenerate recommendations for one customer, or all customers when omitted")]
    Recommend {
        #[arg(long, help = "Restrict the run to this customer")]
        customer_id: Option<i64>,
    },
    #[command(about = "List in-stock listings matching a customer's stored recommendations")]
    Preferred {
        #[arg(long, help = "Customer identifier")]
        customer_id: i64,
        #[arg(long, help = "Maximum number of items, defaults to recommendation.preferred_items_limit")]
        limit: Option<usize>,
    },
}

/// Logs go to stderr so stdout carries only the JSON outcome.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Profile { customer_id } => commands::profile::run(customer_id),
        Command::Recommend { customer_id } => commands::recommend::run(customer_id),
        Command::Preferred { customer_id, limit } => commands::preferred::run(customer_id, limit),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
