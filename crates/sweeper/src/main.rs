mod commands;
mod config;
mod output;
mod sweep;

use clap::{Parser, Subcommand};
use config::{ConfigArgs, LogFormat, SweeperConfig};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sweeper")]
#[command(about = "Deletes stale, unlabeled Google Cloud resources", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sweep now
    Run {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Exit non-zero when any resource or type failed
        #[arg(long)]
        fail_on_error: bool,
    },
    /// Sweep once a day at a fixed UTC time
    Schedule {
        /// Time of day, HH:MM (UTC)
        #[arg(long, env = "SWEEPER_SCHEDULE_AT", value_parser = commands::schedule::parse_time_of_day)]
        at: chrono::NaiveTime,
    },
    /// Sweep whenever a message arrives on a Pub/Sub subscription
    Listen {
        /// Subscription name or full resource path
        #[arg(long, env = "SWEEPER_SUBSCRIPTION")]
        subscription: String,
        /// Messages pulled per request
        #[arg(long, default_value = "10")]
        max_messages: u32,
        /// Seconds to wait after an empty or failed pull
        #[arg(long, default_value = "5")]
        poll_interval_secs: u64,
    },
    /// List supported resource types
    Types,
    /// Show version
    Version,
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that need neither logging nor configuration
    match cli.command {
        Commands::Version => {
            println!("sweeper {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Types => {
            commands::types::handle();
            return Ok(());
        }
        _ => {}
    }

    let config = SweeperConfig::load(&cli.config)?;
    init_logging(config.log_format);

    match cli.command {
        Commands::Run {
            json,
            fail_on_error,
        } => {
            commands::run::handle(&config, json, fail_on_error).await?;
        }
        Commands::Schedule { at } => {
            commands::schedule::handle(&config, at).await?;
        }
        Commands::Listen {
            subscription,
            max_messages,
            poll_interval_secs,
        } => {
            commands::listen::handle(
                &config,
                &subscription,
                max_messages,
                Duration::from_secs(poll_interval_secs),
            )
            .await?;
        }
        Commands::Types | Commands::Version => {}
    }

    Ok(())
}
