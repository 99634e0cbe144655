mod repl;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use fcbot_config::FcBotConfig;
use fcbot_core::clock::EventSchedule;
use fcbot_types::CheckpointKind;

#[derive(Parser)]
#[command(name = "fcbot", about = "Feelings Checkin reminder bot")]
struct Cli {
    /// Config file path (defaults to ~/.fcbot/config.json5)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: Zulip polling plus the checkpoint scheduler
    Serve,
    /// Interactive local session against a local document store
    Repl {
        /// Caller identity used for subscription commands
        #[arg(long, default_value = "repl-user")]
        caller: String,

        /// Database path (in-memory if not given)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Fire one scheduler checkpoint action now
    Trigger {
        #[arg(value_enum)]
        checkpoint: TriggerCheckpoint,
    },
    /// Check configuration
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum TriggerCheckpoint {
    Morning,
    OneHour,
    Starting,
}

impl From<TriggerCheckpoint> for CheckpointKind {
    fn from(value: TriggerCheckpoint) -> Self {
        match value {
            TriggerCheckpoint::Morning => CheckpointKind::Morning,
            TriggerCheckpoint::OneHour => CheckpointKind::OneHour,
            TriggerCheckpoint::Starting => CheckpointKind::Starting,
        }
    }
}

/// Build the core schedule from config, validating weekday and hours.
fn event_schedule(config: &FcBotConfig) -> anyhow::Result<EventSchedule> {
    Ok(EventSchedule {
        weekday: config.schedule.weekday()?,
        morning_hour: config.schedule.morning_hour,
        one_hour_hour: config.schedule.one_hour_hour,
        starting_hour: config.schedule.starting_hour,
    })
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<FcBotConfig> {
    match path {
        Some(path) => Ok(fcbot_config::load_config_from(path)?),
        None => Ok(fcbot_config::load_config()?),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve::run_serve(config))?;
        }
        Commands::Repl { caller, db } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(repl::run_repl(config, caller, db))?;
        }
        Commands::Trigger { checkpoint } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve::run_trigger(config, checkpoint.into()))?;
        }
        Commands::Health => {
            println!("fcbot configuration");
            println!("  zulip site: {}", config.zulip.site);
            println!("  bot email: {}", config.zulip.email);
            println!(
                "  api key: {}",
                if config.zulip.api_key.is_some() {
                    "set"
                } else {
                    "missing"
                }
            );
            println!("  stream: {} > {}", config.zulip.stream, config.zulip.topic);
            println!("  timezone: {}", config.timezone);
            println!(
                "  event: {} at {}/{}/{}",
                config.schedule.weekday,
                config.schedule.morning_hour,
                config.schedule.one_hour_hour,
                config.schedule.starting_hour
            );
            println!("  retention: {} days", config.retention_days);
            println!("  storage: {}", config.storage_path()?.display());
        }
    }

    Ok(())
}
