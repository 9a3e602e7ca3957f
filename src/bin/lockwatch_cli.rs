use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use structopt::StructOpt;

use lockwatch::config::Config;
use lockwatch::guard::{ClassifierModel, Guard, LinearModel};
use lockwatch::persistence::{EventStore, SqliteEventStore};
use lockwatch::models::Verdict;

/// Login Abuse Lockout Guard Command Line Interface
#[derive(StructOpt, Debug)]
#[structopt(name = "lockwatch", about = "Login abuse lockout guard CLI")]
pub enum Cli {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Evaluate a login attempt for an identifier
    Evaluate {
        /// Identifier (username) to evaluate
        identifier: String,
        /// Source address of the attempt
        #[structopt(short, long)]
        source: Option<IpAddr>,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Record a credential-evaluated outcome for an identifier
    Record {
        /// Identifier (username) the outcome belongs to
        identifier: String,
        /// Record a success instead of a failure
        #[structopt(long)]
        success: bool,
        /// Source address of the attempt
        #[structopt(short, long)]
        source: Option<IpAddr>,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Display the attempt history for an identifier
    History {
        /// Identifier (username) to inspect
        identifier: String,
        /// Only show events at or after this unix timestamp
        #[structopt(short, long)]
        since: Option<i64>,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Display recent guard rejections
    Rejections {
        /// Maximum number of rejections to show
        #[structopt(short, long, default_value = "20")]
        limit: usize,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Remove events and rejections older than a timestamp
    Prune {
        /// Delete everything before this unix timestamp
        before: i64,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::from_args();

    match cli {
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Evaluate { identifier, source, config } => {
            let (guard, _store) = open_guard(&config)?;
            let now = Utc::now().timestamp();

            match guard.evaluate(&identifier, now, source)? {
                Verdict::Proceed => {
                    println!("PROCEED: '{}' may attempt credential evaluation", identifier);
                }
                Verdict::RejectBlocked { remaining_seconds } => {
                    println!(
                        "REJECT: '{}' is locked out for {} more second(s)",
                        identifier, remaining_seconds
                    );
                }
                Verdict::RejectAnomalous => {
                    println!("REJECT: '{}' attempt pattern flagged as attack-like", identifier);
                }
            }
        }
        Cli::Record { identifier, success, source, config } => {
            let (guard, _store) = open_guard(&config)?;
            let now = Utc::now().timestamp();

            guard.record_outcome(&identifier, success, now, source)?;
            println!(
                "Recorded {} for '{}' at {}",
                if success { "success" } else { "failure" },
                identifier,
                format_timestamp(now)
            );
        }
        Cli::History { identifier, since, config } => {
            let config = Config::from_file(&config)?;
            let store = SqliteEventStore::new(&config.store.db_path)?;

            let history = store.query(&identifier, since)?;
            println!("{} event(s) for '{}':\n", history.len(), identifier);
            for event in &history {
                println!(
                    "  {}  {:?}  source: {}",
                    format_timestamp(event.timestamp),
                    event.outcome,
                    event
                        .source_address
                        .map(|ip| ip.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Cli::Rejections { limit, config } => {
            let config = Config::from_file(&config)?;
            let store = SqliteEventStore::new(&config.store.db_path)?;

            let rejections = store.recent_rejections(limit)?;
            println!("{} rejection(s):\n", rejections.len());
            for record in &rejections {
                println!(
                    "  {}  [{}] {}",
                    format_timestamp(record.timestamp),
                    record.reason,
                    record.detail
                );
            }
        }
        Cli::Prune { before, config } => {
            let config = Config::from_file(&config)?;
            let store = SqliteEventStore::new(&config.store.db_path)?;

            let deleted = store.prune_before(before)?;
            println!("Pruned {} row(s) before {}", deleted, format_timestamp(before));
        }
    }

    Ok(())
}

/// Build the guard from a configuration file, loading the model
/// artifact once at startup.
fn open_guard(config_path: &PathBuf) -> Result<(Guard, Arc<SqliteEventStore>), Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    let store = Arc::new(SqliteEventStore::new(&config.store.db_path)?);

    let model: Arc<dyn ClassifierModel> = match config.model.artifact_path {
        Some(ref path) => {
            let model = LinearModel::from_file(path)?;
            log::info!("Loaded classifier model from {:?}", path);
            Arc::new(model)
        }
        None => Arc::new(LinearModel::default()),
    };

    let guard = Guard::new(
        &config.guard,
        Arc::clone(&store) as Arc<dyn EventStore>,
        model,
    );

    Ok((guard, store))
}

fn format_timestamp(timestamp: i64) -> String {
    match Utc.timestamp_opt(timestamp, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("@{}", timestamp),
    }
}
