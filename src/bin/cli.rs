//! Tweet Indexer CLI
//!
//! Follows the user stream and indexes it into the configured store.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tweet_indexer::{
    error::Result,
    models::{Config, LoggingConfig, RawPost, StoreBackend},
    pipeline,
    services::normalize,
    source::{HttpSource, StatusSource},
    storage::{DocumentStore, ElasticStore, LocalStore},
};

/// Environment variable overriding `source.bearer_token`.
const BEARER_TOKEN_ENV: &str = "TWITTER_BEARER_TOKEN";

/// tweet-indexer - Home timeline indexer
#[derive(Parser, Debug)]
#[command(
    name = "tweet-indexer",
    version,
    about = "Indexes a home timeline stream into a document store"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true, env = "DEBUG")]
    verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Backfill, then index the live stream
    Run {
        /// Backfill posts newer than this id
        #[arg(long)]
        since: Option<u64>,
    },

    /// Validate the configuration file
    Validate,

    /// Print the document stored for a raw status JSON file
    Normalize {
        /// Path to the status JSON
        file: PathBuf,
    },
}

/// Initialize logging from config, verbosity flag and `RUST_LOG`.
fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if let Some(path) = &logging.file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Elasticsearch => Arc::new(ElasticStore::from_config(
            &config.store,
            &config.source.user_agent,
            config.source.timeout_secs,
        )?),
        StoreBackend::Local => Arc::new(LocalStore::new(config.store.root_dir.clone())),
    };
    Ok(store)
}

fn normalize_file(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let post: RawPost = serde_json::from_str(&content)?;
    println!("{}", serde_json::to_string_pretty(&normalize(&post))?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging isn't up yet, so a load failure is reported after init.
    let loaded = Config::load(&cli.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    if let Some(path) = cli.log_file {
        config.logging.file = Some(path);
    }
    if let Ok(token) = std::env::var(BEARER_TOKEN_ENV) {
        config.source.bearer_token = Some(token);
    }

    init_logging(&config.logging, cli.verbose)?;
    log::info!("tweet-indexer {} starting...", env!("CARGO_PKG_VERSION"));

    match &loaded {
        Ok(_) => log::info!("Loaded configuration from {}", cli.config.display()),
        Err(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        ),
    }

    match cli.command {
        Command::Run { since } => {
            if let Some(since_id) = since {
                config.backfill.since_id = since_id;
            }
            config.validate()?;

            let source: Arc<dyn StatusSource> = Arc::new(HttpSource::from_config(&config.source)?);
            let store = open_store(&config)?;

            let stats = pipeline::run_pipeline(&config, source, store).await?;
            log::info!(
                "Indexed {} documents ({} reply ancestors, {} failed lookups)",
                stats.indexed,
                stats.ancestors_queued,
                stats.lookup_failures
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = loaded {
                log::error!("Config could not be loaded: {}", e);
                return Err(e);
            }
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            if config.source.bearer_token.is_none() {
                log::warn!("No bearer token set; requests will be unauthenticated");
            }

            log::info!("All validations passed!");
        }

        Command::Normalize { file } => {
            normalize_file(&file).map_err(|e| {
                log::error!("Unable to normalize {}: {}", file.display(), e);
                e
            })?;
        }
    }

    log::info!("Done!");

    Ok(())
}
