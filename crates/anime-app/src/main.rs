//! Anime assistant binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Install tracing (stderr, so answers on stdout stay clean)
//! 3. Open the SQLite catalog
//! 4. Run the requested command: chat REPL, one-shot ask, import, stats or init

mod cli;
mod repl;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use anime_chat::{classifier_from_config, ChatError, WorkflowCoordinator};
use anime_core::config::AnimeConfig;
use anime_storage::{CatalogImporter, CatalogQueries, Database, SqliteTableStore};

use crate::cli::{CliArgs, Command};

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file if present, then apply CLI overrides and the API
/// key from the environment.
fn load_config(args: &CliArgs) -> Result<AnimeConfig, Box<dyn std::error::Error>> {
    let config_file = args.resolve_config_path();
    let mut config = if config_file.exists() {
        AnimeConfig::load(&config_file)?
    } else {
        AnimeConfig::default()
    };

    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    config.llm.api_key = std::env::var(&config.llm.api_key_env).ok();
    config.validate()?;
    Ok(config)
}

fn build_coordinator(
    config: &AnimeConfig,
    db: Arc<Database>,
) -> Result<WorkflowCoordinator, ChatError> {
    if config.llm.enabled && config.llm.api_key.is_none() {
        tracing::warn!(
            env = %config.llm.api_key_env,
            "LLM classifier enabled but no API key found"
        );
    }
    let classifier = classifier_from_config(&config.llm)?;
    tracing::info!(classifier = classifier.name(), "Interpreting agent ready");

    let store = Arc::new(SqliteTableStore::new(db));
    Ok(WorkflowCoordinator::from_config(config, classifier, store))
}

/// Write the effective configuration (without the API key) to the config path.
fn write_config(
    args: &CliArgs,
    config: &AnimeConfig,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = args.resolve_config_path();
    if path.exists() && !force {
        return Err(format!("{} already exists (pass --force to overwrite)", path.display()).into());
    }
    config.save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_tracing(&config.general.log_level);

    tracing::info!("Starting anime-assistant v{}", env!("CARGO_PKG_VERSION"));

    let command = args.command();
    if let Command::Init { force } = command {
        return write_config(&args, &config, force);
    }

    let db_path = args.resolve_db_path(&config);
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "Catalog database opened");

    match command {
        Command::Init { .. } => {}
        Command::Import { files } => {
            let report = CatalogImporter::new(db).import_files(&files)?;
            println!(
                "Imported {} anime ({} genre links), skipped {}.",
                report.imported, report.genre_links, report.skipped
            );
        }
        Command::Stats => {
            let stats = CatalogQueries::new(db).stats()?;
            println!("Anime:          {}", stats.anime_count);
            println!("Scored:         {}", stats.scored_count);
            println!("Airing:         {}", stats.airing_count);
            println!("Genres:         {}", stats.genre_count);
            println!("Studios:        {}", stats.studio_count);
            println!("Database size:  {} KiB", stats.db_size_bytes / 1024);
        }
        Command::Ask { question } => {
            let mut coordinator = build_coordinator(&config, db)?;
            let answer = coordinator.handle_turn(&question.join(" ")).await;
            println!("{}", answer);
        }
        Command::Chat => {
            let mut coordinator = build_coordinator(&config, db)?;
            repl::run(&mut coordinator).await?;
        }
    }

    Ok(())
}
