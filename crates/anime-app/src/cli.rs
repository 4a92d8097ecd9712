//! CLI argument definitions for the anime assistant.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use anime_core::config::AnimeConfig;

/// Anime assistant - ask questions about your anime catalog in plain English.
#[derive(Parser, Debug)]
#[command(name = "anime-assistant", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the catalog database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Database file, overriding the data directory and config.
    #[arg(long = "db", global = true)]
    pub db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive chat (default).
    Chat,
    /// Ask a single question and print the answer.
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Import Jikan JSON exports into the catalog.
    Import {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Print catalog counts.
    Stats,
    /// Write the current configuration to the config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl CliArgs {
    /// The subcommand to run; `chat` when none is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ANIME_ASSISTANT_CONFIG env var > ~/.anime-assistant/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ANIME_ASSISTANT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory path.
    ///
    /// Priority: --data-dir flag > config file value.
    /// Returns `None` if not overridden (use config default).
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    /// Resolve the database file.
    ///
    /// Priority: --db flag > absolute `store.database_file` > data dir joined
    /// with `store.database_file`.
    pub fn resolve_db_path(&self, config: &AnimeConfig) -> PathBuf {
        if let Some(ref p) = self.db {
            return p.clone();
        }
        let file = Path::new(&config.store.database_file);
        if file.is_absolute() {
            return file.to_path_buf();
        }
        expand_home(&config.general.data_dir).join(file)
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".anime-assistant").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("anime-assistant").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_default_command_is_chat() {
        assert_eq!(parse(&[]).command(), Command::Chat);
    }

    #[test]
    fn test_ask_collects_words() {
        let args = parse(&["ask", "top", "rated", "anime"]);
        assert_eq!(
            args.command(),
            Command::Ask {
                question: vec!["top".into(), "rated".into(), "anime".into()]
            }
        );
    }

    #[test]
    fn test_ask_requires_a_question() {
        assert!(CliArgs::try_parse_from(["anime-assistant", "ask"]).is_err());
    }

    #[test]
    fn test_import_files() {
        let args = parse(&["import", "a.json", "b.json"]);
        match args.command() {
            Command::Import { files } => assert_eq!(files.len(), 2),
            other => panic!("Expected Import, got: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["stats", "--db", "/tmp/catalog.db", "-l", "debug"]);
        assert_eq!(args.command(), Command::Stats);
        assert_eq!(args.db, Some(PathBuf::from("/tmp/catalog.db")));
        assert_eq!(args.resolve_log_level().as_deref(), Some("debug"));
    }

    #[test]
    fn test_init_force_flag() {
        assert_eq!(parse(&["init"]).command(), Command::Init { force: false });
        assert_eq!(
            parse(&["init", "--force"]).command(),
            Command::Init { force: true }
        );
    }

    #[test]
    fn test_config_flag_wins() {
        let args = parse(&["--config", "/etc/anime.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/anime.toml"));
    }

    #[test]
    fn test_db_path_priority() {
        let mut config = AnimeConfig::default();
        config.general.data_dir = "/var/lib/anime".to_string();

        let args = parse(&[]);
        assert_eq!(
            args.resolve_db_path(&config),
            PathBuf::from("/var/lib/anime/anime.db")
        );

        config.store.database_file = "/srv/catalog.db".to_string();
        assert_eq!(args.resolve_db_path(&config), PathBuf::from("/srv/catalog.db"));

        let args = parse(&["--db", "local.db"]);
        assert_eq!(args.resolve_db_path(&config), PathBuf::from("local.db"));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/data/anime"), PathBuf::from("/data/anime"));
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
    }
}
