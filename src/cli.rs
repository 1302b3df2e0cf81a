//! Command-line surface: argument definitions and request dispatch.
//!
//! Every command produces exactly one [`Response`]; nothing here panics or
//! exits on a bad request.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::SocialGraphConfig;
use crate::error::Result;
use crate::graph::query::GraphQuery;
use crate::graph::store::{RecordReader, SqliteStore};
use crate::loader::load_file_into_sqlite;
use crate::response::Response;
use crate::types::QueryKind;

#[derive(Parser, Debug)]
#[command(name = "socialgraph", version)]
#[command(about = "Friends, friends of friends and friend suggestions over a social graph")]
pub struct Cli {
    /// Path to the SQLite database (overrides config and SOCIALGRAPH_DB)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// YAML config file (defaults to ./socialgraph.yaml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON response
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the stored users with the contents of a JSON file
    Load {
        /// JSON array of user objects
        file: PathBuf,
    },

    /// Show the record for a user
    Info {
        #[arg(allow_hyphen_values = true)]
        user_id: String,
    },

    /// Users who list the given user as a friend
    Friends {
        #[arg(allow_hyphen_values = true)]
        user_id: String,
    },

    /// Friends of the user's friends, minus the user and their friends
    #[command(alias = "fof")]
    FriendsOfFriends {
        #[arg(allow_hyphen_values = true)]
        user_id: String,
    },

    /// Friends of friends who share at least two friends with the user
    #[command(alias = "suggest")]
    SuggestedFriends {
        #[arg(allow_hyphen_values = true)]
        user_id: String,
    },

    /// Counts and provenance of the stored dataset
    Stats,
}

impl Command {
    /// The query this command runs, with its raw identifier token.
    pub fn query(&self) -> Option<(QueryKind, &str)> {
        match self {
            Command::Info { user_id } => Some((QueryKind::Info, user_id.as_str())),
            Command::Friends { user_id } => Some((QueryKind::Friends, user_id.as_str())),
            Command::FriendsOfFriends { user_id } => {
                Some((QueryKind::FriendsOfFriends, user_id.as_str()))
            }
            Command::SuggestedFriends { user_id } => {
                Some((QueryKind::SuggestedFriends, user_id.as_str()))
            }
            Command::Load { .. } | Command::Stats => None,
        }
    }
}

/// Merge config file, environment and flags, in increasing priority.
pub fn resolve_config(cli: &Cli) -> Result<SocialGraphConfig> {
    let mut config = SocialGraphConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if cli.pretty {
        config.output.pretty = true;
    }
    Ok(config)
}

/// Open the configured store, creating the parent directory of an on-disk
/// database if needed.
pub fn open_store(config: &SocialGraphConfig) -> Result<SqliteStore> {
    let path = config.database_path();
    if path != ":memory:" {
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    SqliteStore::open(&path)
}

/// Run one command against an already-open store.
pub fn dispatch(store: &SqliteStore, command: &Command) -> Response {
    let result = match command.query() {
        Some((kind, token)) => GraphQuery::new(store).run(kind, token).map(Response::ok),
        None => match command {
            Command::Load { file } => load_file_into_sqlite(store, file)
                .map(|report| Response::with_message(report.message, report.records)),
            _ => stats_message(store).map(|message| Response::with_message(message, Vec::new())),
        },
    };
    result.unwrap_or_else(|err| Response::failure(&err))
}

/// Open the store from `config` and run `command`.
pub fn execute(config: &SocialGraphConfig, command: &Command) -> Response {
    match open_store(config) {
        Ok(store) => dispatch(&store, command),
        Err(err) => Response::failure(&err),
    }
}

fn stats_message(store: &SqliteStore) -> Result<String> {
    let stats = store.stats()?;
    let mut message = format!(
        "{} users, {} friendship links",
        stats.users, stats.friendships
    );
    if let Some(meta) = store.last_load()? {
        message.push_str(&format!(
            "; last loaded from {} at {} (sha256 {})",
            meta.source_path, meta.loaded_at, meta.content_hash
        ));
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::RecordStore;
    use crate::types::UserRecord;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("socialgraph").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_query_subcommands() {
        let cli = parse(&["friends", "10"]);
        assert_eq!(cli.command.query(), Some((QueryKind::Friends, "10")));

        let cli = parse(&["fof", "1"]);
        assert_eq!(cli.command.query(), Some((QueryKind::FriendsOfFriends, "1")));

        let cli = parse(&["suggested-friends", "7"]);
        assert_eq!(cli.command.query(), Some((QueryKind::SuggestedFriends, "7")));

        let cli = parse(&["suggest", "7"]);
        assert_eq!(cli.command.query(), Some((QueryKind::SuggestedFriends, "7")));
    }

    #[test]
    fn identifiers_are_passed_through_raw() {
        let cli = parse(&["info", "abc"]);
        assert_eq!(cli.command.query(), Some((QueryKind::Info, "abc")));

        let cli = parse(&["info", "-3"]);
        assert_eq!(cli.command.query(), Some((QueryKind::Info, "-3")));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["friends", "1", "--db", ":memory:", "--pretty"]);
        assert_eq!(cli.db, Some(PathBuf::from(":memory:")));
        assert!(cli.pretty);
    }

    #[test]
    fn missing_identifier_is_a_usage_error() {
        assert!(Cli::try_parse_from(["socialgraph", "friends"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&["stats", "--db", "/tmp/x.db", "--pretty"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.database_path(), "/tmp/x.db");
        assert!(config.output.pretty);
    }

    #[test]
    fn dispatch_query_and_stats() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .replace_all(&[UserRecord::new(1, vec![2]), UserRecord::new(2, vec![1])])
            .unwrap();

        let resp = dispatch(&store, &Command::Friends { user_id: "1".into() });
        assert!(!resp.error);
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].id, 2);

        let resp = dispatch(&store, &Command::Stats);
        assert!(!resp.error);
        assert_eq!(resp.message, "2 users, 2 friendship links");
    }

    #[test]
    fn dispatch_reports_validation_errors() {
        let store = SqliteStore::in_memory().unwrap();
        let resp = dispatch(&store, &Command::Info { user_id: "0".into() });
        assert!(resp.error);
        assert_eq!(resp.message, "Specify a correct User ID");
        assert!(resp.results.is_empty());
    }

    #[test]
    fn dispatch_reports_load_errors() {
        let store = SqliteStore::in_memory().unwrap();
        let resp = dispatch(
            &store,
            &Command::Load {
                file: PathBuf::from("/foo/bar"),
            },
        );
        assert!(resp.error);
        assert_eq!(resp.message, "Specify a correct JSON data filename and path");
    }

    #[test]
    fn execute_creates_missing_database_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = SocialGraphConfig::default();
        config.database.path = dir.path().join("nested").join("graph.db");
        let resp = execute(&config, &Command::Stats);
        assert!(!resp.error, "{}", resp.message);
        assert!(config.database.path.exists());
    }
}
