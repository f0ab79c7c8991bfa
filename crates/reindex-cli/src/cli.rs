//! CLI argument parsing for movie-reindex.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// Movie plot reindexer
///
/// Re-embeds movie plots stored in Neo4j and moves similarity search onto a
/// fresh vector index.
#[derive(Parser, Debug)]
#[command(name = "movie-reindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/movie-reindex/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Reindex commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every stage: identifiers, embeddings, index migration, verification
    Run {
        /// Override records per page
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Skip the verification query
        #[arg(long)]
        skip_verify: bool,
    },

    /// Assign identifiers to records that lack one
    BackfillIds,

    /// Embed every record and write its vector
    Embed {
        /// Override records per page
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Drop the previous vector index and create the current one
    MigrateIndex,

    /// Query a vector index with free text
    Search {
        /// Text to search for
        query: String,

        /// Number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Index to query (default: the current index)
        #[arg(short, long)]
        index: Option<String>,
    },

    /// List vector indexes on the store
    Indexes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_run() {
        let cli = Cli::parse_from(["movie-reindex", "run"]);
        match cli.command {
            Commands::Run {
                batch_size,
                skip_verify,
            } => {
                assert_eq!(batch_size, None);
                assert!(!skip_verify);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_run_with_options() {
        let cli = Cli::parse_from(["movie-reindex", "run", "--batch-size", "2", "--skip-verify"]);
        match cli.command {
            Commands::Run {
                batch_size,
                skip_verify,
            } => {
                assert_eq!(batch_size, Some(2));
                assert!(skip_verify);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_stage_commands() {
        let cli = Cli::parse_from(["movie-reindex", "backfill-ids"]);
        assert!(matches!(cli.command, Commands::BackfillIds));

        let cli = Cli::parse_from(["movie-reindex", "embed", "-b", "10"]);
        assert!(matches!(cli.command, Commands::Embed { batch_size: Some(10) }));

        let cli = Cli::parse_from(["movie-reindex", "migrate-index"]);
        assert!(matches!(cli.command, Commands::MigrateIndex));

        let cli = Cli::parse_from(["movie-reindex", "indexes"]);
        assert!(matches!(cli.command, Commands::Indexes));
    }

    #[test]
    fn test_cli_search() {
        let cli = Cli::parse_from([
            "movie-reindex",
            "search",
            "Toys coming alive",
            "-k",
            "3",
            "--index",
            "moviePlots",
        ]);
        match cli.command {
            Commands::Search {
                query,
                top_k,
                index,
            } => {
                assert_eq!(query, "Toys coming alive");
                assert_eq!(top_k, Some(3));
                assert_eq!(index, Some("moviePlots".to_string()));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::parse_from([
            "movie-reindex",
            "--config",
            "/tmp/reindex.toml",
            "--log-level",
            "debug",
            "indexes",
        ]);
        assert_eq!(cli.config, Some("/tmp/reindex.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_log_level_after_subcommand() {
        let cli = Cli::parse_from(["movie-reindex", "run", "-l", "warn"]);
        assert_eq!(cli.log_level, Some("warn".to_string()));
    }
}
