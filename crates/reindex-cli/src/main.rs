//! movie-reindex
//!
//! Re-embeds movie plots in Neo4j and migrates the vector index.
//!
//! # Usage
//!
//! ```bash
//! movie-reindex run [--batch-size N] [--skip-verify]
//! movie-reindex backfill-ids
//! movie-reindex embed [--batch-size N]
//! movie-reindex migrate-index
//! movie-reindex search "Toys coming alive" [--top-k K] [--index NAME]
//! movie-reindex indexes
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/movie-reindex/config.toml)
//! 3. Environment variables (REINDEX_*, then NEO4J_URI / NEO4J_USERNAME /
//!    NEO4J_PASSWORD / NEO4J_DATABASE)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use reindex_cli::{
    backfill_ids, embed, init_logging, list_indexes, load_settings, migrate, run_reindex,
    search_index, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Run {
            batch_size,
            skip_verify,
        } => {
            run_reindex(&settings, batch_size, skip_verify).await?;
        }
        Commands::BackfillIds => {
            backfill_ids(&settings).await?;
        }
        Commands::Embed { batch_size } => {
            embed(&settings, batch_size).await?;
        }
        Commands::MigrateIndex => {
            migrate(&settings).await?;
        }
        Commands::Search {
            query,
            top_k,
            index,
        } => {
            search_index(&settings, &query, top_k, index).await?;
        }
        Commands::Indexes => {
            list_indexes(&settings).await?;
        }
    }

    Ok(())
}
