//! movie-reindex library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    backfill_ids, embed, format_results, init_logging, list_indexes, load_settings, migrate,
    run_reindex, search_index,
};
