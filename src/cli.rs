use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::fetch::Target;

/// Upper bound for `doctor --since-hours`: ten years.
pub const MAX_SINCE_HOURS: i64 = 24 * 366 * 10;

#[derive(Parser)]
#[command(
    name = "mailtidy",
    version,
    about = "Snapshot Gmail labels and filters, suggest cleanups, apply migration files",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Workspace directory (default: $MAILTIDY_DATA or the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save label and filter snapshots under data/
    Fetch {
        #[arg(value_enum, default_value_t = Target::All)]
        target: Target,
    },

    /// List labels with their visibility settings
    Labels {
        /// Include system labels
        #[arg(long)]
        all: bool,
    },

    /// Suggest label deletions and unsubscribe filters, then write a migration file
    Doctor {
        /// How far back to look for unsubscribe links (default from config: 72)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(i64).range(0..=MAX_SINCE_HOURS))]
        since_hours: Option<i64>,

        /// Refresh snapshots and accept empty-label deletions without asking
        #[arg(long)]
        yes: bool,

        /// Use the existing snapshots as-is
        #[arg(long)]
        no_fetch: bool,
    },

    /// Apply pending migration files
    Migrate {
        /// Apply recurring daily-*.json files instead of one-off files
        #[arg(long)]
        daily: bool,

        /// Skip refreshing snapshots afterwards
        #[arg(long)]
        no_refresh: bool,
    },
}
