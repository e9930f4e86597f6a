use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notegraph")]
#[command(about = "Hierarchical note store with revisions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SQLite database file
    #[arg(long, global = true, env = "NOTEGRAPH_DB", default_value = "notegraph.db")]
    pub db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "NOTEGRAPH_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for log files; logging is off when unset
    #[arg(long, global = true, env = "NOTEGRAPH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Only list notes inside this note's subtree
    #[arg(long, global = true, default_value = "root")]
    pub hoisted: String,

    /// Reveal protected titles and content
    #[arg(long, global = true)]
    pub unlock_protected: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and apply migrations
    Init,

    /// Create a text note under a parent
    #[command(alias = "new")]
    Create {
        title: String,

        #[arg(required = false)]
        content: Option<String>,

        #[arg(short, long, default_value = "root")]
        parent: String,
    },

    /// Place a note under an additional parent
    Link {
        parent: String,
        note: String,

        #[arg(long, allow_hyphen_values = true)]
        position: Option<i64>,

        #[arg(long)]
        prefix: Option<String>,
    },

    /// Remove one parent edge of a note
    Unlink { parent: String, note: String },

    /// Best path and breadcrumb of a note
    Path { note: String },

    /// Save the current state of a note as a revision
    Snapshot { note: String },

    /// List revisions of a note, newest first
    #[command(alias = "ls")]
    Revisions { note: String },

    /// Print revision content
    Show {
        revision: String,

        /// Only print a bounded prefix
        #[arg(long)]
        preview: bool,
    },

    /// Restore a note to one of its revisions
    Restore { revision: String },

    /// Permanently delete revisions
    Erase {
        #[arg(required = true)]
        revisions: Vec<String>,
    },

    /// Permanently delete every revision of a note
    EraseAll { note: String },

    /// Notes edited on a date prefix (YYYY, YYYY-MM or YYYY-MM-DD)
    Edited { date: String },

    /// Delete blobs nothing references
    Gc,
}
