use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Edit documents offline and sync them with conflict resolution")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the local document cache
    #[arg(long, global = true, value_name = "PATH")]
    pub local_db: Option<PathBuf>,

    /// Path to the database acting as the remote store
    #[arg(long, global = true, value_name = "PATH")]
    pub remote_db: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a document remotely and cache it locally
    New {
        /// Document title
        #[arg(long)]
        title: String,
        /// Initial serialized block content
        #[arg(long)]
        content: Option<String>,
    },
    /// List cached documents
    List {
        /// Number of documents to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one document
    Show {
        /// Document ID
        id: String,
        /// Read the remote copy instead of the local cache
        #[arg(long)]
        remote: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one field of a document
    Edit {
        /// Document ID
        id: String,
        /// Field name (title, content, font, icon, coverImage, isFavorite)
        #[arg(long)]
        field: String,
        /// New value; empty clears optional fields
        #[arg(long, allow_hyphen_values = true)]
        value: String,
        /// Commit straight to the remote, as another device would
        #[arg(long)]
        remote: bool,
    },
    /// Reconcile the local and remote copies of a document
    Sync {
        /// Document ID
        id: String,
        /// Settle every manual conflict for one side instead of prompting
        #[arg(long, value_enum)]
        prefer: Option<Side>,
        /// Output the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Side {
    Local,
    Remote,
}
