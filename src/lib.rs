//! Stowage: durable, collision-free on-disk storage for long-running
//! stateful processes.
//!
//! Stowage allocates uniquely named folders and files under a shared parent
//! directory, resolves naming collisions without clobbering existing data,
//! deduplicates backups by name, and maintains a small set of structured
//! metadata documents describing what has been stored. On top of that sits
//! a checkpoint session that tracks the owning process's current phase and
//! persists named, versioned saves of serializable objects.
//!
//! # Core Principles
//!
//! - **Never clobber**: every write path either targets a known-free name
//!   or explicitly opts into in-place overwrite
//! - **Missing is empty**: a document absent on load reads as an empty
//!   mapping, never an error
//! - **Partial success is observable**: batch operations (backups,
//!   multi-object loads) report per-item outcomes instead of aborting
//! - **Single writer per root**: name allocation is a check-time guarantee;
//!   callers ensure one process writes a given root at a time
//!
//! # Storage root layout
//!
//! ```text
//! <root>/
//!   main.json             config
//!   shared_storage.json   phase and session metadata
//!   file_tree.json        index mirroring files/
//!   tiny_db.json          checkpoint index
//!   old_documents/        retired document copies
//!   files/                checkpoint object files
//! ```
//!
//! # Example
//!
//! ```no_run
//! use stowage::core::checkpoint::{CheckpointSession, SessionOptions};
//! use stowage::core::root::StorageRoot;
//!
//! # fn main() -> Result<(), stowage::core::error::StowageError> {
//! let root = StorageRoot::open_or_create(
//!     std::path::Path::new("./experiment_store"),
//!     true,
//!     "unet_large",
//! )?;
//! let mut session = CheckpointSession::open(root, SessionOptions::default())?;
//! session.change_phase("training")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Structure
//!
//! - [`core::naming`]: unique name allocation (sequential counter, base-62)
//! - [`core::resolve`]: no-overwrite path resolution
//! - [`core::backup`]: non-duplicate backups
//! - [`core::docs`]: the structured-document codec
//! - [`core::root`]: storage-root layout and first-time setup
//! - [`core::checkpoint`]: the stateful checkpoint session

pub mod core;

use crate::core::checkpoint::{CheckpointSession, SessionOptions};
use crate::core::error::StowageError;
use crate::core::root::StorageRoot;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "stowage",
    version = env!("CARGO_PKG_VERSION"),
    about = "Durable, collision-free storage roots and versioned checkpoints"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open or create a storage root and print where it landed
    Init {
        /// Exact root path, or a container directory with --container
        path: PathBuf,
        /// Treat PATH as a container and allocate a fresh child inside it
        #[clap(long)]
        container: bool,
        /// Readable id appended to the allocated folder name
        #[clap(long, default_value = "")]
        semantic_id: String,
    },
    /// Print a status summary for an existing storage root
    Status {
        root: PathBuf,
    },
    /// List checkpoint records for an existing storage root
    Checkpoints {
        root: PathBuf,
    },
}

/// Thin CLI entry point; all real behavior lives in [`core`].
pub fn run() -> Result<(), StowageError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init {
            path,
            container,
            semantic_id,
        } => {
            let root = StorageRoot::open_or_create(&path, container, &semantic_id)?;
            println!(
                "{} Storage root ready at {}",
                "✓".bright_green(),
                root.root().display().to_string().bright_white()
            );
        }
        Command::Status { root } => {
            let root = StorageRoot::open_existing(&root)?;
            let session = CheckpointSession::open(root, SessionOptions::default())?;
            let status = session.status();
            println!(
                "{}",
                serde_json::to_string_pretty(&status).map_err(StowageError::JsonError)?
            );
        }
        Command::Checkpoints { root } => {
            let root = StorageRoot::open_existing(&root)?;
            let session = CheckpointSession::open(root, SessionOptions::default())?;
            let records = session.checkpoints();
            if records.is_empty() {
                println!("No checkpoints recorded yet.");
            } else {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&records).map_err(StowageError::JsonError)?
                );
            }
        }
    }
    Ok(())
}
