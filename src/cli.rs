//! # Command-Line Interface Module
//!
//! Clap definitions for the `songquiz` binary.
//!
//! ## Commands
//!
//! - `init-db`: Create the song database
//! - `import`: Load songs from a JSON file into the database
//! - `list`: Show the catalog
//! - `quiz`: Take the quiz in the terminal
//! - `estimate`: Recompute the estimate of a stored session
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! songquiz import songs.json
//! songquiz quiz --genre pop --genre "hip hop" --language Korean
//! songquiz estimate sess_k3j9x0ab1760000000000
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "songquiz")]
#[command(about = "Songquiz: how many songs do you know?")]
#[command(version)]
pub struct Args {
    /// Database file to use instead of the one in the data directory
    #[arg(long, global = true, env = "SONGQUIZ_DB")]
    pub db: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty song database
    InitDb {
        /// Delete and recreate the database if it already exists
        #[arg(long)]
        force: bool,
    },

    /// Import songs from a JSON file
    ///
    /// The file holds an array of song records with `id` (or `spotify_id`),
    /// `title`, `artist`, `genres`, `tier`, `popularity` and `region`.
    /// Songs with an existing id are replaced.
    Import {
        /// Path to the JSON file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },

    /// List songs in the catalog
    List {
        /// Only show songs of this tier
        #[arg(long)]
        tier: Option<u8>,
    },

    /// Take the quiz
    ///
    /// Pick the genres and languages you listen to most. Songs are drawn
    /// from the matching part of the catalog and asked one at a time;
    /// answer y or n. At the end you get an estimate of how many songs you
    /// know, and your answers are saved.
    Quiz {
        /// Genre you listen to (repeatable)
        #[arg(short, long = "genre")]
        genres: Vec<String>,

        /// Language you listen to (repeatable)
        #[arg(short, long = "language")]
        languages: Vec<String>,

        /// Seed for drawing songs, for a reproducible quiz
        #[arg(long)]
        seed: Option<u64>,

        /// Read songs from a JSON file instead of the database
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        catalog: Option<PathBuf>,

        /// Show each song's tier and why it was picked
        #[arg(short, long)]
        verbose: bool,
    },

    /// Recompute the estimate for a stored session
    Estimate {
        /// Session id printed at the end of a quiz
        session_id: String,
    },

    /// Generate shell completions
    ///
    /// Usage: songquiz completion bash > ~/.local/share/bash-completion/completions/songquiz
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
