//! Adaptive "how many songs do you know?" quiz.
//!
//! Core modules:
//! - [`song`] - Catalog records and answers
//! - [`guard`] - Over-test guard over (genre, tier) buckets
//! - [`selector`] - Next-song selection policy
//! - [`estimator`] - Stratified estimate of known songs
//! - [`session`] - Quiz session state machine
//!
//! ### Supporting Modules
//!
//! - [`catalog`] - Catalog sources and working-set sampling
//! - [`db`] - SQLite catalog and result storage
//! - [`config`] - Configuration and data directory management
//! - [`interactive`] - Terminal front end
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use songquiz::session::{Preferences, QuizSession};
//! use songquiz::song::Song;
//!
//! let catalog = vec![
//!     Song::new("S1", Some(1), &["pop"]),
//!     Song::new("S2", Some(1), &["rock"]),
//!     Song::new("S3", Some(2), &["pop"]),
//! ];
//!
//! let mut session = QuizSession::default();
//! session.begin(Preferences::new(["rock"], Vec::<String>::new()), catalog)?;
//!
//! while session.next_song().is_some() {
//!     session.record_answer(true)?;
//! }
//!
//! // Every tier fully known: 500 (tier 1) + 1500 (tier 2).
//! assert_eq!(session.final_estimate(), Some(2000));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Algorithm Details
//!
//! ### Selection
//! - The first song is simply the first in the session's catalog order
//! - After a "yes", probe the same tier outside the user's genres, then one
//!   tier lower in the same genre
//! - After a "no", retry one tier higher in the same genre, then explore an
//!   unseen genre at tier 3
//! - No (genre, tier) bucket is asked more than 3 times while anything else
//!   is left
//!
//! ### Estimation
//! - Hit rate per tier, times that tier's assumed population, summed
//! - Tiers never asked contribute nothing
//!
//! ## Error Handling
//!
//! Public functions that touch I/O return `anyhow::Result`. Selection and
//! estimation are infallible; malformed songs are defaulted rather than
//! rejected.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod estimator;
pub mod guard;
pub mod interactive;
pub mod selector;
pub mod session;
pub mod song;
