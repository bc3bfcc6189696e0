//! # Songquiz
//!
//! Terminal quiz that estimates how many songs you know. It asks about a
//! few dozen songs, steering each question by your previous answer, and
//! extrapolates your hit rate per difficulty tier to the whole catalog.
//!
//! ## Usage
//!
//! ```bash
//! # Create the database and load a catalog
//! songquiz init-db
//! songquiz import songs.json
//!
//! # Take the quiz
//! songquiz quiz --genre pop --genre indie
//!
//! # Recompute a stored session's estimate
//! songquiz estimate sess_k3j9x0ab1760000000000
//! ```

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use songquiz::catalog::{self, CatalogSource, StaticCatalog};
use songquiz::config::RuntimeConfig;
use songquiz::db::SqliteStore;
use songquiz::estimator::EstimateBreakdown;
use songquiz::interactive::{self, QuizOutcome};
use songquiz::session::Preferences;
use songquiz::{cli, completion};
use std::io;

/// Main entry point for Songquiz.
///
/// Initializes logging, parses command-line arguments, and routes commands
/// to the library.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug songquiz quiz` - Enable debug logging
/// - `RUST_LOG=songquiz::selector=trace songquiz quiz` - Trace every selection
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    let mut runtime = RuntimeConfig::new()?;
    if let Some(db) = args.db {
        debug!("Using database override {}", db.display());
        runtime.db_path = db;
    }

    match args.command {
        cli::Command::InitDb { force } => {
            SqliteStore::init(&runtime.db_path, force)?;
            println!("Database ready at {}", runtime.db_path.display());
        }
        cli::Command::Import { path } => {
            let songs = StaticCatalog::from_json_file(&path)?;
            let mut store = SqliteStore::open(&runtime.db_path)?;
            let count = store.import_songs(songs.songs())?;
            println!("Imported {count} songs ({} in catalog)", store.song_count()?);
        }
        cli::Command::List { tier } => {
            let store = SqliteStore::open(&runtime.db_path)?;
            let songs = store.all_songs()?;
            let mut shown = 0;
            for song in songs.iter().filter(|s| tier.map_or(true, |t| s.tier == t)) {
                println!(
                    "[{}] {} - {} ({}) pop {} [{}]",
                    song.tier,
                    song.artist,
                    song.title,
                    song.id,
                    song.popularity,
                    song.genre_label()
                );
                shown += 1;
            }
            println!("{shown} songs");
        }
        cli::Command::Quiz { genres, languages, seed, catalog: catalog_file, verbose } => {
            let preferences = Preferences::new(genres, languages);
            if preferences.is_empty() {
                bail!(
                    "Pick at least one --genre or --language. Genres: {}. Languages: {}.",
                    catalog::GENRE_OPTIONS.join(", "),
                    catalog::LANGUAGE_OPTIONS.join(", ")
                );
            }

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let file_catalog = catalog_file.as_deref().map(StaticCatalog::from_json_file).transpose()?;
            let db_catalog;
            let source: &dyn CatalogSource = if let Some(songs) = &file_catalog {
                songs
            } else {
                db_catalog = SqliteStore::open(&runtime.db_path)?;
                &db_catalog
            };
            let mut sink = SqliteStore::open(&runtime.db_path)?;

            let stdin = io::stdin();
            let outcome = interactive::play(
                source,
                &mut sink,
                &runtime.quiz,
                preferences,
                &mut rng,
                &mut stdin.lock(),
                &mut io::stdout(),
                verbose,
            )?;

            if let QuizOutcome::Completed { session_id, estimate } = outcome {
                info!("Session {session_id} finished with estimate {estimate}");
                println!("Session id: {session_id}");
            }
        }
        cli::Command::Estimate { session_id } => {
            let store = SqliteStore::open(&runtime.db_path)?;
            let responses = store.session_responses(&session_id)?;
            let breakdown = EstimateBreakdown::from_log(&responses, &runtime.quiz.populations);

            for tally in &breakdown.tiers {
                println!(
                    "tier {}: {}/{} known ({:.0}%) of {}",
                    tally.tier,
                    tally.known,
                    tally.asked,
                    tally.hit_rate() * 100.0,
                    tally.population
                );
            }
            println!("Estimate: {}", breakdown.total());

            if let Some(summary) = store.session_summary(&session_id)? {
                println!("Estimate when taken: {}", summary.estimate);
            }
            for feedback in store.session_feedback(&session_id)? {
                println!("Feedback: {feedback}");
            }
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}
