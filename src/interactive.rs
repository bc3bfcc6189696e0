//! Terminal front end for a quiz session.
//!
//! Everything here works on any `BufRead`/`Write` pair, so the same code
//! serves stdin/stdout and scripted input in tests.

use crate::catalog::{self, CatalogSource};
use crate::config::QuizConfig;
use crate::db::ResultSink;
use crate::session::{Preferences, QuizSession};
use anyhow::{Context, Result};
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::io::{BufRead, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// A line typed at the song prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Yes,
    No,
    Quit,
}

impl Reply {
    /// Parse a prompt answer, case-insensitively. Unknown input gives `None`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Self::Yes),
            "n" | "no" => Some(Self::No),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizOutcome {
    /// All questions answered and stored under `session_id`.
    Completed { session_id: String, estimate: u64 },
    /// No song matched, so nothing was asked or stored.
    NothingAsked,
    /// The user quit before the end; nothing was stored.
    Aborted,
}

/// `sess_` + 8 lowercase alphanumerics + unix millis.
pub fn new_session_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..8)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!("sess_{suffix}{millis}")
}

/// Read one line; `None` on end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    Ok((read > 0).then_some(line))
}

/// Ask about songs until the session finishes. End of input counts as quitting.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub fn ask_questions<R: BufRead, W: Write>(
    session: &mut QuizSession,
    input: &mut R,
    out: &mut W,
    verbose: bool,
) -> Result<bool> {
    let total = session.planned_length();

    while let Some(song) = session.next_song() {
        writeln!(out)?;
        writeln!(out, "Do you know this song?")?;
        writeln!(out, "  {}", song.title)?;
        writeln!(out, "  {}", song.artist)?;
        writeln!(out, "  Popularity: {}", song.popularity)?;
        writeln!(out, "  Genres: {}", song.genre_label())?;
        if verbose {
            if let Some(rule) = session.last_rule() {
                writeln!(out, "  [tier {}, picked by: {rule}]", song.tier)?;
            }
            let full = session.buckets().saturated();
            if !full.is_empty() {
                let labels: Vec<String> = full.iter().map(ToString::to_string).collect();
                writeln!(out, "  [full: {}]", labels.join(", "))?;
            }
        }
        writeln!(out, "Song {} of {total}", session.position())?;

        let reply = loop {
            write!(out, "[y]es / [n]o / [q]uit > ")?;
            out.flush()?;
            let Some(line) = read_line(input)? else {
                break Reply::Quit;
            };
            match Reply::parse(&line) {
                Some(reply) => break reply,
                None => writeln!(out, "Please answer y or n.")?,
            }
        };

        match reply {
            Reply::Yes => session.record_answer(true)?,
            Reply::No => session.record_answer(false)?,
            Reply::Quit => {
                info!("Quiz abandoned after {} answers", session.responses().len());
                return Ok(false);
            }
        }
    }

    Ok(true)
}

/// Print the end-of-quiz screen.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub fn print_summary<W: Write>(session: &QuizSession, out: &mut W) -> Result<()> {
    let total = session.responses().len();
    writeln!(out)?;
    writeln!(out, "Quiz Complete!")?;
    writeln!(out, "You knew {} out of {total} songs!", session.known_count())?;
    if let Some(estimate) = session.final_estimate() {
        writeln!(out, "We estimate you know around {estimate} songs.")?;
    }

    if total == 0 {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "Your Answers")?;
    writeln!(out, "{:<32} {:<24} {:<6} {:>10}  Genres", "Title", "Artist", "Known?", "Popularity")?;
    for response in session.responses() {
        let song = &response.song;
        writeln!(
            out,
            "{:<32} {:<24} {:<6} {:>10}  {}",
            truncate(&song.title, 32),
            truncate(&song.artist, 24),
            if response.known { "Yes" } else { "No" },
            song.popularity,
            song.genre_label()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "By tier:")?;
    for tally in session.breakdown().tiers {
        writeln!(
            out,
            "  tier {}: {}/{} known, ~{:.0} of {}",
            tally.tier,
            tally.known,
            tally.asked,
            tally.contribution(),
            tally.population
        )?;
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

/// Run a whole quiz: draw songs, ask, show results, store them and collect
/// optional feedback.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read, on I/O failure, or if the
/// results cannot be stored.
#[allow(clippy::too_many_arguments)]
pub fn play<C, S, G, R, W>(
    source: &C,
    sink: &mut S,
    config: &QuizConfig,
    preferences: Preferences,
    rng: &mut G,
    input: &mut R,
    out: &mut W,
    verbose: bool,
) -> Result<QuizOutcome>
where
    C: CatalogSource + ?Sized,
    S: ResultSink + ?Sized,
    G: Rng + ?Sized,
    R: BufRead,
    W: Write,
{
    catalog::check_preferences(&preferences);
    let songs = catalog::working_set(source, &preferences, config.fetch_limit, config.sample_size, rng)?;
    if songs.is_empty() {
        writeln!(out, "No songs found.")?;
        warn!("No catalog songs match the chosen genres and languages");
    }

    let mut session = QuizSession::new(config.max_responses, config.populations.clone());
    session.begin(preferences, songs)?;

    if !ask_questions(&mut session, input, out, verbose)? {
        writeln!(out, "Quiz abandoned, nothing saved.")?;
        return Ok(QuizOutcome::Aborted);
    }

    print_summary(&session, out)?;

    if session.responses().is_empty() {
        return Ok(QuizOutcome::NothingAsked);
    }

    let session_id = new_session_id(rng);
    let estimate = session.final_estimate().unwrap_or(0);

    match sink.record_session(&session_id, &session.response_rows(), estimate) {
        Ok(()) => writeln!(out, "Results saved!")?,
        Err(e) => {
            writeln!(out, "Error saving your results: {e:#}")?;
            return Err(e);
        }
    }

    writeln!(out)?;
    writeln!(out, "Feedback: what did you think of this quiz? (empty line to skip)")?;
    write!(out, "> ")?;
    out.flush()?;
    if let Some(text) = read_line(input)? {
        if sink.record_feedback(&session_id, &text)? {
            writeln!(out, "Thank you for your feedback!")?;
        }
    }

    Ok(QuizOutcome::Completed { session_id, estimate })
}
