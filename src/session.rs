//! Quiz session state.
//!
//! `QuizSession` owns the response log and is the only thing allowed to
//! append to it. Hosts drive it with three calls:
//!
//! 1. [`QuizSession::begin`] with the onboarding preferences and the catalog,
//! 2. [`QuizSession::next_song`] / [`QuizSession::record_answer`] in turns,
//! 3. [`QuizSession::final_estimate`] once the session is finished.
//!
//! ```text
//! Onboarding ──begin──▶ InProgress ──(catalog exhausted | cap reached)──▶ Finished
//!                        ▲      │
//!                        └answer┘
//! ```

use crate::estimator::{self, EstimateBreakdown, TierPopulation};
use crate::guard::BucketCounter;
use crate::selector::{self, SelectionRule};
use crate::song::{Response, ResponseRow, Song};
use anyhow::{bail, Result};
use log::{debug, info};
use std::collections::HashSet;

/// Default cap on answers per session.
pub const MAX_RESPONSES: usize = 30;

/// Choices made before the quiz starts. Only `genres` reaches the selector;
/// `languages` is for the catalog source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub genres: Vec<String>,
    pub languages: Vec<String>,
}

impl Preferences {
    /// Build preferences, dropping blanks and duplicates while keeping order.
    #[must_use]
    pub fn new<G, L>(genres: G, languages: L) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        Self {
            genres: dedup(genres),
            languages: dedup(languages),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.languages.is_empty()
    }
}

fn dedup<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| Into::<String>::into(item).trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    Onboarding,
    InProgress,
    Finished,
}

/// One user's run through the quiz.
#[derive(Debug, Clone)]
pub struct QuizSession {
    state: QuizState,
    preferences: Preferences,
    catalog: Vec<Song>,
    log: Vec<Response>,
    answered: HashSet<String>,
    /// Catalog index of the song currently on screen.
    current: Option<usize>,
    last_rule: Option<SelectionRule>,
    max_responses: usize,
    populations: TierPopulation,
    estimate: Option<u64>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(MAX_RESPONSES, TierPopulation::default())
    }
}

impl QuizSession {
    /// New session in `Onboarding`, finishing after at most `max_responses`
    /// answers and estimating against `populations`.
    #[must_use]
    pub fn new(max_responses: usize, populations: TierPopulation) -> Self {
        Self {
            state: QuizState::Onboarding,
            preferences: Preferences::default(),
            catalog: Vec::new(),
            log: Vec::new(),
            answered: HashSet::new(),
            current: None,
            last_rule: None,
            max_responses,
            populations,
            estimate: None,
        }
    }

    /// Leave onboarding with the user's choices and the session's catalog.
    /// An empty catalog finishes the session at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has already begun.
    pub fn begin(&mut self, preferences: Preferences, catalog: Vec<Song>) -> Result<()> {
        if self.state != QuizState::Onboarding {
            bail!("Quiz already started (state: {:?})", self.state);
        }

        info!(
            "Starting quiz with {} songs, genres [{}], languages [{}]",
            catalog.len(),
            preferences.genres.join(", "),
            preferences.languages.join(", ")
        );

        self.preferences = preferences;
        self.catalog = catalog;
        self.state = QuizState::InProgress;
        self.advance();
        Ok(())
    }

    /// Song waiting for an answer, or `None` once nothing is left to ask.
    #[must_use]
    pub fn next_song(&self) -> Option<&Song> {
        self.current.map(|idx| &self.catalog[idx])
    }

    /// Record the user's answer for the current song and move on.
    ///
    /// # Errors
    ///
    /// Returns an error outside `InProgress`.
    pub fn record_answer(&mut self, known: bool) -> Result<()> {
        let Some(idx) = self.current.filter(|_| self.state == QuizState::InProgress) else {
            bail!("No song is awaiting an answer (state: {:?})", self.state);
        };

        let song = self.catalog[idx].clone();
        debug!("Answer {} for `{}' (tier {})", if known { "yes" } else { "no" }, song.id, song.tier);
        self.answered.insert(song.id.clone());
        self.log.push(Response::new(song, known));
        self.advance();
        Ok(())
    }

    /// Pick the next song or finish.
    fn advance(&mut self) {
        self.current = None;
        self.last_rule = None;

        if self.log.len() >= self.max_responses {
            debug!("Response cap of {} reached", self.max_responses);
            self.finish();
            return;
        }

        let remaining: Vec<&Song> = self
            .catalog
            .iter()
            .filter(|song| !self.answered.contains(&song.id))
            .collect();

        let chosen = selector::select_with_rule(&remaining, &self.log, &self.preferences.genres)
            .map(|selection| (selection.song.id.clone(), selection.rule));

        match chosen {
            Some((id, rule)) => {
                self.current = self.catalog.iter().position(|song| song.id == id);
                self.last_rule = Some(rule);
            }
            None => self.finish(),
        }
    }

    fn finish(&mut self) {
        let estimate = estimator::estimate(&self.log, &self.populations);
        info!(
            "Quiz finished after {} responses ({} known), estimate {estimate}",
            self.log.len(),
            self.known_count()
        );
        self.estimate = Some(estimate);
        self.state = QuizState::Finished;
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == QuizState::Finished
    }

    /// Estimated number of known songs; `None` until finished.
    #[must_use]
    pub fn final_estimate(&self) -> Option<u64> {
        self.estimate
    }

    /// Per-tier detail behind the estimate.
    #[must_use]
    pub fn breakdown(&self) -> EstimateBreakdown {
        EstimateBreakdown::from_log(&self.log, &self.populations)
    }

    /// Rule that picked the current song.
    #[must_use]
    pub fn last_rule(&self) -> Option<SelectionRule> {
        self.last_rule
    }

    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.log
    }

    /// Answers in order, as handed to the persistence sink.
    #[must_use]
    pub fn response_rows(&self) -> Vec<ResponseRow> {
        self.log.iter().map(ResponseRow::from).collect()
    }

    #[must_use]
    pub fn known_count(&self) -> usize {
        self.log.iter().filter(|r| r.known).count()
    }

    /// Number of songs presented so far, counting the one on screen.
    #[must_use]
    pub fn position(&self) -> usize {
        self.log.len() + usize::from(self.current.is_some())
    }

    /// Upper bound on the number of questions this session will ask.
    #[must_use]
    pub fn planned_length(&self) -> usize {
        self.catalog.len().min(self.max_responses)
    }

    /// Bucket counts as of the last recorded answer.
    #[must_use]
    pub fn buckets(&self) -> BucketCounter {
        BucketCounter::from_log(&self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::OVER_TEST_CAP;

    fn song(id: &str, tier: u8, genres: &[&str]) -> Song {
        Song::new(id, Some(tier), genres)
    }

    fn started(catalog: Vec<Song>, genres: &[&str]) -> QuizSession {
        let mut session = QuizSession::default();
        session
            .begin(Preferences::new(genres.iter().copied(), Vec::<String>::new()), catalog)
            .unwrap();
        session
    }

    fn current_id(session: &QuizSession) -> Option<String> {
        session.next_song().map(|s| s.id.clone())
    }

    #[test]
    fn test_preferences_drop_blanks_and_duplicates() {
        let prefs = Preferences::new(["pop", " ", "rock", "pop"], ["English"]);
        assert_eq!(prefs.genres, vec!["pop", "rock"]);
        assert_eq!(prefs.languages, vec!["English"]);
        assert!(Preferences::default().is_empty());
    }

    #[test]
    fn test_starts_in_onboarding() {
        let mut session = QuizSession::default();
        assert_eq!(session.state(), QuizState::Onboarding);
        assert!(session.next_song().is_none());
        assert!(session.record_answer(true).is_err());
        assert!(session.final_estimate().is_none());
    }

    #[test]
    fn test_empty_catalog_finishes_immediately() {
        let session = started(Vec::new(), &["pop"]);
        assert!(session.is_finished());
        assert_eq!(session.final_estimate(), Some(0));
    }

    #[test]
    fn test_begin_twice_is_rejected() {
        let mut session = started(vec![song("a", 1, &["pop"])], &[]);
        assert!(session.begin(Preferences::default(), Vec::new()).is_err());
    }

    #[test]
    fn test_three_song_walkthrough() {
        let catalog = vec![
            song("S1", 1, &["pop"]),
            song("S2", 1, &["rock"]),
            song("S3", 2, &["pop"]),
        ];
        let mut session = started(catalog, &["rock"]);

        assert_eq!(current_id(&session).as_deref(), Some("S1"));
        session.record_answer(true).unwrap();
        assert_eq!(current_id(&session).as_deref(), Some("S2"));
        session.record_answer(false).unwrap();
        assert_eq!(current_id(&session).as_deref(), Some("S3"));
        session.record_answer(true).unwrap();

        assert!(session.is_finished());
        assert!(session.record_answer(true).is_err());
        // tier 1: 1/2 * 500, tier 2: 1/1 * 1500
        assert_eq!(session.final_estimate(), Some(1750));
        assert_eq!(
            session.response_rows(),
            vec![
                ResponseRow { song_id: "S1".into(), known: true },
                ResponseRow { song_id: "S2".into(), known: false },
                ResponseRow { song_id: "S3".into(), known: true },
            ]
        );
    }

    #[test]
    fn test_response_cap_finishes_session() {
        let catalog: Vec<Song> = (0..10).map(|i| song(&format!("s{i}"), 2, &[])).collect();
        let mut session = QuizSession::new(4, TierPopulation::default());
        session.begin(Preferences::default(), catalog).unwrap();
        assert_eq!(session.planned_length(), 4);

        for _ in 0..4 {
            assert!(!session.is_finished());
            session.record_answer(true).unwrap();
        }
        assert!(session.is_finished());
        assert_eq!(session.responses().len(), 4);
        assert_eq!(session.final_estimate(), Some(1500));
    }

    #[test]
    fn test_no_repeats_and_termination() {
        let genres = ["pop", "rock", "jazz", "folk"];
        let catalog: Vec<Song> = (0..24)
            .map(|i| song(&format!("s{i}"), (i % 5) as u8 + 1, &[genres[i % 4], genres[(i + 1) % 4]]))
            .collect();
        let mut session = started(catalog.clone(), &["rock"]);

        let mut seen = HashSet::new();
        let mut steps = 0;
        while let Some(id) = current_id(&session) {
            assert!(seen.insert(id), "song presented twice");
            session.record_answer(steps % 3 == 0).unwrap();
            steps += 1;
            assert!(steps <= catalog.len());
        }
        assert!(session.is_finished());
        assert_eq!(seen.len(), catalog.len());
    }

    #[test]
    fn test_guard_cap_holds_while_alternatives_exist() {
        // Plenty of jazz at tier 2, plus enough other buckets to fall back on.
        let mut catalog: Vec<Song> = (0..8).map(|i| song(&format!("jazz{i}"), 2, &["jazz"])).collect();
        catalog.extend((0..8).map(|i| song(&format!("other{i}"), (i % 5) as u8 + 1, &[])));
        let mut session = started(catalog, &[]);

        for _ in 0..11 {
            session.record_answer(true).unwrap();
        }
        assert_eq!(session.buckets().count("jazz", 2), OVER_TEST_CAP);

        // Only over-tested jazz is left now.
        assert_eq!(session.last_rule(), Some(SelectionRule::LastResort));
        assert!(current_id(&session).is_some_and(|id| id.starts_with("jazz")));
    }

    #[test]
    fn test_same_inputs_same_session() {
        let catalog: Vec<Song> = (0..15)
            .map(|i| song(&format!("s{i}"), (i % 5) as u8 + 1, &[["pop", "rock", "metal"][i % 3]]))
            .collect();
        let answers = [true, false, false, true, true, false, true, false];

        let run = || {
            let mut session = started(catalog.clone(), &["pop"]);
            for &known in &answers {
                session.record_answer(known).unwrap();
            }
            (session.response_rows(), current_id(&session))
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_answered_ids_match_log() {
        let catalog: Vec<Song> = (0..6).map(|i| song(&format!("s{i}"), 3, &["pop"])).collect();
        let mut session = started(catalog, &[]);
        session.record_answer(false).unwrap();
        session.record_answer(true).unwrap();

        let logged: HashSet<String> = session.responses().iter().map(|r| r.song.id.clone()).collect();
        assert_eq!(logged, session.answered);
        assert_eq!(session.position(), 3);
    }
}
