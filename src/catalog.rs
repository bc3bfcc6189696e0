//! Catalog source: which songs a session gets to ask about.
//!
//! The session never sees the full catalog. A source returns a candidate
//! pool (easiest tiers first, restricted by the user's genres and languages)
//! and [`working_set`] shuffles it down to a fixed-size sample. The sample's
//! order becomes the selector's tie-break order, so a seeded RNG gives a
//! reproducible quiz.

use crate::session::Preferences;
use crate::song::Song;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::Path;

/// Genres offered during onboarding.
pub const GENRE_OPTIONS: &[&str] = &[
    "pop", "rock", "hip hop", "jazz", "classical", "indie", "metal", "lo-fi", "r&b",
    "electronic", "folk", "country", "latin", "kpop", "jpop", "afrobeat", "ambient", "other",
];

/// Languages offered during onboarding.
pub const LANGUAGE_OPTIONS: &[&str] = &[
    "English", "Spanish", "French", "Japanese", "Korean", "Portuguese", "Arabic", "Other",
];

/// Region code used to approximate a language.
#[must_use]
pub fn region_for_language(language: &str) -> Option<&'static str> {
    match language {
        "Japanese" => Some("JP"),
        "Korean" => Some("KR"),
        "Portuguese" => Some("BR"),
        "French" => Some("FR"),
        "Arabic" => Some("AF"),
        "Spanish" => Some("ES"),
        _ => None,
    }
}

/// Regions to restrict the pool to, or `None` for no region filter.
///
/// English as the first choice means "no restriction", as does a list in
/// which no language maps to a region.
#[must_use]
pub fn region_filter(languages: &[String]) -> Option<Vec<&'static str>> {
    match languages.first() {
        None => None,
        Some(first) if first == "English" => None,
        Some(_) => {
            let regions: Vec<&'static str> = languages
                .iter()
                .filter_map(|l| region_for_language(l))
                .collect();
            (!regions.is_empty()).then_some(regions)
        }
    }
}

/// Warn about preference values outside the onboarding option lists.
pub fn check_preferences(preferences: &Preferences) {
    for genre in &preferences.genres {
        if !GENRE_OPTIONS.contains(&genre.as_str()) {
            warn!("Unknown genre `{genre}', keeping it anyway");
        }
    }
    for language in &preferences.languages {
        if !LANGUAGE_OPTIONS.contains(&language.as_str()) {
            warn!("Unknown language `{language}', keeping it anyway");
        }
    }
}

/// True if `song` passes the genre and region restrictions.
#[must_use]
pub fn matches_preferences(song: &Song, genres: &[String], regions: Option<&[&str]>) -> bool {
    let genre_ok = genres.is_empty() || song.shares_genre_with(genres);
    let region_ok = regions.map_or(true, |allowed| {
        song.region
            .as_deref()
            .is_some_and(|region| allowed.contains(&region))
    });
    genre_ok && region_ok
}

/// Supplies candidate songs for a session.
pub trait CatalogSource {
    /// At most `limit` songs matching `preferences`, ordered by tier
    /// ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn candidate_pool(&self, preferences: &Preferences, limit: usize) -> Result<Vec<Song>>;
}

/// Catalog held in memory, e.g. read from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    songs: Vec<Song>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(songs: Vec<Song>) -> Self {
        Self { songs }
    }

    /// Read a JSON array of song records.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or not a song array.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let songs = parse_songs(&text)
            .with_context(|| format!("Invalid catalog file {}", path.display()))?;
        info!("Loaded {} songs from {}", songs.len(), path.display());
        Ok(Self::new(songs))
    }

    #[must_use]
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }
}

impl CatalogSource for StaticCatalog {
    fn candidate_pool(&self, preferences: &Preferences, limit: usize) -> Result<Vec<Song>> {
        let regions = region_filter(&preferences.languages);
        let mut pool: Vec<Song> = self
            .songs
            .iter()
            .filter(|song| matches_preferences(song, &preferences.genres, regions.as_deref()))
            .cloned()
            .collect();
        pool.sort_by_key(|song| song.tier);
        pool.truncate(limit);
        Ok(pool)
    }
}

/// Parse a JSON array of song records, warning about tiers outside 1–5.
/// Records that cannot be read as a song at all (no string `id`) are
/// skipped with a warning.
///
/// # Errors
///
/// Returns an error if `text` is not a JSON array.
pub fn parse_songs(text: &str) -> Result<Vec<Song>> {
    let records: Vec<serde_json::Value> =
        serde_json::from_str(text).context("Expected a JSON array of songs")?;

    let mut songs = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Song>(record) {
            Ok(song) => {
                if !crate::song::TIER_RANGE.contains(&song.tier) {
                    warn!("Song `{}' has out-of-range tier {}", song.id, song.tier);
                }
                songs.push(song);
            }
            Err(e) => warn!("Skipping song record {index}: {e}"),
        }
    }
    Ok(songs)
}

/// Draw the session's songs: shuffle the candidate pool and keep
/// `sample_size` of them.
///
/// # Errors
///
/// Propagates errors from the catalog source.
pub fn working_set<C, R>(
    source: &C,
    preferences: &Preferences,
    fetch_limit: usize,
    sample_size: usize,
    rng: &mut R,
) -> Result<Vec<Song>>
where
    C: CatalogSource + ?Sized,
    R: Rng + ?Sized,
{
    let mut pool = source
        .candidate_pool(preferences, fetch_limit)
        .context("Failed to load candidate songs")?;
    debug!("Candidate pool holds {} songs", pool.len());

    pool.shuffle(rng);
    pool.truncate(sample_size);
    Ok(pool)
}
