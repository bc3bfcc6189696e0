//! Catalog records and the answers given about them.
//!
//! Songs arrive from the catalog collaborator and are never mutated during a
//! quiz. Records with missing or malformed data are tolerated rather than
//! rejected: a missing or unusable tier reads as [`DEFAULT_TIER`], a bare
//! genre string reads as a one-element set and anything else unusable in
//! `genres` reads as an empty set.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Tier assumed for songs that carry none (the rarest bucket).
pub const DEFAULT_TIER: u8 = 5;

/// Lowest and highest tiers the catalog is expected to use.
pub const TIER_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Unique identifier (a Spotify track id in the hosted catalog).
    #[serde(alias = "spotify_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub artist: String,
    /// Genre tags. Order is kept as supplied; may be empty.
    #[serde(default, deserialize_with = "lenient_genres")]
    pub genres: Vec<String>,
    /// Difficulty tier, 1 (popular) through 5 (rare).
    #[serde(default = "default_tier", deserialize_with = "lenient_tier")]
    pub tier: u8,
    /// Display only.
    #[serde(default, deserialize_with = "lenient_popularity")]
    pub popularity: u32,
    /// Region code used by the catalog's language filter.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_region")]
    pub region: Option<String>,
}

const fn default_tier() -> u8 {
    DEFAULT_TIER
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Array of strings, a single string, or null. Non-string entries are dropped.
fn lenient_genres<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let genres = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::String(genre) if genre.trim().is_empty() => Vec::new(),
        Value::String(genre) => vec![genre],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(genre) => Some(genre),
                other => {
                    warn!("Ignoring non-string genre {other}");
                    None
                }
            })
            .collect(),
        other => {
            warn!("Ignoring malformed genres {other}");
            Vec::new()
        }
    };
    Ok(genres)
}

fn lenient_tier<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(DEFAULT_TIER);
    }
    match value.as_u64().and_then(|tier| u8::try_from(tier).ok()) {
        Some(tier) => Ok(tier),
        None => {
            warn!("Malformed tier {value}, using {DEFAULT_TIER}");
            Ok(DEFAULT_TIER)
        }
    }
}

fn lenient_popularity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or_else(|| {
            if !value.is_null() {
                warn!("Malformed popularity {value}, using 0");
            }
            0
        }))
}

fn lenient_region<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(region) => Some(region),
        Value::Null => None,
        other => {
            warn!("Ignoring malformed region {other}");
            None
        }
    })
}

impl Song {
    /// Build a song with the fields the quiz logic cares about.
    #[must_use]
    pub fn new(id: impl Into<String>, tier: Option<u8>, genres: &[&str]) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            artist: String::new(),
            genres: genres.iter().map(|g| (*g).to_string()).collect(),
            tier: tier.unwrap_or(DEFAULT_TIER),
            popularity: 0,
            region: None,
        }
    }

    /// True if this song carries the genre tag `genre`.
    #[must_use]
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g == genre)
    }

    /// True if any genre of this song appears in `genres`.
    #[must_use]
    pub fn shares_genre_with<'a, I>(&self, genres: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        genres.into_iter().any(|g| self.has_genre(g))
    }

    /// Comma separated genre list for display.
    #[must_use]
    pub fn genre_label(&self) -> String {
        self.genres.join(", ")
    }
}

/// One yes/no answer. Its position in the session log is its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub song: Song,
    pub known: bool,
}

impl Response {
    #[must_use]
    pub fn new(song: Song, known: bool) -> Self {
        Self { song, known }
    }
}

/// What the persistence sink receives for each answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub song_id: String,
    pub known: bool,
}

impl From<&Response> for ResponseRow {
    fn from(response: &Response) -> Self {
        Self {
            song_id: response.song.id.clone(),
            known: response.known,
        }
    }
}
