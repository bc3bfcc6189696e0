//! Over-test guard.
//!
//! Counts how many answered songs fall into each (genre, tier) bucket and
//! flags songs whose bucket is already full. The counter is rebuilt from the
//! response log on every query, so it can never drift from the log.

use crate::song::{Response, Song};
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// Songs per (genre, tier) bucket before the bucket counts as over-tested.
pub const OVER_TEST_CAP: u32 = 3;

/// Composite bucket key. Kept structured so that no genre string can
/// collide with another genre/tier pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub genre: String,
    pub tier: u8,
}

impl BucketKey {
    #[must_use]
    pub fn new(genre: impl Into<String>, tier: u8) -> Self {
        Self { genre: genre.into(), tier }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tier {}", self.genre, self.tier)
    }
}

/// Per-bucket presentation counts derived from a response log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketCounter {
    counts: HashMap<BucketKey, u32>,
}

impl BucketCounter {
    /// Count every (genre, tier) pair across the whole log. A song with
    /// genres {A, B} at tier 2 adds one to (A, 2) and one to (B, 2).
    #[must_use]
    pub fn from_log(log: &[Response]) -> Self {
        let mut counts = HashMap::new();
        for response in log {
            for genre in &response.song.genres {
                *counts
                    .entry(BucketKey::new(genre.as_str(), response.song.tier))
                    .or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    /// Responses seen for this bucket so far.
    #[must_use]
    pub fn count(&self, genre: &str, tier: u8) -> u32 {
        self.counts
            .get(&BucketKey::new(genre, tier))
            .copied()
            .unwrap_or(0)
    }

    /// True iff any genre of `song`, at the song's tier, has reached
    /// [`OVER_TEST_CAP`]. Songs without genres are never over-tested.
    #[must_use]
    pub fn is_over_tested(&self, song: &Song) -> bool {
        let saturated = song
            .genres
            .iter()
            .find(|genre| self.count(genre, song.tier) >= OVER_TEST_CAP);

        if let Some(genre) = saturated {
            debug!("`{}' over-tested: bucket ({genre}, {}) is full", song.id, song.tier);
            return true;
        }
        false
    }

    /// Buckets that reached the cap, sorted for stable output.
    #[must_use]
    pub fn saturated(&self) -> Vec<BucketKey> {
        let mut full: Vec<BucketKey> = self
            .counts
            .iter()
            .filter(|&(_, &n)| n >= OVER_TEST_CAP)
            .map(|(key, _)| key.clone())
            .collect();
        full.sort();
        full
    }
}
