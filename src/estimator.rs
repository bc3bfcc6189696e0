//! Knowledge-size estimation.
//!
//! Stratified point estimate: the hit rate observed inside each tier is
//! applied to that tier's population size, and the products are summed.
//!
//! ```text
//! estimate(log) = round( Σ_tier  known(tier) / asked(tier) * population(tier) )
//! ```
//!
//! Tiers that were never asked contribute nothing; there is no extrapolation
//! beyond the tiers actually sampled.

use crate::song::Response;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Assumed number of songs in each tier of the full catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierPopulation(BTreeMap<u8, u32>);

impl Default for TierPopulation {
    fn default() -> Self {
        Self(BTreeMap::from([(1, 500), (2, 1500), (3, 3000), (4, 4000), (5, 6000)]))
    }
}

impl TierPopulation {
    #[must_use]
    pub fn new(table: BTreeMap<u8, u32>) -> Self {
        Self(table)
    }

    /// Population of `tier`; tiers missing from the table count as empty.
    #[must_use]
    pub fn size_of(&self, tier: u8) -> u32 {
        self.0.get(&tier).copied().unwrap_or(0)
    }
}

/// Hits and totals for one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierTally {
    pub tier: u8,
    pub asked: u32,
    pub known: u32,
    pub population: u32,
}

impl TierTally {
    /// Known share of the asked songs. Only built for tiers with `asked > 0`.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        f64::from(self.known) / f64::from(self.asked)
    }

    #[must_use]
    pub fn contribution(&self) -> f64 {
        self.hit_rate() * f64::from(self.population)
    }
}

/// Per-tier breakdown behind an estimate, ordered by tier.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateBreakdown {
    pub tiers: Vec<TierTally>,
}

impl EstimateBreakdown {
    /// Tally `log` by tier against `populations`.
    #[must_use]
    pub fn from_log(log: &[Response], populations: &TierPopulation) -> Self {
        let mut counts: BTreeMap<u8, (u32, u32)> = BTreeMap::new();
        for response in log {
            let (asked, known) = counts.entry(response.song.tier).or_insert((0, 0));
            *asked += 1;
            if response.known {
                *known += 1;
            }
        }

        let tiers = counts
            .into_iter()
            .map(|(tier, (asked, known))| TierTally {
                tier,
                asked,
                known,
                population: populations.size_of(tier),
            })
            .collect();

        Self { tiers }
    }

    /// Rounded sum of the per-tier contributions.
    #[must_use]
    // Contributions are non-negative and bounded by the table.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn total(&self) -> u64 {
        let sum: f64 = self.tiers.iter().map(TierTally::contribution).sum();
        sum.round() as u64
    }
}

/// Estimate how many songs the user knows in total. An empty log gives 0.
///
/// # Examples
///
/// ```
/// use songquiz::estimator::{estimate, TierPopulation};
/// use songquiz::song::{Response, Song};
///
/// let log = vec![
///     Response::new(Song::new("a", Some(1), &["pop"]), true),
///     Response::new(Song::new("b", Some(1), &["pop"]), false),
/// ];
/// assert_eq!(estimate(&log, &TierPopulation::default()), 250);
/// ```
#[must_use]
pub fn estimate(log: &[Response], populations: &TierPopulation) -> u64 {
    EstimateBreakdown::from_log(log, populations).total()
}
