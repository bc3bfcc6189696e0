//! Next-song selection.
//!
//! A greedy policy that reacts only to the most recent answer, while the
//! over-test guard looks at the whole log. The order of `remaining` is the
//! tie-break: within any rule the first matching song wins, and the slice is
//! never reordered.
//!
//! Rules, tried in order:
//!
//! | last answer | rule |
//! |-------------|------|
//! | none        | first remaining song |
//! | yes         | same tier, no genre in common with the user's picks |
//! | yes         | one tier lower, sharing a genre with the last song |
//! | no          | one tier higher, sharing a genre with the last song |
//! | no          | exploration tier, only genres never seen in the log |
//! | any         | first song that is not over-tested |
//! | any         | first remaining song, guard ignored |
//!
//! Every rule except the first and last also requires the candidate to pass
//! the over-test guard.

use crate::guard::BucketCounter;
use crate::song::{Response, Song};
use log::trace;
use std::collections::HashSet;
use std::fmt;

/// Tier probed when pivoting to unexplored genres after a miss.
pub const EXPLORATION_TIER: u8 = 3;

/// Which rule produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionRule {
    /// No history yet.
    FirstUnasked,
    /// Known song: same tier, outside the user's declared genres.
    OutsideComfortZone,
    /// Known song: one tier lower within the same genre.
    DeeperCut,
    /// Unknown song: one tier higher within the same genre.
    EasierRetry,
    /// Unknown song: exploration tier in a genre not seen yet.
    NewGenre,
    /// No adaptive candidate: first song the guard lets through.
    NotOverTested,
    /// Everything left is over-tested.
    LastResort,
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FirstUnasked => "first unasked",
            Self::OutsideComfortZone => "same tier, outside declared genres",
            Self::DeeperCut => "deeper cut in same genre",
            Self::EasierRetry => "easier tier in same genre",
            Self::NewGenre => "unexplored genre",
            Self::NotOverTested => "fallback",
            Self::LastResort => "last resort",
        };
        f.write_str(label)
    }
}

/// A chosen song together with the rule that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub song: &'a Song,
    pub rule: SelectionRule,
}

/// Pick the next song to present, or `None` when nothing is left.
///
/// `remaining` holds the unanswered songs in catalog order, `log` the full
/// answer history and `user_genres` the genres chosen at onboarding.
///
/// # Examples
///
/// ```
/// use songquiz::selector::select_next;
/// use songquiz::song::{Response, Song};
///
/// let pop = Song::new("s1", Some(1), &["pop"]);
/// let rock = Song::new("s2", Some(1), &["rock"]);
/// let user_genres = vec!["rock".to_string()];
///
/// let first = select_next(&[&pop, &rock], &[], &user_genres);
/// assert_eq!(first.map(|s| s.id.as_str()), Some("s1"));
///
/// let log = vec![Response::new(pop.clone(), true)];
/// let second = select_next(&[&rock], &log, &user_genres);
/// assert_eq!(second.map(|s| s.id.as_str()), Some("s2"));
/// ```
#[must_use]
pub fn select_next<'a>(
    remaining: &[&'a Song],
    log: &[Response],
    user_genres: &[String],
) -> Option<&'a Song> {
    select_with_rule(remaining, log, user_genres).map(|selection| selection.song)
}

/// Same as [`select_next`], but reports which rule fired.
#[must_use]
pub fn select_with_rule<'a>(
    remaining: &[&'a Song],
    log: &[Response],
    user_genres: &[String],
) -> Option<Selection<'a>> {
    let Some(last) = log.last() else {
        return first_where(remaining, SelectionRule::FirstUnasked, |_| true);
    };

    let counter = BucketCounter::from_log(log);
    let fresh = |song: &Song| !counter.is_over_tested(song);

    let last_tier = last.song.tier;
    let last_genres = &last.song.genres;

    let adaptive = if last.known {
        first_where(remaining, SelectionRule::OutsideComfortZone, |song| {
            song.tier == last_tier && !song.shares_genre_with(user_genres) && fresh(song)
        })
        .or_else(|| {
            let deeper = last_tier.checked_sub(1)?;
            first_where(remaining, SelectionRule::DeeperCut, |song| {
                song.tier == deeper && song.shares_genre_with(last_genres) && fresh(song)
            })
        })
    } else {
        last_tier
            .checked_add(1)
            .and_then(|easier| {
                first_where(remaining, SelectionRule::EasierRetry, |song| {
                    song.tier == easier && song.shares_genre_with(last_genres) && fresh(song)
                })
            })
            .or_else(|| {
                let seen: HashSet<&str> = log
                    .iter()
                    .flat_map(|r| r.song.genres.iter().map(String::as_str))
                    .collect();
                first_where(remaining, SelectionRule::NewGenre, |song| {
                    song.tier == EXPLORATION_TIER
                        && song.genres.iter().all(|g| !seen.contains(g.as_str()))
                        && fresh(song)
                })
            })
    };

    let selection = adaptive
        .or_else(|| first_where(remaining, SelectionRule::NotOverTested, fresh))
        .or_else(|| first_where(remaining, SelectionRule::LastResort, |_| true));

    match &selection {
        Some(s) => trace!(
            "Selected `{}' (tier {}) via {} after {} `{}'",
            s.song.id,
            s.song.tier,
            s.rule,
            if last.known { "yes on" } else { "no on" },
            last.song.id
        ),
        None => trace!("No songs remaining after {} responses", log.len()),
    }

    selection
}

fn first_where<'a>(
    remaining: &[&'a Song],
    rule: SelectionRule,
    matches: impl Fn(&Song) -> bool,
) -> Option<Selection<'a>> {
    remaining
        .iter()
        .copied()
        .find(|song| matches(song))
        .map(|song| Selection { song, rule })
}
