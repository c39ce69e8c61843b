use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::confirm::ConfirmationStore;
use crate::model::{MatchResult, MatchStats, MatchStatus};

/// A view over the result set. `None` (no filter) shows everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every confirmed result, whatever its status.
    Confirmed,
    /// Unconfirmed results with this status. Confirmation takes precedence.
    Status(MatchStatus),
}

impl StatusFilter {
    pub fn matches(&self, result: &MatchResult) -> bool {
        match self {
            Self::Confirmed => result.confirmed,
            Self::Status(status) => !result.confirmed && result.status == *status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => f.write_str("confirmed"),
            Self::Status(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("confirmed") {
            return Ok(Self::Confirmed);
        }
        s.parse::<MatchStatus>().map(Self::Status).map_err(|_| {
            format!("unknown filter '{s}' (expected auto, review, nomatch or confirmed)")
        })
    }
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Results visible under `filter`, with their index in the full set.
pub fn filter(
    results: &[MatchResult],
    filter: Option<StatusFilter>,
) -> Vec<(usize, &MatchResult)> {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| filter.map_or(true, |f| f.matches(r)))
        .collect()
}

/// Counts per bucket. Status buckets skip confirmed results, mirroring
/// [`filter`]; `confirmed` is the store's size, which can differ from the
/// number of confirmed results when keys repeat or no longer appear.
pub fn aggregate(results: &[MatchResult], confirmations: &ConfirmationStore) -> MatchStats {
    let mut stats = MatchStats {
        confirmed: confirmations.len(),
        total: results.len(),
        ..MatchStats::default()
    };
    for r in results.iter().filter(|r| !r.confirmed) {
        match r.status {
            MatchStatus::Auto => stats.auto += 1,
            MatchStatus::Review => stats.review += 1,
            MatchStatus::NoMatch => stats.nomatch += 1,
        }
    }
    stats
}
