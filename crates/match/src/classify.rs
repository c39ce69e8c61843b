use crate::model::MatchStatus;

/// Top scores at or above this are accepted automatically.
pub const AUTO_THRESHOLD: f64 = 80.0;

/// Top scores at or above this (and below [`AUTO_THRESHOLD`]) need review.
pub const REVIEW_THRESHOLD: f64 = 60.0;

/// Map the best candidate's score to a status.
pub fn classify(top_score: f64) -> MatchStatus {
    if top_score >= AUTO_THRESHOLD {
        MatchStatus::Auto
    } else if top_score >= REVIEW_THRESHOLD {
        MatchStatus::Review
    } else {
        MatchStatus::NoMatch
    }
}
