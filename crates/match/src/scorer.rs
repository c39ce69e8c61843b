use std::collections::BTreeSet;

use crate::model::Value;

/// Uppercased tokens split on runs of whitespace, duplicates collapsed.
///
/// Leading or trailing whitespace yields an empty token at that edge, so
/// `"Acme Corp "` and `"ACME CORP"` are not a perfect match.
pub fn tokenize(value: &Value) -> BTreeSet<String> {
    let text = value.to_string().to_uppercase();
    let pieces: Vec<&str> = text.split(char::is_whitespace).collect();
    // split always yields at least one piece
    let last = pieces.len() - 1;
    pieces
        .iter()
        .enumerate()
        .filter(|&(i, piece)| !piece.is_empty() || i == 0 || i == last)
        .map(|(_, piece)| piece.to_string())
        .collect()
}

/// Jaccard overlap of two token sets, scaled to 0–100.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64 * 100.0
}

/// Symmetric similarity of two key values in `[0, 100]`.
///
/// Empty or absent values score 0. Tokens match exactly or not at all.
pub fn score(a: &Value, b: &Value) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    jaccard(&tokenize(a), &tokenize(b))
}
