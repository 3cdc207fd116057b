//! "Did you mean" matching for package names.
//!
//! A candidate qualifies when it contains the query (case-insensitive); among
//! those, the one whose length is closest to the query wins. This is a cheap
//! heuristic for suggestions, not a similarity metric.

/// Score of a candidate that contains the query. Not clamped: very long
/// candidates go negative, which only matters for ranking.
pub fn score(query: &str, candidate: &str) -> Option<i64> {
    let query_lower = query.to_lowercase();
    let candidate_lower = candidate.to_lowercase();
    if !candidate_lower.contains(&query_lower) {
        return None;
    }
    let diff = candidate_lower.chars().count() as i64 - query_lower.chars().count() as i64;
    Some(100 - diff.abs())
}

/// Highest-scoring candidate; ties go to the earliest one.
pub fn best_match<'a, I>(query: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, i64)> = None;
    for candidate in candidates {
        let Some(s) = score(query, candidate) else {
            continue;
        };
        if best.is_none_or(|(_, top)| s > top) {
            best = Some((candidate, s));
        }
    }
    best.map(|(name, _)| name)
}
