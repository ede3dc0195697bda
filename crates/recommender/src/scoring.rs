//! Literal token-overlap scoring.
//!
//! ## Algorithm
//! 1. Lower-case the query and split on whitespace into tokens
//! 2. Lower-case the record's search text (the blob)
//! 3. Score = number of tokens that occur anywhere in the blob as a substring
//!
//! Repeated tokens are counted once per occurrence in the query, so
//! "s3 s3" scores 2 against a blob containing "s3".

/// Split a query into lower-cased, whitespace-delimited tokens
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Count how many `tokens` occur in `blob`.
///
/// `blob` must already be lower-cased.
pub fn score(tokens: &[String], blob: &str) -> usize {
    tokens
        .iter()
        .filter(|token| blob.contains(token.as_str()))
        .count()
}
