//! The Recommender ranks catalog records against a free-text query.
//!
//! ## Algorithm
//! 1. Tokenize the query
//! 2. Score every record by token overlap with its lower-cased blob
//! 3. Drop records scoring zero
//! 4. Stable-sort by score, highest first (ties keep catalog order)
//! 5. Keep the first `limit` (3 by default)
//!
//! The result is a pure function of the query and the records, so a shared
//! catalog can be ranked concurrently from any number of requests.

use crate::scoring::{score, tokenize};
use crate::traits::Searchable;
use tracing::{debug, info, instrument, warn};

/// Default number of labs returned per query
pub const DEFAULT_LIMIT: usize = 3;

/// A record paired with its overlap score
#[derive(Debug)]
pub struct ScoredMatch<'a, R> {
    pub score: usize,
    pub record: &'a R,
}

// Manual impls: the derive would require `R: Clone`/`R: Copy`
impl<R> Clone for ScoredMatch<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for ScoredMatch<'_, R> {}

/// Keyword-overlap recommender
#[derive(Debug, Clone)]
pub struct Recommender {
    limit: usize,
}

impl Recommender {
    /// Create a recommender returning at most [`DEFAULT_LIMIT`] matches
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }

    /// Configure the maximum number of matches (default: 3)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Best matches for `query`, highest score first
    ///
    /// # Arguments
    /// * `query` - Free text; may be empty
    /// * `records` - The catalog (or any searchable slice); may be empty
    ///
    /// # Returns
    /// At most `limit` records. Never fails: records whose text cannot be
    /// built are treated as non-matching.
    pub fn recommend<'a, R: Searchable>(&self, query: &str, records: &'a [R]) -> Vec<&'a R> {
        self.rank(query, records)
            .into_iter()
            .map(|m| m.record)
            .collect()
    }

    /// Like [`Recommender::recommend`] but keeps the scores
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn rank<'a, R: Searchable>(&self, query: &str, records: &'a [R]) -> Vec<ScoredMatch<'a, R>> {
        info!("Recommending labs for query: {}", query);
        let tokens = tokenize(query);
        debug!("Query tokens: {:?}", tokens);

        let matches = if tokens.is_empty() {
            Vec::new()
        } else {
            self.top_matches(&tokens, records)
        };

        info!("Found {} relevant labs", matches.len());
        for m in &matches {
            info!("- {}", m.record.label());
        }

        matches
    }

    fn top_matches<'a, R: Searchable>(
        &self,
        tokens: &[String],
        records: &'a [R],
    ) -> Vec<ScoredMatch<'a, R>> {
        let mut matches: Vec<ScoredMatch<'a, R>> = records
            .iter()
            .filter_map(|record| {
                let blob = match record.search_text() {
                    Ok(text) => text.to_lowercase(),
                    Err(e) => {
                        warn!("Error scoring lab {}: {}", record.label(), e);
                        return None;
                    }
                };
                let score = score(tokens, &blob);
                (score > 0).then_some(ScoredMatch { score, record })
            })
            .collect();

        // `sort_by` is stable: equal scores keep catalog order
        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches.truncate(self.limit);

        matches
    }
}

impl Default for Recommender {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot helper using the default limit
pub fn recommend_labs<'a, R: Searchable>(query: &str, records: &'a [R]) -> Vec<&'a R> {
    Recommender::new().recommend(query, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ScoreError;
    use catalog::Record;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    fn lab(name: &str, summary: &str) -> Record {
        Record::new().with("Name", name).with("Summary", summary)
    }

    fn names<'a>(records: &[&'a Record]) -> Vec<&'a str> {
        records.iter().map(|r| r.get("Name").unwrap_or("")).collect()
    }

    #[test]
    fn test_empty_catalog() {
        let catalog: Vec<Record> = Vec::new();
        assert!(recommend_labs("anything", &catalog).is_empty());
    }

    #[test]
    fn test_empty_query() {
        let catalog = vec![lab("S3 Basics", "storage"), lab("EC2", "compute")];
        assert!(recommend_labs("", &catalog).is_empty());
        assert!(recommend_labs("   ", &catalog).is_empty());
    }

    #[test]
    fn test_higher_score_ranks_first() {
        let catalog = vec![
            lab("VPC Intro", "networking"),
            lab("VPC Peering", "networking across accounts"),
        ];
        let ranked = Recommender::new().rank("networking accounts", &catalog);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].score, 2);
        assert_eq!(ranked[0].record.get("Name"), Some("VPC Peering"));
        assert_eq!(ranked[1].score, 1);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let catalog = vec![
            lab("First", "iam policies"),
            lab("Second", "iam roles"),
            lab("Third", "iam users"),
        ];
        let top = recommend_labs("iam", &catalog);
        assert_eq!(names(&top), vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_caps_at_limit() {
        let catalog: Vec<Record> = (0..10)
            .map(|i| lab(&format!("Lab {}", i), "cloud"))
            .collect();

        assert_eq!(recommend_labs("cloud", &catalog).len(), 3);
        assert_eq!(
            Recommender::new()
                .with_limit(5)
                .recommend("cloud", &catalog)
                .len(),
            5
        );
    }

    #[test]
    fn test_case_insensitive() {
        let catalog = vec![
            lab("Lambda 101", "serverless compute basics"),
            lab("AWS Overview", "tour of services"),
        ];
        let upper = recommend_labs("AWS Lambda", &catalog);
        let lower = recommend_labs("aws lambda", &catalog);
        assert_eq!(upper, lower);
        assert_eq!(names(&upper), vec!["Lambda 101", "AWS Overview"]);
    }

    /// Test double whose text can be made to fail
    struct Flaky {
        label: &'static str,
        text: Option<&'static str>,
    }

    impl Searchable for Flaky {
        fn search_text(&self) -> Result<String, ScoreError> {
            self.text.map(str::to_string).ok_or(ScoreError::Unrenderable {
                field: "Summary".into(),
                reason: "binary payload".into(),
            })
        }

        fn label(&self) -> &str {
            self.label
        }
    }

    #[test]
    fn test_bad_record_is_isolated() {
        let healthy = vec![
            Flaky { label: "a", text: Some("s3 storage") },
            Flaky { label: "c", text: Some("storage classes") },
        ];
        let with_bad = vec![
            Flaky { label: "a", text: Some("s3 storage") },
            Flaky { label: "b", text: None },
            Flaky { label: "c", text: Some("storage classes") },
        ];

        let expected: Vec<_> = recommend_labs("s3 storage", &healthy)
            .iter()
            .map(|r| r.label)
            .collect();
        let actual: Vec<_> = recommend_labs("s3 storage", &with_bad)
            .iter()
            .map(|r| r.label)
            .collect();

        assert_eq!(expected, vec!["a", "c"]);
        assert_eq!(actual, expected);
    }

    /// Shared buffer the fmt subscriber writes into
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_rank_logs_query_and_matches() {
        let catalog = vec![lab("S3 Basics", "storage"), lab("EC2", "compute")];
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        let ranked = tracing::subscriber::with_default(subscriber, || {
            Recommender::new().rank("storage", &catalog).len()
        });
        assert_eq!(ranked, 1);

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Recommending labs for query: storage"));
        assert!(logs.contains("Found 1 relevant labs"));
        assert!(logs.contains("- S3 Basics"));
    }
}
