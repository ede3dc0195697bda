//! Integration tests for the recommender.
//!
//! These run the catalog parser and the recommender together on a small
//! catalog shaped like the production CSV.

use catalog::{Catalog, CatalogLoadError, ObjectStore, Record, load_catalog, parse_catalog};
use recommender::{Recommender, recommend_labs};

const CATALOG_CSV: &str = "\
Name,Summary
S3 Basics,intro to storage buckets
EC2 Deploy,launch compute instances
Lambda 101,serverless compute basics
";

fn names<'a>(records: &[&'a Record]) -> Vec<&'a str> {
    records.iter().filter_map(|r| r.get("Name")).collect()
}

#[test]
fn test_compute_basics_ranking() {
    let catalog = parse_catalog(CATALOG_CSV).unwrap();

    let ranked = Recommender::new().rank("compute basics", &catalog);
    let scores: Vec<_> = ranked.iter().map(|m| m.score).collect();
    assert_eq!(scores, vec![2, 1, 1]);

    // S3 Basics and EC2 Deploy tie at 1 and keep their catalog order
    let top = recommend_labs("compute basics", &catalog);
    assert_eq!(names(&top), vec!["Lambda 101", "S3 Basics", "EC2 Deploy"]);
}

#[test]
fn test_no_matching_token() {
    let catalog = parse_catalog(CATALOG_CSV).unwrap();
    assert!(recommend_labs("kubernetes", &catalog).is_empty());
}

struct UnreachableStore;

impl ObjectStore for UnreachableStore {
    fn get_object(&self, bucket: &str, key: &str) -> catalog::Result<Vec<u8>> {
        Err(CatalogLoadError::Remote {
            location: format!("{}/{}", bucket, key),
            reason: "connection refused".to_string(),
        })
    }
}

#[test]
fn test_failed_load_yields_no_recommendations() {
    let config = catalog::CatalogConfig::new("cloudlabs", "us-east-1");
    let catalog: Catalog = load_catalog(&UnreachableStore, &config);

    assert!(catalog.is_empty());
    for query in ["compute basics", "s3", "", "anything at all"] {
        assert!(recommend_labs(query, &catalog).is_empty());
    }
}

#[test]
fn test_more_matches_never_rank_lower() {
    let catalog = vec![
        Record::new().with("Name", "Partial").with("Summary", "dynamodb"),
        Record::new().with("Name", "Full").with("Summary", "dynamodb streams triggers"),
    ];
    let top = recommend_labs("dynamodb streams triggers", &catalog);
    assert_eq!(names(&top), vec!["Full", "Partial"]);
}

#[test]
fn test_ranking_is_deterministic() {
    let catalog = parse_catalog(CATALOG_CSV).unwrap();
    let first = recommend_labs("compute storage basics", &catalog);
    for _ in 0..10 {
        assert_eq!(recommend_labs("compute storage basics", &catalog), first);
    }
}
