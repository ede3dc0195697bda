//! Keyword-overlap recommender for the lab catalog.
//!
//! This crate provides:
//! - `Searchable`, the only thing the recommender needs from a record
//! - `tokenize` / `score`, the literal token-overlap scorer
//! - `Recommender`, which ranks a catalog and returns the top matches
//!
//! ## Example Usage
//! ```ignore
//! use recommender::Recommender;
//!
//! let recommender = Recommender::new();
//! let top = recommender.recommend("serverless compute", &catalog);
//! for lab in top {
//!     println!("{}", lab.label());
//! }
//! ```

pub mod recommender;
pub mod scoring;
pub mod traits;

// Re-export main types
pub use recommender::{DEFAULT_LIMIT, Recommender, ScoredMatch, recommend_labs};
pub use scoring::{score, tokenize};
pub use traits::{ScoreError, Searchable};
