//! Comment aggregation.
//!
//! This module builds the per-user comment index from scraped posts and
//! answers the ranking queries the publishing layer needs.

pub mod aggregator;

pub use aggregator::{AggregateError, CommentAggregator};
