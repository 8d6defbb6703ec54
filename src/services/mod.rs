//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Paced, retrying document fetches (`Fetcher`)
//! - XML document decoding (`decode_*`)
//! - Writing crawled rows (`RatingStoreAdapter`)
//! - Collaborative-filtering recommendations (`Recommender`)

pub mod decoder;
mod fetcher;
mod ratings;
mod recommender;

pub use decoder::{
    DocumentKind, decode_collection, decode_forum, decode_forum_list, decode_thread, decode_user,
};
pub use fetcher::{AttemptOutcome, Fetcher, HttpTransport, RawResponse, RetryPolicy, Transport};
pub use ratings::{RatingStoreAdapter, collect_ratings};
pub use recommender::{RatingRow, Recommender, cosine_similarity, rank_candidates};
