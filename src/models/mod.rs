// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod document;
mod record;
mod stats;

// Re-export all public types
pub use config::{ApiConfig, Config, CrawlerConfig, RecommenderConfig};
pub use document::{
    Article, CollectionItem, CollectionSet, CollectionStatus, Forum, ForumList, ForumRef, GameId,
    GameStats, GuildRef, Thread, ThreadRef, User, UserId, UserRef,
};
pub use record::{
    Checkpoint, CollectionRow, GameMetadata, GameRecommendation, RatingsRecord, StoreStats,
};
pub use stats::PassStats;
