//! Storage abstractions for harvested ratings.
//!
//! The crawler writes three kinds of rows and one checkpoint; the
//! recommender reads ratings samples and game metadata back.
//!
//! ## Directory Structure (`LocalStorage`)
//!
//! ```text
//! storage/
//! ├── config.toml           # Harvester configuration
//! ├── checkpoint.json       # Next forum list to crawl
//! ├── collections/          # One file per collection row
//! │   └── {collid}.json
//! ├── games/                # One file per game
//! │   └── {gameid}.json
//! └── ratings/              # One ratings record per user
//!     └── {userid}.json
//! ```

pub mod local;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::error::Result;
use crate::models::{CollectionRow, GameId, GameMetadata, RatingsRecord, StoreStats};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Trait for rating store backends.
///
/// All writes are idempotent replaces keyed by the row's id; the last
/// writer wins.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Replace the collection row with the same `collection_id`.
    async fn put_collection_row(&self, row: &CollectionRow) -> Result<()>;

    /// Replace the metadata row with the same `game_id`.
    async fn put_game(&self, game: &GameMetadata) -> Result<()>;

    /// Replace the whole ratings record with the same `user_id`.
    async fn put_ratings(&self, record: &RatingsRecord) -> Result<()>;

    /// Read the crawl checkpoint, `None` before the first pass completes.
    async fn load_checkpoint(&self) -> Result<Option<i64>>;

    /// Persist the crawl checkpoint.
    async fn save_checkpoint(&self, forum_id: i64) -> Result<()>;

    /// Look up a ratings record by user name (case-insensitive).
    async fn find_ratings(&self, user_name: &str) -> Result<Option<RatingsRecord>>;

    /// Draw at most `limit` ratings records, the record of `include` first
    /// when it exists.
    async fn sample_ratings(&self, limit: usize, include: &str) -> Result<Vec<RatingsRecord>>;

    /// Metadata for the given games; unknown ids are absent from the map.
    async fn games_by_ids(&self, ids: &[GameId]) -> Result<HashMap<GameId, GameMetadata>>;

    /// Row counts per table.
    async fn stats(&self) -> Result<StoreStats>;
}

/// Pick at most `limit` keys at random, skipping `exclude`.
pub(crate) fn pick_random<K: Clone + PartialEq>(
    keys: &[K],
    limit: usize,
    exclude: Option<&K>,
) -> Vec<K> {
    let candidates: Vec<&K> = keys.iter().filter(|k| Some(*k) != exclude).collect();
    let mut rng = rand::thread_rng();
    candidates
        .choose_multiple(&mut rng, limit)
        .map(|k| (*k).clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_random_respects_limit_and_exclusion() {
        let keys: Vec<i64> = (1..=20).collect();
        let picked = pick_random(&keys, 5, Some(&3));

        assert_eq!(picked.len(), 5);
        assert!(!picked.contains(&3));

        let mut unique = picked.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_pick_random_short_input() {
        let keys = vec![1i64, 2];
        let mut picked = pick_random(&keys, 10, None);
        picked.sort();
        assert_eq!(picked, vec![1, 2]);
    }
}
