//! In-process storage backend.
//!
//! Same replace semantics as `LocalStorage`, kept in maps behind a
//! `RwLock`. Useful for tests and one-off query runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{CollectionRow, GameId, GameMetadata, RatingsRecord, StoreStats, UserId};
use crate::storage::{RatingStore, pick_random};

#[derive(Default)]
struct Tables {
    collections: HashMap<i64, CollectionRow>,
    games: HashMap<GameId, GameMetadata>,
    ratings: HashMap<UserId, RatingsRecord>,
    checkpoint: Option<i64>,
    ratings_writes: usize,
}

/// Map-backed storage backend.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put_ratings` calls served so far.
    pub async fn ratings_writes(&self) -> usize {
        self.tables.read().await.ratings_writes
    }

    pub async fn collection_row(&self, collection_id: i64) -> Option<CollectionRow> {
        self.tables
            .read()
            .await
            .collections
            .get(&collection_id)
            .cloned()
    }
}

#[async_trait]
impl RatingStore for MemoryStorage {
    async fn put_collection_row(&self, row: &CollectionRow) -> Result<()> {
        self.tables
            .write()
            .await
            .collections
            .insert(row.collection_id, row.clone());
        Ok(())
    }

    async fn put_game(&self, game: &GameMetadata) -> Result<()> {
        self.tables
            .write()
            .await
            .games
            .insert(game.game_id, game.clone());
        Ok(())
    }

    async fn put_ratings(&self, record: &RatingsRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.ratings.insert(record.user_id, record.clone());
        tables.ratings_writes += 1;
        Ok(())
    }

    async fn load_checkpoint(&self) -> Result<Option<i64>> {
        Ok(self.tables.read().await.checkpoint)
    }

    async fn save_checkpoint(&self, forum_id: i64) -> Result<()> {
        self.tables.write().await.checkpoint = Some(forum_id);
        Ok(())
    }

    async fn find_ratings(&self, user_name: &str) -> Result<Option<RatingsRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .ratings
            .values()
            .find(|r| r.belongs_to(user_name))
            .cloned())
    }

    async fn sample_ratings(&self, limit: usize, include: &str) -> Result<Vec<RatingsRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().await;

        let mut sample = Vec::with_capacity(limit);
        let target = tables.ratings.values().find(|r| r.belongs_to(include));
        if let Some(target) = target {
            sample.push(target.clone());
        }

        let ids: Vec<UserId> = tables.ratings.keys().copied().collect();
        let exclude = target.map(|t| t.user_id);
        for id in pick_random(&ids, limit - sample.len(), exclude.as_ref()) {
            if let Some(record) = tables.ratings.get(&id) {
                sample.push(record.clone());
            }
        }
        Ok(sample)
    }

    async fn games_by_ids(&self, ids: &[GameId]) -> Result<HashMap<GameId, GameMetadata>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.games.get(id).map(|g| (*id, g.clone())))
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let tables = self.tables.read().await;
        Ok(StoreStats {
            collection_rows: tables.collections.len(),
            games: tables.games.len(),
            ratings_records: tables.ratings.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::UserRef;

    fn record(id: i64, name: &str, ratings: &[(i64, i32)]) -> RatingsRecord {
        RatingsRecord::new(
            &UserRef {
                id,
                name: name.into(),
            },
            ratings.iter().copied().collect::<BTreeMap<_, _>>(),
        )
    }

    #[tokio::test]
    async fn test_put_ratings_replaces_whole_record() {
        let store = MemoryStorage::new();
        store
            .put_ratings(&record(1, "alice", &[(13, 8), (822, 6)]))
            .await
            .unwrap();
        store
            .put_ratings(&record(1, "alice", &[(30549, 9)]))
            .await
            .unwrap();

        let stored = store.find_ratings("alice").await.unwrap().unwrap();
        assert_eq!(stored.ratings, BTreeMap::from([(30549, 9)]));
        assert_eq!(store.ratings_writes().await, 2);
    }

    #[tokio::test]
    async fn test_sample_puts_target_first_and_caps_size() {
        let store = MemoryStorage::new();
        for id in 1..=50 {
            store
                .put_ratings(&record(id, &format!("user{id}"), &[(1, 5)]))
                .await
                .unwrap();
        }

        let sample = store.sample_ratings(10, "USER42").await.unwrap();
        assert_eq!(sample.len(), 10);
        assert_eq!(sample[0].user_name, "user42");
        assert_eq!(sample.iter().filter(|r| r.user_id == 42).count(), 1);
    }

    #[tokio::test]
    async fn test_sample_without_target() {
        let store = MemoryStorage::new();
        store.put_ratings(&record(1, "bob", &[(1, 5)])).await.unwrap();

        let sample = store.sample_ratings(10, "alice").await.unwrap();
        assert_eq!(sample.len(), 1);
        assert_eq!(sample[0].user_name, "bob");
    }

    #[tokio::test]
    async fn test_checkpoint_round_trip() {
        let store = MemoryStorage::new();
        assert_eq!(store.load_checkpoint().await.unwrap(), None);
        store.save_checkpoint(7).await.unwrap();
        assert_eq!(store.load_checkpoint().await.unwrap(), Some(7));
    }
}
