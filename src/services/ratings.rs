// src/services/ratings.rs

//! Rating store adapter.
//!
//! Turns decoded collection items into stored rows. Persistence errors are
//! logged and the row is skipped; callers only learn whether it landed.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{CollectionItem, CollectionRow, GameId, GameMetadata, RatingsRecord, UserRef};
use crate::storage::RatingStore;

/// Write side of the crawler.
#[derive(Clone)]
pub struct RatingStoreAdapter {
    store: Arc<dyn RatingStore>,
}

impl RatingStoreAdapter {
    pub fn new(store: Arc<dyn RatingStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RatingStore> {
        &self.store
    }

    /// Store the collection row and, independently, the game's metadata.
    ///
    /// Returns the number of the two writes that failed.
    pub async fn upsert_collection_row(&self, owner: &UserRef, item: &CollectionItem) -> usize {
        let row = CollectionRow::new(owner, item);
        let mut failed = 0;

        if let Err(e) = self.store.put_collection_row(&row).await {
            log::warn!(
                "Skipping collection row {} of {}: {}",
                row.collection_id,
                owner.name,
                e
            );
            failed += 1;
        }
        if !self.upsert_game_metadata(item).await {
            failed += 1;
        }
        failed
    }

    /// Replace the metadata row of the item's game. Last writer wins.
    pub async fn upsert_game_metadata(&self, item: &CollectionItem) -> bool {
        let game = GameMetadata::from(item);
        match self.store.put_game(&game).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Skipping metadata for game {}: {}", game.game_id, e);
                false
            }
        }
    }

    /// Overwrite the user's whole ratings record with `ratings`.
    pub async fn replace_user_ratings(&self, user: &UserRef, ratings: BTreeMap<GameId, i32>) -> bool {
        let record = RatingsRecord::new(user, ratings);
        match self.store.put_ratings(&record).await {
            Ok(()) => {
                log::debug!(
                    "Stored {} ratings for {} ({})",
                    record.ratings.len(),
                    user.name,
                    user.id
                );
                true
            }
            Err(e) => {
                log::warn!("Skipping ratings record of {}: {}", user.name, e);
                false
            }
        }
    }
}

/// Ratings map of a collection: rated items only, rounded.
pub fn collect_ratings<'a>(items: impl IntoIterator<Item = &'a CollectionItem>) -> BTreeMap<GameId, i32> {
    items
        .into_iter()
        .filter(|item| item.is_rated())
        .map(|item| (item.game_id, item.rounded_rating()))
        .filter(|(_, rating)| *rating > 0)
        .collect()
}
