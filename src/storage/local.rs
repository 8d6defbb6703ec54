//! Local filesystem storage implementation.
//!
//! One pretty-printed JSON file per row, written atomically. Replacing a
//! row means rewriting its file; there is no merge.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── checkpoint.json       # {"forum_id": N}
//! ├── collections/{collid}.json
//! ├── games/{gameid}.json
//! ├── ratings/{userid}.json
//! └── users/{name}.json     # {"user_id": N}, name lowercased and form-encoded
//! ```
//!
//! A ratings file that cannot be read is logged and treated as missing, so
//! one damaged row never fails a whole lookup or sample.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{
    Checkpoint, CollectionRow, GameId, GameMetadata, RatingsRecord, StoreStats, UserId,
};
use crate::storage::{RatingStore, pick_random};

const CHECKPOINT_KEY: &str = "checkpoint.json";
const COLLECTIONS_DIR: &str = "collections";
const GAMES_DIR: &str = "games";
const RATINGS_DIR: &str = "ratings";
const USERS_DIR: &str = "users";

/// Name lookup entry pointing at a ratings file.
#[derive(Debug, Serialize, Deserialize)]
struct UserPointer {
    user_id: UserId,
}

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn row_key(dir: &str, id: i64) -> String {
        format!("{}/{}.json", dir, id)
    }

    fn user_key(user_name: &str) -> String {
        let lowered = user_name.trim().to_ascii_lowercase();
        let encoded: String = url::form_urlencoded::byte_serialize(lowered.as_bytes()).collect();
        format!("{}/{}.json", USERS_DIR, encoded)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    ///
    /// The temp name is unique per write so concurrent writers of the same
    /// key never share a temp file.
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension(format!(
            "{}.{:08x}.tmp",
            std::process::id(),
            rand::random::<u32>()
        ));
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Io(e));
        }
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Ids of the rows stored under `dir`, parsed from `{id}.json` names.
    ///
    /// Leftover `.tmp` files and anything else are ignored.
    async fn list_ids(&self, dir: &str) -> Result<Vec<i64>> {
        let mut entries = match tokio::fs::read_dir(self.path(dir)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = stem.parse::<i64>() {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Read one ratings row; unreadable rows are logged and skipped.
    async fn read_ratings(&self, user_id: UserId) -> Option<RatingsRecord> {
        let key = Self::row_key(RATINGS_DIR, user_id);
        match self.read_json(&key).await {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping unreadable ratings row {}: {}", key, e);
                None
            }
        }
    }
}

#[async_trait]
impl RatingStore for LocalStorage {
    async fn put_collection_row(&self, row: &CollectionRow) -> Result<()> {
        self.write_json(&Self::row_key(COLLECTIONS_DIR, row.collection_id), row)
            .await
    }

    async fn put_game(&self, game: &GameMetadata) -> Result<()> {
        self.write_json(&Self::row_key(GAMES_DIR, game.game_id), game)
            .await
    }

    async fn put_ratings(&self, record: &RatingsRecord) -> Result<()> {
        self.write_json(&Self::row_key(RATINGS_DIR, record.user_id), record)
            .await?;
        let pointer = UserPointer {
            user_id: record.user_id,
        };
        self.write_json(&Self::user_key(&record.user_name), &pointer)
            .await
    }

    async fn load_checkpoint(&self) -> Result<Option<i64>> {
        Ok(self
            .read_json::<Checkpoint>(CHECKPOINT_KEY)
            .await?
            .map(|c| c.forum_id))
    }

    async fn save_checkpoint(&self, forum_id: i64) -> Result<()> {
        self.write_json(CHECKPOINT_KEY, &Checkpoint { forum_id })
            .await
    }

    async fn find_ratings(&self, user_name: &str) -> Result<Option<RatingsRecord>> {
        if user_name.trim().is_empty() {
            return Ok(None);
        }
        let key = Self::user_key(user_name);
        let pointer = match self.read_json::<UserPointer>(&key).await {
            Ok(Some(pointer)) => pointer,
            Ok(None) => return Ok(None),
            Err(e) => {
                log::warn!("Skipping unreadable user entry {}: {}", key, e);
                return Ok(None);
            }
        };

        // the id may have been renamed since the entry was written
        Ok(self
            .read_ratings(pointer.user_id)
            .await
            .filter(|record| record.belongs_to(user_name)))
    }

    async fn sample_ratings(&self, limit: usize, include: &str) -> Result<Vec<RatingsRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut sample = Vec::with_capacity(limit);
        let target = self.find_ratings(include).await?;
        let exclude = target.as_ref().map(|t| t.user_id);
        if let Some(target) = target {
            sample.push(target);
        }

        let ids = self.list_ids(RATINGS_DIR).await?;
        for id in pick_random(&ids, limit - sample.len(), exclude.as_ref()) {
            if let Some(record) = self.read_ratings(id).await {
                sample.push(record);
            }
        }

        log::debug!(
            "Sampled {} of {} ratings records",
            sample.len(),
            ids.len()
        );
        Ok(sample)
    }

    async fn games_by_ids(&self, ids: &[GameId]) -> Result<HashMap<GameId, GameMetadata>> {
        let reads = ids.iter().map(|id| async move {
            let key = Self::row_key(GAMES_DIR, *id);
            match self.read_json::<GameMetadata>(&key).await {
                Ok(game) => game.map(|g| (*id, g)),
                Err(e) => {
                    log::warn!("Skipping unreadable game row {}: {}", key, e);
                    None
                }
            }
        });

        Ok(futures::future::join_all(reads)
            .await
            .into_iter()
            .flatten()
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            collection_rows: self.list_ids(COLLECTIONS_DIR).await?.len(),
            games: self.list_ids(GAMES_DIR).await?.len(),
            ratings_records: self.list_ids(RATINGS_DIR).await?.len(),
        })
    }
}
