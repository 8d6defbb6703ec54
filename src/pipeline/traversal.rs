// src/pipeline/traversal.rs

//! Depth-first walk over forum lists, forums, threads, users and
//! collections.
//!
//! The walk runs off an explicit stack of [`Visit`] tasks, so deep buddy
//! graphs never grow the call stack. Every failure is contained to the node
//! that produced it: a failed fetch or decode skips that node's subtree and
//! a failed write skips that row.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{PassStats, UserId, UserRef};
use crate::services::{
    DocumentKind, Fetcher, RatingStoreAdapter, collect_ratings, decode_collection, decode_forum,
    decode_forum_list, decode_thread, decode_user,
};
use crate::storage::RatingStore;
use crate::utils::Endpoints;

/// How a user entered the walk. Decides whether its buddies are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOrigin {
    /// Author of a forum article
    Article,
    /// Buddy of a user that was already explored
    Buddy,
    /// Direct lookup by name
    Lookup { explore_buddies: bool },
}

impl UserOrigin {
    pub fn explores_buddies(self) -> bool {
        match self {
            UserOrigin::Article | UserOrigin::Buddy => true,
            UserOrigin::Lookup { explore_buddies } => explore_buddies,
        }
    }
}

/// One pending step of the walk.
#[derive(Debug, Clone, PartialEq)]
pub enum Visit {
    ForumList(i64),
    Forum(i64),
    Thread(i64),
    User { name: String, origin: UserOrigin },
    Collection(UserRef),
}

/// Owns the crawl position and the per-pass visited set.
pub struct TraversalEngine {
    fetcher: Fetcher,
    endpoints: Endpoints,
    adapter: RatingStoreAdapter,
    checkpoint: i64,
    visited: HashSet<UserId>,
    reset_pending: bool,
}

impl TraversalEngine {
    /// Engine positioned at forum list 0.
    pub fn new(fetcher: Fetcher, endpoints: Endpoints, store: Arc<dyn RatingStore>) -> Self {
        Self {
            fetcher,
            endpoints,
            adapter: RatingStoreAdapter::new(store),
            checkpoint: 0,
            visited: HashSet::new(),
            reset_pending: false,
        }
    }

    /// Engine positioned at the persisted checkpoint, or 0 if none.
    pub async fn resume(
        fetcher: Fetcher,
        endpoints: Endpoints,
        store: Arc<dyn RatingStore>,
    ) -> Result<Self> {
        let checkpoint = store.load_checkpoint().await?.unwrap_or(0);
        log::info!("Resuming crawl at forum list {}", checkpoint);
        Ok(Self::new(fetcher, endpoints, store).starting_at(checkpoint))
    }

    /// Override the forum list the next pass starts from.
    pub fn starting_at(mut self, forum_list_id: i64) -> Self {
        self.checkpoint = forum_list_id;
        self
    }

    pub fn checkpoint(&self) -> i64 {
        self.checkpoint
    }

    /// Forget every user seen so far.
    pub fn new_pass(&mut self) {
        self.visited.clear();
        self.reset_pending = false;
    }

    /// Move past the forum list just walked and persist the new position.
    ///
    /// Goes back to 0 instead when the pass ran off the end of the catalog.
    pub async fn advance_checkpoint(&mut self) -> Result<i64> {
        self.checkpoint = if self.reset_pending {
            log::info!("Reached end of catalog, restarting at forum list 0");
            0
        } else {
            self.checkpoint + 1
        };
        self.reset_pending = false;
        self.adapter
            .store()
            .save_checkpoint(self.checkpoint)
            .await?;
        Ok(self.checkpoint)
    }

    /// Walk the forum list at the checkpoint, then advance the checkpoint.
    pub async fn run_pass(&mut self) -> PassStats {
        self.new_pass();
        let mut stats = PassStats::start(Some(self.checkpoint));

        let walker = Walker {
            fetcher: &self.fetcher,
            endpoints: &self.endpoints,
            adapter: &self.adapter,
        };
        walker
            .walk(Visit::ForumList(self.checkpoint), &mut self.visited, &mut stats)
            .await;
        self.reset_pending = stats.end_of_catalog;

        if let Err(e) = self.advance_checkpoint().await {
            log::error!("Failed to persist checkpoint {}: {}", self.checkpoint, e);
        }
        stats.finish();
        stats
    }

    /// Crawl one user by name, outside of any pass.
    ///
    /// Uses its own visited set and leaves the checkpoint alone.
    pub async fn crawl_user(&self, name: &str, explore_buddies: bool) -> PassStats {
        let mut stats = PassStats::start(None);
        let mut visited = HashSet::new();

        let walker = Walker {
            fetcher: &self.fetcher,
            endpoints: &self.endpoints,
            adapter: &self.adapter,
        };
        walker
            .walk(
                Visit::User {
                    name: name.to_string(),
                    origin: UserOrigin::Lookup { explore_buddies },
                },
                &mut visited,
                &mut stats,
            )
            .await;

        stats.finish();
        stats
    }
}

struct Walker<'a> {
    fetcher: &'a Fetcher,
    endpoints: &'a Endpoints,
    adapter: &'a RatingStoreAdapter,
}

impl Walker<'_> {
    async fn walk(&self, root: Visit, visited: &mut HashSet<UserId>, stats: &mut PassStats) {
        let mut stack = vec![root];

        while let Some(visit) = stack.pop() {
            let children = match visit {
                Visit::ForumList(id) => self.forum_list(id, stats).await,
                Visit::Forum(id) => self.forum(id, stats).await,
                Visit::Thread(id) => self.thread(id, stats).await,
                Visit::User { name, origin } => self.user(&name, origin, visited, stats).await,
                Visit::Collection(user) => {
                    self.collection(&user, stats).await;
                    Vec::new()
                }
            };
            // reversed so the first child is walked first
            stack.extend(children.into_iter().rev());
        }
    }

    /// Fetch and decode one document. `None` means the subtree is skipped.
    async fn load<T>(
        &self,
        url: String,
        kind: DocumentKind,
        decode: fn(&[u8]) -> Result<T>,
        stats: &mut PassStats,
    ) -> Option<T> {
        let body = match self.fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(e) if e.is_fetch_failure() => {
                stats.fetch_failures += 1;
                log::warn!("Skipping {} {}: {}", kind, url, e);
                return None;
            }
            Err(e) => {
                stats.fetch_failures += 1;
                log::error!("Unexpected error fetching {}: {}", url, e);
                return None;
            }
        };
        stats.documents_fetched += 1;

        match decode(&body) {
            Ok(doc) => Some(doc),
            Err(e) => {
                stats.decode_failures += 1;
                log::warn!("Skipping {}: {}", url, e);
                None
            }
        }
    }

    async fn forum_list(&self, id: i64, stats: &mut PassStats) -> Vec<Visit> {
        let url = self.endpoints.forum_list(id);
        let Some(list) = self
            .load(url, DocumentKind::ForumList, decode_forum_list, stats)
            .await
        else {
            return Vec::new();
        };
        log::info!("Forum list {}: {} forums", id, list.forums.len());
        list.forums.iter().map(|f| Visit::Forum(f.id)).collect()
    }

    async fn forum(&self, id: i64, stats: &mut PassStats) -> Vec<Visit> {
        let url = self.endpoints.forum(id);
        let Some(forum) = self
            .load(url, DocumentKind::Forum, decode_forum, stats)
            .await
        else {
            return Vec::new();
        };
        if forum.is_end_of_catalog() {
            log::info!("Forum {} answered with id {}, end of catalog", id, forum.id);
            stats.end_of_catalog = true;
            return Vec::new();
        }
        log::debug!("Forum {}: {} threads", id, forum.threads.len());
        forum.threads.iter().map(|t| Visit::Thread(t.id)).collect()
    }

    async fn thread(&self, id: i64, stats: &mut PassStats) -> Vec<Visit> {
        let url = self.endpoints.thread(id);
        let Some(thread) = self
            .load(url, DocumentKind::Thread, decode_thread, stats)
            .await
        else {
            return Vec::new();
        };
        thread
            .articles
            .into_iter()
            .map(|a| Visit::User {
                name: a.author,
                origin: UserOrigin::Article,
            })
            .collect()
    }

    async fn user(
        &self,
        name: &str,
        origin: UserOrigin,
        visited: &mut HashSet<UserId>,
        stats: &mut PassStats,
    ) -> Vec<Visit> {
        if name.trim().is_empty() {
            stats.users_skipped_empty += 1;
            return Vec::new();
        }
        let url = self.endpoints.user(name);
        let Some(user) = self
            .load(url, DocumentKind::User, decode_user, stats)
            .await
        else {
            return Vec::new();
        };
        if !user.is_valid() {
            log::debug!("No such user {:?}", name);
            stats.users_skipped_empty += 1;
            return Vec::new();
        }
        if !visited.insert(user.id) {
            stats.users_skipped_duplicate += 1;
            return Vec::new();
        }
        stats.users_visited += 1;
        log::debug!("Visiting user {} ({})", user.name, user.id);

        let mut next = vec![Visit::Collection(user.handle())];
        if origin.explores_buddies() {
            next.extend(user.buddies.into_iter().map(|b| Visit::User {
                name: b.name,
                origin: UserOrigin::Buddy,
            }));
        }
        next
    }

    async fn collection(&self, user: &UserRef, stats: &mut PassStats) {
        let url = self.endpoints.collection(&user.name);
        let Some(collection) = self
            .load(url, DocumentKind::Collection, decode_collection, stats)
            .await
        else {
            return;
        };

        for item in &collection.items {
            let failed = self.adapter.upsert_collection_row(user, item).await;
            stats.failed_writes += failed;
            if failed == 0 {
                stats.items_stored += 1;
            }
        }

        let ratings = collect_ratings(&collection.items);
        let rated = ratings.len();
        if self.adapter.replace_user_ratings(user, ratings).await {
            stats.collections_stored += 1;
            log::info!(
                "Stored collection of {}: {} items, {} rated",
                user.name,
                collection.items.len(),
                rated
            );
        } else {
            stats.failed_writes += 1;
        }
    }
}
