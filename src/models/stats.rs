// src/models/stats.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one crawl pass (or one targeted lookup).
#[derive(Debug, Clone, Serialize)]
pub struct PassStats {
    /// Forum list the pass was rooted at; `None` for targeted lookups
    pub forum_list_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub documents_fetched: usize,
    /// Fetches that were rejected or ran out of retries
    pub fetch_failures: usize,
    pub decode_failures: usize,
    pub users_visited: usize,
    pub users_skipped_duplicate: usize,
    pub users_skipped_empty: usize,
    pub collections_stored: usize,
    pub items_stored: usize,
    pub failed_writes: usize,
    pub end_of_catalog: bool,
}

impl PassStats {
    pub fn start(forum_list_id: Option<i64>) -> Self {
        Self {
            forum_list_id,
            start_time: Utc::now(),
            end_time: None,
            documents_fetched: 0,
            fetch_failures: 0,
            decode_failures: 0,
            users_visited: 0,
            users_skipped_duplicate: 0,
            users_skipped_empty: 0,
            collections_stored: 0,
            items_stored: 0,
            failed_writes: 0,
            end_of_catalog: false,
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn elapsed_secs(&self) -> i64 {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_sets_end_time() {
        let mut stats = PassStats::start(Some(3));
        assert_eq!(stats.elapsed_secs(), 0);
        stats.finish();
        assert!(stats.end_time.unwrap() >= stats.start_time);
        assert_eq!(stats.forum_list_id, Some(3));
    }
}
