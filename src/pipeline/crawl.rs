// src/pipeline/crawl.rs

//! Top-level crawl loop.

use crate::models::PassStats;
use crate::pipeline::TraversalEngine;

/// Run crawl passes back to back.
///
/// With `max_passes = None` the loop only ends when the process is stopped.
/// Returns the number of passes completed.
pub async fn run_crawler(engine: &mut TraversalEngine, max_passes: Option<usize>) -> usize {
    let mut passes = 0;

    while max_passes.is_none_or(|max| passes < max) {
        log::info!("Starting pass at forum list {}", engine.checkpoint());
        let stats = engine.run_pass().await;
        log_pass(&stats, engine.checkpoint());
        passes += 1;
    }

    passes
}

fn log_pass(stats: &PassStats, next_checkpoint: i64) {
    log::info!(
        "Pass over forum list {} done in {}s: {} documents, {} users ({} duplicate, {} empty), {} collections, {} items",
        stats.forum_list_id.unwrap_or_default(),
        stats.elapsed_secs(),
        stats.documents_fetched,
        stats.users_visited,
        stats.users_skipped_duplicate,
        stats.users_skipped_empty,
        stats.collections_stored,
        stats.items_stored,
    );
    if stats.fetch_failures + stats.decode_failures + stats.failed_writes > 0 {
        log::warn!(
            "Pass had {} failed fetches, {} undecodable documents, {} failed writes",
            stats.fetch_failures,
            stats.decode_failures,
            stats.failed_writes
        );
    }
    log::info!("Next pass starts at forum list {}", next_checkpoint);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::ApiConfig;
    use crate::services::{Fetcher, RetryPolicy};
    use crate::storage::{MemoryStorage, RatingStore};
    use crate::testing::{ScriptedTransport, forum_list_xml};
    use crate::utils::Endpoints;

    #[tokio::test]
    async fn test_bounded_run_resumes_from_checkpoint() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryStorage::new());
        let endpoints = Endpoints::new(&ApiConfig::default()).unwrap();
        for id in 0..5 {
            transport.ok(&endpoints.forum_list(id), forum_list_xml(id, &[]));
        }
        store.save_checkpoint(2).await.unwrap();

        let fetcher = Fetcher::new(transport.clone(), RetryPolicy::immediate(0));
        let mut engine = TraversalEngine::resume(fetcher, endpoints.clone(), store.clone())
            .await
            .unwrap();
        let passes = run_crawler(&mut engine, Some(2)).await;

        assert_eq!(passes, 2);
        assert_eq!(store.load_checkpoint().await.unwrap(), Some(4));
        assert_eq!(transport.request_count(&endpoints.forum_list(2)), 1);
        assert_eq!(transport.request_count(&endpoints.forum_list(3)), 1);
        assert_eq!(transport.request_count(&endpoints.forum_list(0)), 0);
    }

    #[tokio::test]
    async fn test_zero_passes() {
        let store = Arc::new(MemoryStorage::new());
        let fetcher = Fetcher::new(Arc::new(ScriptedTransport::new()), RetryPolicy::immediate(0));
        let endpoints = Endpoints::new(&ApiConfig::default()).unwrap();
        let mut engine = TraversalEngine::new(fetcher, endpoints, store.clone());

        assert_eq!(run_crawler(&mut engine, Some(0)).await, 0);
        assert_eq!(store.load_checkpoint().await.unwrap(), None);
    }
}
