// src/pipeline/recommend.rs

//! "Recommend for user X" with an on-demand crawl of the user.

use crate::error::{AppError, Result};
use crate::models::GameRecommendation;
use crate::pipeline::TraversalEngine;
use crate::services::Recommender;
use crate::storage::RatingStore;

/// Recommend games for `user_name`.
///
/// The user is crawled first (without buddies) when no ratings are stored
/// for them yet, or always when `refresh` is set.
pub async fn run_recommend(
    engine: &TraversalEngine,
    recommender: &Recommender,
    store: &dyn RatingStore,
    user_name: &str,
    refresh: bool,
) -> Result<Vec<GameRecommendation>> {
    let user_name = user_name.trim();
    if user_name.is_empty() {
        return Err(AppError::validation("user name must not be empty"));
    }

    if refresh || store.find_ratings(user_name).await?.is_none() {
        log::info!("Fetching collection of {} before ranking", user_name);
        let stats = engine.crawl_user(user_name, false).await;
        if stats.collections_stored == 0 {
            log::warn!("Could not refresh {}, using stored data", user_name);
        }
    }

    let recommendations = recommender.recommend(user_name).await?;
    log::info!(
        "{} recommendations for {}",
        recommendations.len(),
        user_name
    );
    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::models::{ApiConfig, GameId, GameMetadata, RatingsRecord, RecommenderConfig, UserRef};
    use crate::services::{Fetcher, RetryPolicy};
    use crate::storage::MemoryStorage;
    use crate::testing::{ScriptedTransport, collection_xml, user_xml};
    use crate::utils::Endpoints;

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryStorage>,
        endpoints: Endpoints,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(MemoryStorage::new());
            // bob agrees with alice on Catan and also loves Agricola
            let bob = RatingsRecord::new(
                &UserRef {
                    id: 2,
                    name: "bob".into(),
                },
                BTreeMap::from([(13, 8), (31260, 9)]),
            );
            store.put_ratings(&bob).await.unwrap();
            store.put_game(&game(31260, "Agricola")).await.unwrap();

            Self {
                transport: Arc::new(ScriptedTransport::new()),
                store,
                endpoints: Endpoints::new(&ApiConfig::default()).unwrap(),
            }
        }

        fn parts(&self) -> (TraversalEngine, Recommender) {
            let fetcher = Fetcher::new(self.transport.clone(), RetryPolicy::immediate(0));
            let engine = TraversalEngine::new(fetcher, self.endpoints.clone(), self.store.clone());
            let recommender = Recommender::new(self.store.clone(), RecommenderConfig::default());
            (engine, recommender)
        }
    }

    fn game(id: GameId, name: &str) -> GameMetadata {
        GameMetadata {
            game_id: id,
            name: name.into(),
            year_published: 2007,
            image: String::new(),
            subtype: "boardgame".into(),
            min_players: 1,
            max_players: 5,
            min_playtime: 30,
            max_playtime: 150,
            playing_time: 150,
            num_owned: 1,
            ratings_count: 1,
            average_rating: 7.9,
            bayes_average_rating: 7.8,
            std_dev_rating: 1.5,
            median_rating: 0.0,
        }
    }

    #[tokio::test]
    async fn test_unknown_user_is_crawled_first() {
        let fx = Fixture::new().await;
        fx.transport
            .ok(&fx.endpoints.user("alice"), user_xml(1, "alice", &[(2, "bob")]));
        fx.transport.ok(
            &fx.endpoints.collection("alice"),
            collection_xml(&[(100, 13, "Catan", "8")]),
        );
        let (engine, recommender) = fx.parts();

        let recs = run_recommend(&engine, &recommender, fx.store.as_ref(), "alice", false)
            .await
            .unwrap();

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "Agricola");
        // buddies are not followed on the query path
        assert!(fx.transport.requests_matching("name=bob").is_empty());
    }

    #[tokio::test]
    async fn test_stored_user_is_not_refetched() {
        let fx = Fixture::new().await;
        let alice = RatingsRecord::new(
            &UserRef {
                id: 1,
                name: "alice".into(),
            },
            BTreeMap::from([(13, 7)]),
        );
        fx.store.put_ratings(&alice).await.unwrap();
        let (engine, recommender) = fx.parts();

        let recs = run_recommend(&engine, &recommender, fx.store.as_ref(), "Alice", false)
            .await
            .unwrap();

        assert_eq!(recs.len(), 1);
        assert!(fx.transport.requests_matching("alice").is_empty());

        run_recommend(&engine, &recommender, fx.store.as_ref(), "alice", true)
            .await
            .unwrap();
        assert!(!fx.transport.requests_matching("name=alice").is_empty());
    }

    #[tokio::test]
    async fn test_blank_user_is_rejected() {
        let fx = Fixture::new().await;
        let (engine, recommender) = fx.parts();

        let err = run_recommend(&engine, &recommender, fx.store.as_ref(), "  ", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
