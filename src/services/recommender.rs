// src/services/recommender.rs

//! Neighborhood collaborative filtering.
//!
//! Neighbors are weighted by cosine similarity over the games both users
//! rated. A candidate's predicted score is the similarity-weighted mean of
//! the neighbors' ratings for it. Ranking is score descending, then game id
//! ascending.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::Result;
use crate::models::{GameId, GameRecommendation, RecommenderConfig};
use crate::storage::RatingStore;

/// One user's ratings; absent games are unrated.
pub type RatingRow = BTreeMap<GameId, i32>;

/// Cosine similarity restricted to co-rated games.
///
/// Returns the similarity and the number of shared games. Zero ratings are
/// treated as absent.
pub fn cosine_similarity(a: &RatingRow, b: &RatingRow) -> (f64, usize) {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    let mut overlap = 0;

    for (game, &ra) in a {
        let Some(&rb) = b.get(game) else { continue };
        if ra == 0 || rb == 0 {
            continue;
        }
        let (ra, rb) = (f64::from(ra), f64::from(rb));
        dot += ra * rb;
        norm_a += ra * ra;
        norm_b += rb * rb;
        overlap += 1;
    }

    if overlap == 0 || norm_a == 0.0 || norm_b == 0.0 {
        return (0.0, overlap);
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt()), overlap)
}

/// Predicted scores for the games `target` has not rated, best first.
pub fn rank_candidates(
    target: &RatingRow,
    neighbors: &[&RatingRow],
    min_overlap: usize,
) -> Vec<(GameId, f64)> {
    // game -> (sum of sim * rating, sum of sim)
    let mut sums: HashMap<GameId, (f64, f64)> = HashMap::new();

    for neighbor in neighbors {
        let (sim, overlap) = cosine_similarity(target, neighbor);
        if overlap < min_overlap.max(1) || sim <= 0.0 {
            continue;
        }
        for (&game, &rating) in neighbor.iter() {
            if rating == 0 || target.get(&game).is_some_and(|&r| r != 0) {
                continue;
            }
            let entry = sums.entry(game).or_insert((0.0, 0.0));
            entry.0 += sim * f64::from(rating);
            entry.1 += sim;
        }
    }

    let mut ranked: Vec<(GameId, f64)> = sums
        .into_iter()
        .filter(|(_, (_, weight))| *weight > 0.0)
        .map(|(game, (weighted, weight))| (game, weighted / weight))
        .collect();
    ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    ranked
}

/// Answers "recommend for user X" from stored ratings.
pub struct Recommender {
    store: Arc<dyn RatingStore>,
    config: RecommenderConfig,
}

impl Recommender {
    pub fn new(store: Arc<dyn RatingStore>, config: RecommenderConfig) -> Self {
        Self { store, config }
    }

    /// Up to `top_k` recommendations for `user_name`, in rank order.
    ///
    /// A user without stored ratings or without neighbors gets an empty
    /// list.
    pub async fn recommend(&self, user_name: &str) -> Result<Vec<GameRecommendation>> {
        let sample = self
            .store
            .sample_ratings(self.config.sample_size, user_name)
            .await?;

        let Some(target) = sample.iter().find(|r| r.belongs_to(user_name)) else {
            log::info!("No ratings stored for {}", user_name);
            return Ok(Vec::new());
        };
        let neighbors: Vec<&RatingRow> = sample
            .iter()
            .filter(|r| r.user_id != target.user_id)
            .map(|r| &r.ratings)
            .collect();

        let mut ranked = rank_candidates(&target.ratings, &neighbors, self.config.min_overlap);
        ranked.truncate(self.config.top_k);
        log::debug!(
            "Ranked {} candidates for {} from {} neighbors",
            ranked.len(),
            user_name,
            neighbors.len()
        );
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<GameId> = ranked.iter().map(|(game, _)| *game).collect();
        let games = self.store.games_by_ids(&ids).await?;

        Ok(ranked
            .into_iter()
            .filter_map(|(game, score)| match games.get(&game) {
                Some(meta) => Some(GameRecommendation::new(meta, score)),
                None => {
                    log::debug!("Dropping game {} without metadata", game);
                    None
                }
            })
            .collect())
    }
}
