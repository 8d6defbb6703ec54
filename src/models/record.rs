//! Persisted rows and query results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{CollectionItem, CollectionStatus, GameId, UserId, UserRef};

/// One stored collection row, keyed by `collection_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRow {
    pub collection_id: i64,
    pub user_id: UserId,
    pub user_name: String,
    pub game_id: GameId,
    pub game_name: String,
    pub num_plays: u32,
    pub status: CollectionStatus,
    pub user_rating: f64,
}

impl CollectionRow {
    pub fn new(owner: &UserRef, item: &CollectionItem) -> Self {
        Self {
            collection_id: item.collection_id,
            user_id: owner.id,
            user_name: owner.name.clone(),
            game_id: item.game_id,
            game_name: item.name.clone(),
            num_plays: item.num_plays,
            status: item.status.clone(),
            user_rating: item.rating,
        }
    }
}

/// Display and aggregate data for one game, keyed by `game_id`.
///
/// Written from whichever collection mentioned the game last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub game_id: GameId,
    pub name: String,
    pub year_published: i32,
    pub image: String,
    pub subtype: String,
    pub min_players: u32,
    pub max_players: u32,
    pub min_playtime: u32,
    pub max_playtime: u32,
    pub playing_time: u32,
    pub num_owned: u32,
    pub ratings_count: u32,
    pub average_rating: f64,
    pub bayes_average_rating: f64,
    pub std_dev_rating: f64,
    pub median_rating: f64,
}

impl From<&CollectionItem> for GameMetadata {
    fn from(item: &CollectionItem) -> Self {
        Self {
            game_id: item.game_id,
            name: item.name.clone(),
            year_published: item.year_published,
            image: item.image.clone(),
            subtype: item.subtype.clone(),
            min_players: item.stats.min_players,
            max_players: item.stats.max_players,
            min_playtime: item.stats.min_playtime,
            max_playtime: item.stats.max_playtime,
            playing_time: item.stats.playing_time,
            num_owned: item.stats.num_owned,
            ratings_count: item.stats.users_rated,
            average_rating: item.stats.average,
            bayes_average_rating: item.stats.bayes_average,
            std_dev_rating: item.stats.std_dev,
            median_rating: item.stats.median,
        }
    }
}

/// All ratings of one user, keyed by `user_id`.
///
/// Serialized with stringified game ids: `{"13": 8, "822": 6}`.
/// Replaced wholesale on every crawl of the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsRecord {
    pub user_id: UserId,
    pub user_name: String,
    pub ratings: BTreeMap<GameId, i32>,
    pub updated_at: DateTime<Utc>,
}

impl RatingsRecord {
    pub fn new(user: &UserRef, ratings: BTreeMap<GameId, i32>) -> Self {
        Self {
            user_id: user.id,
            user_name: user.name.clone(),
            ratings,
            updated_at: Utc::now(),
        }
    }

    /// Case-insensitive match against a user name.
    pub fn belongs_to(&self, user_name: &str) -> bool {
        self.user_name.eq_ignore_ascii_case(user_name.trim())
    }
}

/// Crawl resume point: the next forum list to walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub forum_id: i64,
}

/// One entry of a recommendation answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecommendation {
    pub game_id: GameId,
    pub name: String,
    /// Predicted rating for the requesting user
    pub score: f64,
    pub year_published: i32,
    pub image: String,
    pub min_players: u32,
    pub max_players: u32,
}

impl GameRecommendation {
    pub fn new(meta: &GameMetadata, score: f64) -> Self {
        Self {
            game_id: meta.game_id,
            name: meta.name.clone(),
            score,
            year_published: meta.year_published,
            image: meta.image.clone(),
            min_players: meta.min_players,
            max_players: meta.max_players,
        }
    }
}

/// Row counts reported by a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub collection_rows: usize,
    pub games: usize,
    pub ratings_records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratings_record_json_uses_string_keys() {
        let user = UserRef {
            id: 7,
            name: "alice".into(),
        };
        let record = RatingsRecord::new(&user, BTreeMap::from([(13, 8), (822, 6)]));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ratings"]["13"], 8);
        assert_eq!(json["ratings"]["822"], 6);

        let back: RatingsRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.ratings.get(&13), Some(&8));
    }

    #[test]
    fn test_belongs_to_ignores_case() {
        let user = UserRef {
            id: 1,
            name: "Alice".into(),
        };
        let record = RatingsRecord::new(&user, BTreeMap::new());
        assert!(record.belongs_to("alice"));
        assert!(!record.belongs_to("bob"));
    }

    #[test]
    fn test_recommendation_serializes_camel_case() {
        let meta = GameMetadata {
            game_id: 13,
            name: "Catan".into(),
            year_published: 1995,
            image: "catan.jpg".into(),
            subtype: "boardgame".into(),
            min_players: 3,
            max_players: 4,
            min_playtime: 60,
            max_playtime: 120,
            playing_time: 120,
            num_owned: 100,
            ratings_count: 50,
            average_rating: 7.1,
            bayes_average_rating: 7.0,
            std_dev_rating: 1.4,
            median_rating: 0.0,
        };
        let json = serde_json::to_value(GameRecommendation::new(&meta, 8.5)).unwrap();
        assert_eq!(json["gameId"], 13);
        assert_eq!(json["yearPublished"], 1995);
        assert_eq!(json["minPlayers"], 3);
    }
}
