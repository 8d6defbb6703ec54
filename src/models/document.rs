//! Typed documents produced by the decoder.
//!
//! These carry only what the traversal and the rating store consume. The
//! XML wire layout lives in `services::decoder`.

use serde::{Deserialize, Serialize};

/// Identifier of a game ("thing") upstream.
pub type GameId = i64;

/// Identifier of a user upstream.
pub type UserId = i64;

/// A page of forums attached to one catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumList {
    pub id: i64,
    pub forums: Vec<ForumRef>,
}

/// Forum reference inside a forum list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumRef {
    pub id: i64,
    pub num_threads: u32,
}

/// A forum with its thread references.
///
/// An id of zero or below means the list ran past the last real forum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forum {
    pub id: i64,
    pub num_threads: u32,
    pub threads: Vec<ThreadRef>,
}

impl Forum {
    /// Whether this forum marks the end of the catalog.
    pub fn is_end_of_catalog(&self) -> bool {
        self.id <= 0
    }
}

/// Thread reference inside a forum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRef {
    pub id: i64,
    pub num_articles: u32,
}

/// A thread with its articles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thread {
    pub id: i64,
    pub num_articles: u32,
    pub articles: Vec<Article>,
}

/// A single post; only the author is followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: i64,
    pub author: String,
}

/// A user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub buddies: Vec<UserRef>,
    pub guilds: Vec<GuildRef>,
}

impl User {
    /// Users without a name are placeholders for unknown accounts.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn handle(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Lightweight user handle (buddies, collection owners).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
}

/// Guild membership; decoded but not followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildRef {
    pub id: i64,
    pub name: String,
}

/// All items of one user's collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSet {
    pub items: Vec<CollectionItem>,
}

/// One row of a user's collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionItem {
    /// Collection row id, unique across all users
    pub collection_id: i64,
    pub game_id: GameId,
    pub name: String,
    pub subtype: String,
    pub year_published: i32,
    pub image: String,
    pub num_plays: u32,
    pub status: CollectionStatus,
    /// User rating; 0 means unrated
    pub rating: f64,
    pub stats: GameStats,
}

impl CollectionItem {
    pub fn is_rated(&self) -> bool {
        self.rating > 0.0
    }

    /// Rating rounded for the per-user ratings record.
    pub fn rounded_rating(&self) -> i32 {
        self.rating.round() as i32
    }
}

/// Ownership and wish flags of a collection row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStatus {
    pub own: bool,
    pub prev_owned: bool,
    pub for_trade: bool,
    pub want: bool,
    pub want_to_play: bool,
    pub want_to_buy: bool,
    pub wishlist: bool,
    pub wishlist_priority: u8,
    pub preordered: bool,
    pub last_modified: String,
}

/// Game-level statistics embedded in a collection row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameStats {
    pub min_players: u32,
    pub max_players: u32,
    pub min_playtime: u32,
    pub max_playtime: u32,
    pub playing_time: u32,
    pub num_owned: u32,
    pub users_rated: u32,
    pub average: f64,
    pub bayes_average: f64,
    pub std_dev: f64,
    pub median: f64,
}
