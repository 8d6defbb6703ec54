// src/services/decoder.rs

//! XML document decoder.
//!
//! Maps raw response bodies onto the five typed documents. Numeric fields
//! are read leniently: the upstream API leaves ids empty for unknown users
//! and reports unrated games as `N/A`, both of which become 0.

use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{
    Article, CollectionItem, CollectionSet, CollectionStatus, Forum, ForumList, ForumRef,
    GameStats, GuildRef, Thread, ThreadRef, User, UserRef,
};

/// The five document kinds served by the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    ForumList,
    Forum,
    Thread,
    User,
    Collection,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::ForumList => "forumlist",
            DocumentKind::Forum => "forum",
            DocumentKind::Thread => "thread",
            DocumentKind::User => "user",
            DocumentKind::Collection => "collection",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a forum list (`<forums>`).
pub fn decode_forum_list(bytes: &[u8]) -> Result<ForumList> {
    let raw: ForumListXml = parse(DocumentKind::ForumList, bytes)?;
    Ok(ForumList {
        id: raw.id,
        forums: raw
            .forums
            .into_iter()
            .map(|f| ForumRef {
                id: f.id,
                num_threads: f.num_threads,
            })
            .collect(),
    })
}

/// Decode a forum (`<forum>`) with its thread references.
pub fn decode_forum(bytes: &[u8]) -> Result<Forum> {
    let raw: ForumXml = parse(DocumentKind::Forum, bytes)?;
    Ok(Forum {
        id: raw.id,
        num_threads: raw.num_threads,
        threads: raw
            .threads
            .items
            .into_iter()
            .map(|t| ThreadRef {
                id: t.id,
                num_articles: t.num_articles,
            })
            .collect(),
    })
}

/// Decode a thread (`<thread>`) with its articles.
pub fn decode_thread(bytes: &[u8]) -> Result<Thread> {
    let raw: ThreadXml = parse(DocumentKind::Thread, bytes)?;
    Ok(Thread {
        id: raw.id,
        num_articles: raw.num_articles,
        articles: raw
            .articles
            .items
            .into_iter()
            .map(|a| Article {
                id: a.id,
                author: a.username,
            })
            .collect(),
    })
}

/// Decode a user profile (`<user>`).
pub fn decode_user(bytes: &[u8]) -> Result<User> {
    let raw: UserXml = parse(DocumentKind::User, bytes)?;
    Ok(User {
        id: raw.id,
        name: raw.name,
        buddies: raw
            .buddies
            .items
            .into_iter()
            .map(|b| UserRef {
                id: b.id,
                name: b.name,
            })
            .collect(),
        guilds: raw
            .guilds
            .items
            .into_iter()
            .map(|g| GuildRef {
                id: g.id,
                name: g.name,
            })
            .collect(),
    })
}

/// Decode a collection (`<items>`).
pub fn decode_collection(bytes: &[u8]) -> Result<CollectionSet> {
    let raw: CollectionXml = parse(DocumentKind::Collection, bytes)?;
    Ok(CollectionSet {
        items: raw.items.into_iter().map(CollectionItem::from).collect(),
    })
}

fn parse<T: DeserializeOwned>(kind: DocumentKind, bytes: &[u8]) -> Result<T> {
    quick_xml::de::from_reader(bytes).map_err(|e| AppError::decode(kind.as_str(), e))
}

// --- Wire layout ---

#[derive(Debug, Deserialize)]
struct ForumListXml {
    #[serde(rename = "@id", default, deserialize_with = "lenient::number")]
    id: i64,
    #[serde(rename = "forum", default)]
    forums: Vec<ForumRefXml>,
}

#[derive(Debug, Deserialize)]
struct ForumRefXml {
    #[serde(rename = "@id", default, deserialize_with = "lenient::number")]
    id: i64,
    #[serde(rename = "@numthreads", default, deserialize_with = "lenient::number")]
    num_threads: u32,
}

#[derive(Debug, Deserialize)]
struct ForumXml {
    #[serde(rename = "@id", default, deserialize_with = "lenient::number")]
    id: i64,
    #[serde(rename = "@numthreads", default, deserialize_with = "lenient::number")]
    num_threads: u32,
    #[serde(default)]
    threads: ThreadsXml,
}

#[derive(Debug, Default, Deserialize)]
struct ThreadsXml {
    #[serde(rename = "thread", default)]
    items: Vec<ThreadRefXml>,
}

#[derive(Debug, Deserialize)]
struct ThreadRefXml {
    #[serde(rename = "@id", default, deserialize_with = "lenient::number")]
    id: i64,
    #[serde(rename = "@numarticles", default, deserialize_with = "lenient::number")]
    num_articles: u32,
}

#[derive(Debug, Deserialize)]
struct ThreadXml {
    #[serde(rename = "@id", default, deserialize_with = "lenient::number")]
    id: i64,
    #[serde(rename = "@numarticles", default, deserialize_with = "lenient::number")]
    num_articles: u32,
    #[serde(default)]
    articles: ArticlesXml,
}

#[derive(Debug, Default, Deserialize)]
struct ArticlesXml {
    #[serde(rename = "article", default)]
    items: Vec<ArticleXml>,
}

#[derive(Debug, Deserialize)]
struct ArticleXml {
    #[serde(rename = "@id", default, deserialize_with = "lenient::number")]
    id: i64,
    #[serde(rename = "@username", default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct UserXml {
    #[serde(rename = "@id", default, deserialize_with = "lenient::number")]
    id: i64,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(default)]
    buddies: BuddiesXml,
    #[serde(default)]
    guilds: GuildsXml,
}

#[derive(Debug, Default, Deserialize)]
struct BuddiesXml {
    #[serde(rename = "buddy", default)]
    items: Vec<NamedRefXml>,
}

#[derive(Debug, Default, Deserialize)]
struct GuildsXml {
    #[serde(rename = "guild", default)]
    items: Vec<NamedRefXml>,
}

#[derive(Debug, Deserialize)]
struct NamedRefXml {
    #[serde(rename = "@id", default, deserialize_with = "lenient::number")]
    id: i64,
    #[serde(rename = "@name", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CollectionXml {
    #[serde(rename = "item", default)]
    items: Vec<ItemXml>,
}

#[derive(Debug, Deserialize)]
struct ItemXml {
    #[serde(rename = "@collid", default, deserialize_with = "lenient::number")]
    collection_id: i64,
    #[serde(rename = "@objectid", default, deserialize_with = "lenient::number")]
    object_id: i64,
    #[serde(rename = "@subtype", default)]
    subtype: String,
    #[serde(default)]
    name: TextXml,
    #[serde(rename = "yearpublished", default)]
    year_published: TextXml,
    #[serde(default)]
    image: TextXml,
    #[serde(rename = "numplays", default)]
    num_plays: TextXml,
    #[serde(default)]
    status: StatusXml,
    #[serde(default)]
    stats: StatsXml,
}

/// Element whose text content is the value.
#[derive(Debug, Default, Deserialize)]
struct TextXml {
    #[serde(rename = "$text", default)]
    value: String,
}

impl TextXml {
    fn text(&self) -> String {
        self.value.trim().to_string()
    }

    fn number<T: std::str::FromStr + Default>(&self) -> T {
        lenient::parse(&self.value)
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatusXml {
    #[serde(rename = "@own", default, deserialize_with = "lenient::flag")]
    own: bool,
    #[serde(rename = "@prevowned", default, deserialize_with = "lenient::flag")]
    prev_owned: bool,
    #[serde(rename = "@fortrade", default, deserialize_with = "lenient::flag")]
    for_trade: bool,
    #[serde(rename = "@want", default, deserialize_with = "lenient::flag")]
    want: bool,
    #[serde(rename = "@wanttoplay", default, deserialize_with = "lenient::flag")]
    want_to_play: bool,
    #[serde(rename = "@wanttobuy", default, deserialize_with = "lenient::flag")]
    want_to_buy: bool,
    #[serde(rename = "@wishlist", default, deserialize_with = "lenient::flag")]
    wishlist: bool,
    #[serde(
        rename = "@wishlistpriority",
        default,
        deserialize_with = "lenient::number"
    )]
    wishlist_priority: u8,
    #[serde(rename = "@preordered", default, deserialize_with = "lenient::flag")]
    preordered: bool,
    #[serde(rename = "@lastmodified", default)]
    last_modified: String,
}

#[derive(Debug, Default, Deserialize)]
struct StatsXml {
    #[serde(rename = "@minplayers", default, deserialize_with = "lenient::number")]
    min_players: u32,
    #[serde(rename = "@maxplayers", default, deserialize_with = "lenient::number")]
    max_players: u32,
    #[serde(rename = "@minplaytime", default, deserialize_with = "lenient::number")]
    min_playtime: u32,
    #[serde(rename = "@maxplaytime", default, deserialize_with = "lenient::number")]
    max_playtime: u32,
    #[serde(rename = "@playingtime", default, deserialize_with = "lenient::number")]
    playing_time: u32,
    #[serde(rename = "@numowned", default, deserialize_with = "lenient::number")]
    num_owned: u32,
    #[serde(default)]
    rating: RatingXml,
}

#[derive(Debug, Default, Deserialize)]
struct RatingXml {
    #[serde(rename = "@value", default, deserialize_with = "lenient::number")]
    value: f64,
    #[serde(rename = "usersrated", default)]
    users_rated: ValueXml,
    #[serde(default)]
    average: ValueXml,
    #[serde(rename = "bayesaverage", default)]
    bayes_average: ValueXml,
    #[serde(rename = "stddev", default)]
    std_dev: ValueXml,
    #[serde(default)]
    median: ValueXml,
}

/// Element carrying its payload in a `value` attribute.
#[derive(Debug, Default, Deserialize)]
struct ValueXml {
    #[serde(rename = "@value", default, deserialize_with = "lenient::number")]
    value: f64,
}

impl From<ItemXml> for CollectionItem {
    fn from(raw: ItemXml) -> Self {
        let rating = &raw.stats.rating;
        CollectionItem {
            collection_id: raw.collection_id,
            game_id: raw.object_id,
            name: raw.name.text(),
            subtype: raw.subtype,
            year_published: raw.year_published.number(),
            image: raw.image.text(),
            num_plays: raw.num_plays.number(),
            status: CollectionStatus {
                own: raw.status.own,
                prev_owned: raw.status.prev_owned,
                for_trade: raw.status.for_trade,
                want: raw.status.want,
                want_to_play: raw.status.want_to_play,
                want_to_buy: raw.status.want_to_buy,
                wishlist: raw.status.wishlist,
                wishlist_priority: raw.status.wishlist_priority,
                preordered: raw.status.preordered,
                last_modified: raw.status.last_modified,
            },
            rating: rating.value.max(0.0),
            stats: GameStats {
                min_players: raw.stats.min_players,
                max_players: raw.stats.max_players,
                min_playtime: raw.stats.min_playtime,
                max_playtime: raw.stats.max_playtime,
                playing_time: raw.stats.playing_time,
                num_owned: raw.stats.num_owned,
                users_rated: rating.users_rated.value.max(0.0) as u32,
                average: rating.average.value,
                bayes_average: rating.bayes_average.value,
                std_dev: rating.std_dev.value,
                median: rating.median.value,
            },
        }
    }
}

mod lenient {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer};

    /// Parse a trimmed string, falling back to the type's default.
    pub fn parse<T: FromStr + Default>(raw: &str) -> T {
        raw.trim().parse().unwrap_or_default()
    }

    pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + Default,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(parse(&raw))
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(matches!(raw.trim(), "1" | "true"))
    }
}
