use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::TmdbId;
use crate::error::AppError;

/// Stored user document. Ratings, favorites and the watchlist are embedded arrays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    /// Always lower-cased
    pub email: String,
    pub password_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub favorites: Vec<LibraryEntry>,
    #[serde(default)]
    pub watchlist: Vec<LibraryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub tmdb_id: TmdbId,
    /// 1..=10
    pub rating: u8,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub rated_at: DateTime<Utc>,
}

/// Entry in a favorites or watchlist array
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryEntry {
    pub tmdb_id: TmdbId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub added_at: DateTime<Utc>,
}

/// The two movie lists embedded in a user document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LibraryList {
    Favorites,
    Watchlist,
}

impl LibraryList {
    /// Name of the array field on the user document
    pub fn field(&self) -> &'static str {
        match self {
            LibraryList::Favorites => "favorites",
            LibraryList::Watchlist => "watchlist",
        }
    }
}

impl Display for LibraryList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field())
    }
}

impl FromStr for LibraryList {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "favorites" => Ok(LibraryList::Favorites),
            "watchlist" => Ok(LibraryList::Watchlist),
            other => Err(AppError::InvalidInput(format!("Unknown list: {}", other))),
        }
    }
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: ObjectId::new(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
            ratings: Vec::new(),
            favorites: Vec::new(),
            watchlist: Vec::new(),
        }
    }

    pub fn list(&self, list: LibraryList) -> &[LibraryEntry] {
        match list {
            LibraryList::Favorites => &self.favorites,
            LibraryList::Watchlist => &self.watchlist,
        }
    }

    pub fn rating_for(&self, tmdb_id: TmdbId) -> Option<u8> {
        self.ratings
            .iter()
            .find(|r| r.tmdb_id == tmdb_id)
            .map(|r| r.rating)
    }

    pub fn has_in(&self, list: LibraryList, tmdb_id: TmdbId) -> bool {
        self.list(list).iter().any(|e| e.tmdb_id == tmdb_id)
    }
}

/// Account view for the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// What other users can see of an account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}
