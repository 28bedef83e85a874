use std::{cmp::Ordering, fmt, str::FromStr};

use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::{Movie, TmdbId};
use crate::error::AppError;

/// Stored comment document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub tmdb_id: TmdbId,
    pub user_id: ObjectId,
    /// Author name at the time of posting
    pub username: String,
    pub body: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(tmdb_id: TmdbId, user_id: ObjectId, username: String, body: String) -> Self {
        Self {
            id: ObjectId::new(),
            tmdb_id,
            user_id,
            username,
            body,
            // BSON dates hold milliseconds
            created_at: Utc::now().trunc_subsecs(3),
        }
    }
}

/// Comment as returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentView {
    pub id: String,
    pub tmdb_id: TmdbId,
    pub user_id: String,
    pub username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.to_hex(),
            tmdb_id: comment.tmdb_id,
            user_id: comment.user_id.to_hex(),
            username: comment.username.clone(),
            body: comment.body.clone(),
            created_at: comment.created_at,
        }
    }
}

/// A feed entry: a comment plus the movie it was posted on, when TMDB resolved it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    #[serde(flatten)]
    pub comment: CommentView,
    pub movie: Option<Movie>,
}

/// Position in the comment stream. Comments are ordered by `(created_at, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub id: Option<ObjectId>,
}

impl FeedCursor {
    pub fn at(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            id: None,
        }
    }

    pub fn after(comment: &Comment) -> Self {
        Self {
            created_at: comment.created_at,
            id: Some(comment.id),
        }
    }

    /// Cursor for a live connection opened now. Comments stored in the
    /// current millisecond are still delivered.
    pub fn starting_now() -> Self {
        Self::at(Utc::now().trunc_subsecs(3) - Duration::milliseconds(1))
    }

    fn cmp_comment(&self, comment: &Comment) -> Ordering {
        match comment.created_at.cmp(&self.created_at) {
            Ordering::Equal => match self.id {
                Some(id) => comment.id.cmp(&id),
                None => Ordering::Equal,
            },
            other => other,
        }
    }

    /// Whether `comment` sorts strictly after this cursor
    pub fn precedes(&self, comment: &Comment) -> bool {
        self.cmp_comment(comment) == Ordering::Greater
    }

    /// Whether `comment` sorts strictly before this cursor
    pub fn follows(&self, comment: &Comment) -> bool {
        self.cmp_comment(comment) == Ordering::Less
    }
}

/// Encoded as `<rfc3339>_<objectid hex>`. A bare RFC 3339 timestamp is also
/// accepted and leaves the id unset.
impl fmt::Display for FeedCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        match self.id {
            Some(id) => write!(f, "{}_{}", at, id.to_hex()),
            None => f.write_str(&at),
        }
    }
}

impl FromStr for FeedCursor {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidInput(format!("Invalid feed cursor: {}", raw));
        let (at, id) = match raw.split_once('_') {
            Some((at, id)) => (at, Some(ObjectId::parse_str(id).map_err(|_| invalid())?)),
            None => (raw, None),
        };
        let created_at = DateTime::parse_from_rfc3339(at)
            .map_err(|_| invalid())?
            .with_timezone(&Utc);
        Ok(Self { created_at, id })
    }
}
