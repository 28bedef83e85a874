use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{Collection, Database, IndexModel};

use crate::{
    error::AppResult,
    models::{Comment, FeedCursor, TmdbId},
};

const COLLECTION: &str = "comments";

/// Persistence for movie comments, which double as the activity feed
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: &Comment) -> AppResult<()>;

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Comment>>;

    /// Returns false when no comment had this id
    async fn delete(&self, id: ObjectId) -> AppResult<bool>;

    /// Comments on one movie, newest first
    async fn for_movie(&self, tmdb_id: TmdbId, skip: u64, limit: i64) -> AppResult<Vec<Comment>>;

    async fn count_for_movie(&self, tmdb_id: TmdbId) -> AppResult<u64>;

    /// Comments across all movies strictly before `before`, newest first
    async fn recent(&self, before: Option<FeedCursor>, limit: i64) -> AppResult<Vec<Comment>>;

    /// Comments after `cursor`, oldest first
    async fn since(&self, cursor: FeedCursor, limit: i64) -> AppResult<Vec<Comment>>;
}

#[derive(Clone)]
pub struct MongoCommentStore {
    comments: Collection<Comment>,
}

impl MongoCommentStore {
    pub async fn new(db: &Database) -> AppResult<Self> {
        let comments = db.collection::<Comment>(COLLECTION);
        comments
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "tmdb_id": 1, "created_at": -1 })
                    .build(),
            )
            .await?;
        comments
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "created_at": -1, "_id": -1 })
                    .build(),
            )
            .await?;
        Ok(Self { comments })
    }
}

fn since_filter(cursor: &FeedCursor) -> Document {
    let at = bson::DateTime::from_chrono(cursor.created_at);
    match cursor.id {
        Some(id) => doc! {
            "$or": [
                { "created_at": { "$gt": at } },
                { "created_at": at, "_id": { "$gt": id } },
            ]
        },
        None => doc! { "created_at": { "$gt": at } },
    }
}

fn before_filter(cursor: &FeedCursor) -> Document {
    let at = bson::DateTime::from_chrono(cursor.created_at);
    match cursor.id {
        Some(id) => doc! {
            "$or": [
                { "created_at": { "$lt": at } },
                { "created_at": at, "_id": { "$lt": id } },
            ]
        },
        None => doc! { "created_at": { "$lt": at } },
    }
}

#[async_trait::async_trait]
impl CommentRepository for MongoCommentStore {
    async fn insert(&self, comment: &Comment) -> AppResult<()> {
        self.comments.insert_one(comment).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Comment>> {
        Ok(self.comments.find_one(doc! { "_id": id }).await?)
    }

    async fn delete(&self, id: ObjectId) -> AppResult<bool> {
        let result = self.comments.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count == 1)
    }

    async fn for_movie(&self, tmdb_id: TmdbId, skip: u64, limit: i64) -> AppResult<Vec<Comment>> {
        let cursor = self
            .comments
            .find(doc! { "tmdb_id": tmdb_id as i64 })
            .sort(doc! { "created_at": -1, "_id": -1 })
            .skip(skip)
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_for_movie(&self, tmdb_id: TmdbId) -> AppResult<u64> {
        Ok(self
            .comments
            .count_documents(doc! { "tmdb_id": tmdb_id as i64 })
            .await?)
    }

    async fn recent(&self, before: Option<FeedCursor>, limit: i64) -> AppResult<Vec<Comment>> {
        let filter = before.as_ref().map(before_filter).unwrap_or_default();
        let cursor = self
            .comments
            .find(filter)
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn since(&self, cursor: FeedCursor, limit: i64) -> AppResult<Vec<Comment>> {
        let cursor = self
            .comments
            .find(since_filter(&cursor))
            .sort(doc! { "created_at": 1, "_id": 1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
