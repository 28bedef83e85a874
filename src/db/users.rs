use bson::{doc, oid::ObjectId, to_bson};
use mongodb::{options::IndexOptions, Collection, Database, IndexModel};

use crate::{
    db::mongo::is_duplicate_key,
    error::{AppError, AppResult},
    models::{LibraryEntry, LibraryList, Rating, TmdbId, User},
};

const COLLECTION: &str = "users";

/// Persistence for user documents and their embedded movie arrays
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user. Fails with `Conflict` when the email or username is taken.
    async fn insert(&self, user: &User) -> AppResult<()>;

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Inserts or replaces the user's rating for `rating.tmdb_id`
    async fn set_rating(&self, user_id: ObjectId, rating: Rating) -> AppResult<()>;

    /// Returns false when there was no rating to remove
    async fn remove_rating(&self, user_id: ObjectId, tmdb_id: TmdbId) -> AppResult<bool>;

    /// Returns false when the movie was already on the list
    async fn add_to_list(
        &self,
        user_id: ObjectId,
        list: LibraryList,
        entry: LibraryEntry,
    ) -> AppResult<bool>;

    /// Returns false when the movie was not on the list
    async fn remove_from_list(
        &self,
        user_id: ObjectId,
        list: LibraryList,
        tmdb_id: TmdbId,
    ) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
}

impl MongoUserStore {
    pub async fn new(db: &Database) -> AppResult<Self> {
        let users = db.collection::<User>(COLLECTION);
        let unique = || IndexOptions::builder().unique(true).build();
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "username": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        Ok(Self { users })
    }

    async fn replace_rating(&self, user_id: ObjectId, rating: &Rating) -> AppResult<bool> {
        let result = self
            .users
            .update_one(
                doc! { "_id": user_id, "ratings.tmdb_id": rating.tmdb_id as i64 },
                doc! {
                    "$set": {
                        "ratings.$.rating": rating.rating as i32,
                        "ratings.$.rated_at": bson::DateTime::from_chrono(rating.rated_at),
                    }
                },
            )
            .await?;
        Ok(result.matched_count == 1)
    }
}

#[async_trait::async_trait]
impl UserRepository for MongoUserStore {
    async fn insert(&self, user: &User) -> AppResult<()> {
        match self.users.insert_one(user).await {
            Ok(_) => {
                tracing::info!(user_id = %user.id, username = %user.username, "User created");
                Ok(())
            }
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(
                "Email or username already registered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.users.find_one(doc! { "username": username }).await?)
    }

    async fn set_rating(&self, user_id: ObjectId, rating: Rating) -> AppResult<()> {
        if self.replace_rating(user_id, &rating).await? {
            return Ok(());
        }

        let result = self
            .users
            .update_one(
                doc! { "_id": user_id, "ratings.tmdb_id": { "$ne": rating.tmdb_id as i64 } },
                doc! { "$push": { "ratings": to_bson(&rating)? } },
            )
            .await?;
        if result.matched_count == 1 {
            return Ok(());
        }

        // A concurrent request pushed the same movie between the two updates
        if self.replace_rating(user_id, &rating).await? {
            return Ok(());
        }
        Err(AppError::NotFound("User not found".to_string()))
    }

    async fn remove_rating(&self, user_id: ObjectId, tmdb_id: TmdbId) -> AppResult<bool> {
        let result = self
            .users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$pull": { "ratings": { "tmdb_id": tmdb_id as i64 } } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn add_to_list(
        &self,
        user_id: ObjectId,
        list: LibraryList,
        entry: LibraryEntry,
    ) -> AppResult<bool> {
        let field = list.field();
        let member = format!("{}.tmdb_id", field);
        let result = self
            .users
            .update_one(
                doc! { "_id": user_id, member: { "$ne": entry.tmdb_id as i64 } },
                doc! { "$push": { field: to_bson(&entry)? } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn remove_from_list(
        &self,
        user_id: ObjectId,
        list: LibraryList,
        tmdb_id: TmdbId,
    ) -> AppResult<bool> {
        let field = list.field();
        let result = self
            .users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$pull": { field: { "tmdb_id": tmdb_id as i64 } } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }
}
