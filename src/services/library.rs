use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::UserRepository,
    error::{AppError, AppResult},
    models::{LibraryEntry, LibraryList, Movie, Rating, TmdbId, User},
    services::providers::{fetch_summaries, MovieProvider},
};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

/// A rating with the rated movie attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatedMovie {
    pub tmdb_id: TmdbId,
    pub rating: u8,
    pub rated_at: DateTime<Utc>,
    pub movie: Option<Movie>,
}

/// A favorites or watchlist entry with the movie attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryItem {
    pub tmdb_id: TmdbId,
    pub added_at: DateTime<Utc>,
    pub movie: Option<Movie>,
}

/// Where one movie stands in a user's library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieState {
    pub tmdb_id: TmdbId,
    pub rating: Option<u8>,
    pub favorite: bool,
    pub watchlist: bool,
}

pub fn validate_rating(rating: i64) -> AppResult<u8> {
    if rating < MIN_RATING as i64 || rating > MAX_RATING as i64 {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(rating as u8)
}

pub(crate) async fn load_user(users: &dyn UserRepository, user_id: ObjectId) -> AppResult<User> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Attaches movies to ratings, newest first
pub async fn enrich_ratings(movies: &dyn MovieProvider, ratings: &[Rating]) -> Vec<RatedMovie> {
    let summaries = fetch_summaries(movies, ratings.iter().map(|r| r.tmdb_id)).await;

    let mut rated: Vec<RatedMovie> = ratings
        .iter()
        .map(|r| RatedMovie {
            tmdb_id: r.tmdb_id,
            rating: r.rating,
            rated_at: r.rated_at,
            movie: summaries.get(&r.tmdb_id).cloned(),
        })
        .collect();
    rated.sort_by(|a, b| b.rated_at.cmp(&a.rated_at));
    rated
}

/// Attaches movies to list entries, newest first
pub async fn enrich_entries(movies: &dyn MovieProvider, entries: &[LibraryEntry]) -> Vec<LibraryItem> {
    let summaries = fetch_summaries(movies, entries.iter().map(|e| e.tmdb_id)).await;

    let mut items: Vec<LibraryItem> = entries
        .iter()
        .map(|e| LibraryItem {
            tmdb_id: e.tmdb_id,
            added_at: e.added_at,
            movie: summaries.get(&e.tmdb_id).cloned(),
        })
        .collect();
    items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    items
}

/// Rates a movie, replacing any earlier rating
pub async fn rate(
    users: &dyn UserRepository,
    movies: &dyn MovieProvider,
    user_id: ObjectId,
    tmdb_id: TmdbId,
    rating: i64,
) -> AppResult<RatedMovie> {
    let rating = validate_rating(rating)?;
    let details = movies.details(tmdb_id).await?;

    let entry = Rating {
        tmdb_id,
        rating,
        rated_at: Utc::now(),
    };
    users.set_rating(user_id, entry.clone()).await?;

    tracing::info!(user_id = %user_id, tmdb_id, rating, "Movie rated");

    Ok(RatedMovie {
        tmdb_id,
        rating,
        rated_at: entry.rated_at,
        movie: Some(details.movie),
    })
}

pub async fn unrate(users: &dyn UserRepository, user_id: ObjectId, tmdb_id: TmdbId) -> AppResult<()> {
    if !users.remove_rating(user_id, tmdb_id).await? {
        return Err(AppError::NotFound(format!("No rating for movie {}", tmdb_id)));
    }
    tracing::info!(user_id = %user_id, tmdb_id, "Rating removed");
    Ok(())
}

/// Adds a movie to a list. Returns false when it was already there.
pub async fn add(
    users: &dyn UserRepository,
    movies: &dyn MovieProvider,
    user_id: ObjectId,
    list: LibraryList,
    tmdb_id: TmdbId,
) -> AppResult<bool> {
    movies.details(tmdb_id).await?;

    let entry = LibraryEntry {
        tmdb_id,
        added_at: Utc::now(),
    };
    let added = users.add_to_list(user_id, list, entry).await?;

    tracing::info!(user_id = %user_id, tmdb_id, list = %list, added, "Library add");

    Ok(added)
}

pub async fn remove(
    users: &dyn UserRepository,
    user_id: ObjectId,
    list: LibraryList,
    tmdb_id: TmdbId,
) -> AppResult<()> {
    if !users.remove_from_list(user_id, list, tmdb_id).await? {
        return Err(AppError::NotFound(format!(
            "Movie {} is not in {}",
            tmdb_id, list
        )));
    }
    tracing::info!(user_id = %user_id, tmdb_id, list = %list, "Library remove");
    Ok(())
}

pub async fn entries(
    users: &dyn UserRepository,
    movies: &dyn MovieProvider,
    user_id: ObjectId,
    list: LibraryList,
) -> AppResult<Vec<LibraryItem>> {
    let user = load_user(users, user_id).await?;
    Ok(enrich_entries(movies, user.list(list)).await)
}

pub async fn ratings(
    users: &dyn UserRepository,
    movies: &dyn MovieProvider,
    user_id: ObjectId,
) -> AppResult<Vec<RatedMovie>> {
    let user = load_user(users, user_id).await?;
    Ok(enrich_ratings(movies, &user.ratings).await)
}

pub async fn movie_state(
    users: &dyn UserRepository,
    user_id: ObjectId,
    tmdb_id: TmdbId,
) -> AppResult<MovieState> {
    let user = load_user(users, user_id).await?;
    Ok(MovieState {
        tmdb_id,
        rating: user.rating_for(tmdb_id),
        favorite: user.has_in(LibraryList::Favorites, tmdb_id),
        watchlist: user.has_in(LibraryList::Watchlist, tmdb_id),
    })
}
