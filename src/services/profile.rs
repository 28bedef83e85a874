//! Public user profiles and the statistics derived from a user's ratings
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{
    db::UserRepository,
    error::{AppError, AppResult},
    models::{MovieDetails, PublicUser, Rating, TmdbId},
    services::{
        library::{LibraryItem, RatedMovie, MAX_RATING, MIN_RATING},
        providers::{fetch_details, MovieProvider},
    },
};

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;
const TOP_GENRES: usize = 5;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RatingSort {
    #[default]
    Recent,
    Oldest,
    Highest,
    Lowest,
    Title,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub sort: RatingSort,
    pub min_rating: Option<u8>,
    pub max_rating: Option<u8>,
    pub genre: Option<u32>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionBucket {
    pub rating: u8,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreCount {
    pub id: u32,
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingStats {
    pub rating_count: usize,
    pub average_rating: Option<f64>,
    pub distribution: Vec<DistributionBucket>,
    pub top_genres: Vec<GenreCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryCounts {
    pub ratings: usize,
    pub favorites: usize,
    pub watchlist: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub total_pages: u32,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub user: PublicUser,
    pub counts: LibraryCounts,
    pub stats: RatingStats,
    pub ratings: Page<RatedMovie>,
    pub favorites: Vec<LibraryItem>,
}

/// Count of ratings for each value in `MIN_RATING..=MAX_RATING`
pub fn rating_distribution(ratings: &[Rating]) -> Vec<DistributionBucket> {
    (MIN_RATING..=MAX_RATING)
        .map(|value| DistributionBucket {
            rating: value,
            count: ratings.iter().filter(|r| r.rating == value).count() as u32,
        })
        .collect()
}

/// Mean rating rounded to one decimal
pub fn average_rating(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u32 = ratings.iter().map(|r| r.rating as u32).sum();
    let mean = sum as f64 / ratings.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

/// Genres ranked by how many rated movies carry them, ties by name
pub fn top_genres(
    ratings: &[Rating],
    details: &HashMap<TmdbId, MovieDetails>,
    limit: usize,
) -> Vec<GenreCount> {
    let mut counts: HashMap<u32, GenreCount> = HashMap::new();
    for rating in ratings {
        let Some(movie) = details.get(&rating.tmdb_id) else {
            continue;
        };
        for genre in &movie.genres {
            counts
                .entry(genre.id)
                .or_insert_with(|| GenreCount {
                    id: genre.id,
                    name: genre.name.clone(),
                    count: 0,
                })
                .count += 1;
        }
    }

    let mut ranked: Vec<GenreCount> = counts.into_values().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

pub fn rating_stats(ratings: &[Rating], details: &HashMap<TmdbId, MovieDetails>) -> RatingStats {
    RatingStats {
        rating_count: ratings.len(),
        average_rating: average_rating(ratings),
        distribution: rating_distribution(ratings),
        top_genres: top_genres(ratings, details, TOP_GENRES),
    }
}

fn title_key(item: &RatedMovie) -> Option<String> {
    item.movie.as_ref().map(|m| m.title.to_lowercase())
}

/// Sorts rated movies. Ties go to the most recently rated, then the lower tmdb id.
pub fn sort_rated(items: &mut [RatedMovie], sort: RatingSort) {
    items.sort_by(|a, b| {
        let primary = match sort {
            RatingSort::Recent => b.rated_at.cmp(&a.rated_at),
            RatingSort::Oldest => a.rated_at.cmp(&b.rated_at),
            RatingSort::Highest => b.rating.cmp(&a.rating),
            RatingSort::Lowest => a.rating.cmp(&b.rating),
            RatingSort::Title => match (title_key(a), title_key(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary
            .then_with(|| b.rated_at.cmp(&a.rated_at))
            .then_with(|| a.tmdb_id.cmp(&b.tmdb_id))
    });
}

fn validate_query(query: &ProfileQuery) -> AppResult<()> {
    for bound in [query.min_rating, query.max_rating].into_iter().flatten() {
        if !(MIN_RATING..=MAX_RATING).contains(&bound) {
            return Err(AppError::InvalidInput(format!(
                "Rating filters must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
    }
    if let (Some(min), Some(max)) = (query.min_rating, query.max_rating) {
        if min > max {
            return Err(AppError::InvalidInput(
                "min_rating cannot exceed max_rating".to_string(),
            ));
        }
    }
    Ok(())
}

/// Keeps the ratings that pass the query's rating and genre filters
pub fn filter_rated(
    items: Vec<RatedMovie>,
    query: &ProfileQuery,
    details: &HashMap<TmdbId, MovieDetails>,
) -> Vec<RatedMovie> {
    items
        .into_iter()
        .filter(|item| query.min_rating.map_or(true, |min| item.rating >= min))
        .filter(|item| query.max_rating.map_or(true, |max| item.rating <= max))
        .filter(|item| match query.genre {
            Some(genre) => details
                .get(&item.tmdb_id)
                .is_some_and(|d| d.genres.iter().any(|g| g.id == genre)),
            None => true,
        })
        .collect()
}

pub fn paginate<T>(items: Vec<T>, page: Option<u32>, per_page: Option<u32>) -> Page<T> {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = page.unwrap_or(1).max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page as usize) as u32;

    let start = ((page - 1) as usize).saturating_mul(per_page as usize);
    let items = items
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect();

    Page {
        page,
        per_page,
        total,
        total_pages,
        items,
    }
}

/// Builds the public profile for `username`
pub async fn profile(
    users: &dyn UserRepository,
    movies: &dyn MovieProvider,
    username: &str,
    query: ProfileQuery,
) -> AppResult<Profile> {
    validate_query(&query)?;

    let user = users
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))?;

    let ids = user
        .ratings
        .iter()
        .map(|r| r.tmdb_id)
        .chain(user.favorites.iter().map(|f| f.tmdb_id));
    let details = fetch_details(movies, ids).await;

    let rated: Vec<RatedMovie> = user
        .ratings
        .iter()
        .map(|r| RatedMovie {
            tmdb_id: r.tmdb_id,
            rating: r.rating,
            rated_at: r.rated_at,
            movie: details.get(&r.tmdb_id).map(|d| d.movie.clone()),
        })
        .collect();

    let mut filtered = filter_rated(rated, &query, &details);
    sort_rated(&mut filtered, query.sort);

    let mut favorites: Vec<LibraryItem> = user
        .favorites
        .iter()
        .map(|f| LibraryItem {
            tmdb_id: f.tmdb_id,
            added_at: f.added_at,
            movie: details.get(&f.tmdb_id).map(|d| d.movie.clone()),
        })
        .collect();
    favorites.sort_by(|a, b| b.added_at.cmp(&a.added_at));

    tracing::debug!(
        username = %user.username,
        ratings = user.ratings.len(),
        matched = filtered.len(),
        "Profile built"
    );

    Ok(Profile {
        user: PublicUser::from(&user),
        counts: LibraryCounts {
            ratings: user.ratings.len(),
            favorites: user.favorites.len(),
            watchlist: user.watchlist.len(),
        },
        stats: rating_stats(&user.ratings, &details),
        ratings: paginate(filtered, query.page, query.per_page),
        favorites,
    })
}
