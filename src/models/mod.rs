use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

pub mod comment;
pub mod user;

pub use comment::{Comment, CommentView, FeedCursor, FeedItem};
pub use user::{AccountView, LibraryEntry, LibraryList, PublicUser, Rating, User};

/// TMDB's numeric movie identifier
pub type TmdbId = u64;

/// TMDB rejects page numbers outside this range
pub const MAX_TMDB_PAGE: u32 = 500;

pub fn clamp_page(page: Option<u32>) -> u32 {
    page.unwrap_or(1).clamp(1, MAX_TMDB_PAGE)
}

/// A movie as returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: TmdbId,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub vote_average: f64,
    pub vote_count: u64,
    pub genre_ids: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    pub character: Option<String>,
    pub profile_url: Option<String>,
}

/// Full movie record for the details page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    pub tagline: Option<String>,
    pub runtime: Option<u32>,
    pub genres: Vec<Genre>,
    pub director: Option<String>,
    pub cast: Vec<CastMember>,
    pub trailer_key: Option<String>,
}

/// One page of movies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub results: Vec<Movie>,
}

/// Curated TMDB movie lists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MovieCategory {
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
    Trending,
}

impl MovieCategory {
    /// TMDB path for this list, relative to the API root
    pub fn path(&self) -> &'static str {
        match self {
            MovieCategory::Popular => "movie/popular",
            MovieCategory::TopRated => "movie/top_rated",
            MovieCategory::NowPlaying => "movie/now_playing",
            MovieCategory::Upcoming => "movie/upcoming",
            MovieCategory::Trending => "trending/movie/week",
        }
    }
}

impl Display for MovieCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MovieCategory::Popular => "popular",
            MovieCategory::TopRated => "top_rated",
            MovieCategory::NowPlaying => "now_playing",
            MovieCategory::Upcoming => "upcoming",
            MovieCategory::Trending => "trending",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for MovieCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(MovieCategory::Popular),
            "top_rated" => Ok(MovieCategory::TopRated),
            "now_playing" => Ok(MovieCategory::NowPlaying),
            "upcoming" => Ok(MovieCategory::Upcoming),
            "trending" => Ok(MovieCategory::Trending),
            other => Err(AppError::InvalidInput(format!("Unknown movie list: {}", other))),
        }
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Movie entry in TMDB list and search responses
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: TmdbId,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

/// Paged TMDB response
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
}

/// GET /movie/{id}?append_to_response=credits,videos
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: TmdbId,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub videos: Option<TmdbVideos>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCast>,
    #[serde(default)]
    pub crew: Vec<TmdbCrew>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCast {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrew {
    pub name: String,
    #[serde(default)]
    pub job: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TmdbVideos {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbVideo {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenreList {
    pub genres: Vec<Genre>,
}

const CAST_LIMIT: usize = 10;

/// Builds absolute image URLs from TMDB file paths
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base: String,
}

impl ImageUrls {
    pub const POSTER: &'static str = "w500";
    pub const BACKDROP: &'static str = "w1280";
    pub const PROFILE: &'static str = "w185";

    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, size: &str, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}/{}/{}", self.base, size, p.trim_start_matches('/')))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn year_of(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

impl TmdbMovie {
    pub fn into_movie(self, images: &ImageUrls) -> Movie {
        let release_date = non_empty(self.release_date);
        Movie {
            id: self.id,
            title: self.title,
            overview: non_empty(self.overview),
            poster_url: images.url(ImageUrls::POSTER, self.poster_path.as_deref()),
            backdrop_url: images.url(ImageUrls::BACKDROP, self.backdrop_path.as_deref()),
            release_year: year_of(release_date.as_deref()),
            release_date,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            genre_ids: self.genre_ids,
        }
    }
}

impl TmdbPage {
    pub fn into_page(self, images: &ImageUrls) -> MoviePage {
        MoviePage {
            page: self.page,
            total_pages: self.total_pages,
            total_results: self.total_results,
            results: self
                .results
                .into_iter()
                .map(|m| m.into_movie(images))
                .collect(),
        }
    }
}

impl TmdbMovieDetails {
    pub fn into_details(self, images: &ImageUrls) -> MovieDetails {
        let credits = self.credits.unwrap_or_default();

        let director = credits
            .crew
            .iter()
            .find(|c| c.job == "Director")
            .map(|c| c.name.clone());

        let mut cast = credits.cast;
        cast.sort_by_key(|c| c.order);
        let cast = cast
            .into_iter()
            .take(CAST_LIMIT)
            .map(|c| CastMember {
                profile_url: images.url(ImageUrls::PROFILE, c.profile_path.as_deref()),
                id: c.id,
                name: c.name,
                character: non_empty(c.character),
            })
            .collect();

        let trailer_key = self
            .videos
            .unwrap_or_default()
            .results
            .into_iter()
            .find(|v| v.site == "YouTube" && v.video_type == "Trailer")
            .map(|v| v.key);

        let release_date = non_empty(self.release_date);
        let movie = Movie {
            id: self.id,
            title: self.title,
            overview: non_empty(self.overview),
            poster_url: images.url(ImageUrls::POSTER, self.poster_path.as_deref()),
            backdrop_url: images.url(ImageUrls::BACKDROP, self.backdrop_path.as_deref()),
            release_year: year_of(release_date.as_deref()),
            release_date,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            genre_ids: self.genres.iter().map(|g| g.id).collect(),
        };

        MovieDetails {
            movie,
            tagline: non_empty(self.tagline),
            runtime: self.runtime.filter(|r| *r > 0),
            genres: self.genres,
            director,
            cast,
            trailer_key,
        }
    }
}
