//! TMDB v3 provider
//!
//! Endpoints used:
//! - `/movie/{list}` and `/trending/movie/week` for curated lists
//! - `/search/movie` for title search
//! - `/genre/movie/list` and `/discover/movie` for genre browsing
//! - `/movie/{id}?append_to_response=credits,videos` for details
//! - `/movie/{id}/recommendations` for similar movies
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        Genre, ImageUrls, MovieCategory, MovieDetails, MoviePage, TmdbGenreList, TmdbId,
        TmdbMovieDetails, TmdbPage,
    },
    services::providers::MovieProvider,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;

const LIST_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
const GENRE_CACHE_TTL: u64 = 604800; // 1 week

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    images: ImageUrls,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String, image_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            images: ImageUrls::new(image_url),
            cache,
        }
    }

    /// GETs `path` under the API root and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource not found: {}", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn fetch_page(&self, path: &str, query: &[(&str, String)]) -> AppResult<MoviePage> {
        let page: TmdbPage = self.get_json(path, query).await?;
        Ok(page.into_page(&self.images))
    }
}

#[async_trait::async_trait]
impl MovieProvider for TmdbProvider {
    async fn list(&self, category: MovieCategory, page: u32) -> AppResult<MoviePage> {
        cached!(
            self.cache,
            CacheKey::MovieList(category, page),
            LIST_CACHE_TTL,
            async move {
                let movies = self
                    .fetch_page(category.path(), &[("page", page.to_string())])
                    .await?;

                tracing::info!(
                    category = %category,
                    page,
                    results = movies.results.len(),
                    provider = "tmdb",
                    "Movie list fetched"
                );

                Ok::<_, AppError>(movies)
            }
        )
    }

    async fn search(&self, query: &str, page: u32) -> AppResult<MoviePage> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::Search(query.to_string(), page),
            LIST_CACHE_TTL,
            async move {
                let movies = self
                    .fetch_page(
                        "search/movie",
                        &[
                            ("query", query.to_string()),
                            ("page", page.to_string()),
                            ("include_adult", "false".to_string()),
                        ],
                    )
                    .await?;

                tracing::info!(
                    query = %query,
                    results = movies.results.len(),
                    provider = "tmdb",
                    "Movie search completed"
                );

                Ok::<_, AppError>(movies)
            }
        )
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        cached!(self.cache, CacheKey::Genres, GENRE_CACHE_TTL, async move {
            let list: TmdbGenreList = self.get_json("genre/movie/list", &[]).await?;
            Ok::<_, AppError>(list.genres)
        })
    }

    async fn discover(&self, genre_id: u32, page: u32) -> AppResult<MoviePage> {
        cached!(
            self.cache,
            CacheKey::Discover(genre_id, page),
            LIST_CACHE_TTL,
            async move {
                self.fetch_page(
                    "discover/movie",
                    &[
                        ("with_genres", genre_id.to_string()),
                        ("sort_by", "popularity.desc".to_string()),
                        ("include_adult", "false".to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await
            }
        )
    }

    async fn details(&self, tmdb_id: TmdbId) -> AppResult<MovieDetails> {
        cached!(
            self.cache,
            CacheKey::Details(tmdb_id),
            DETAILS_CACHE_TTL,
            async move {
                let raw: TmdbMovieDetails = self
                    .get_json(
                        &format!("movie/{}", tmdb_id),
                        &[("append_to_response", "credits,videos".to_string())],
                    )
                    .await?;

                tracing::debug!(tmdb_id, provider = "tmdb", "Movie details fetched");

                Ok::<_, AppError>(raw.into_details(&self.images))
            }
        )
    }

    async fn similar(&self, tmdb_id: TmdbId, page: u32) -> AppResult<MoviePage> {
        cached!(
            self.cache,
            CacheKey::Similar(tmdb_id, page),
            LIST_CACHE_TTL,
            async move {
                self.fetch_page(
                    &format!("movie/{}/recommendations", tmdb_id),
                    &[("page", page.to_string())],
                )
                .await
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
