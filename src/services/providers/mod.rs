//! Movie catalog provider abstraction
//!
//! The catalog is owned by an external service (TMDB). Everything the API
//! needs from it goes through this trait so handlers and services can run
//! against a stub in tests.
use futures::{stream, StreamExt};
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{Genre, Movie, MovieCategory, MovieDetails, MoviePage, TmdbId},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Most TMDB lookups a single enrichment keeps in flight
pub const ENRICH_CONCURRENCY: usize = 8;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieProvider: Send + Sync {
    /// One page of a curated list
    async fn list(&self, category: MovieCategory, page: u32) -> AppResult<MoviePage>;

    /// Free-text title search. Blank queries are rejected.
    async fn search(&self, query: &str, page: u32) -> AppResult<MoviePage>;

    async fn genres(&self) -> AppResult<Vec<Genre>>;

    /// Most popular movies in a genre
    async fn discover(&self, genre_id: u32, page: u32) -> AppResult<MoviePage>;

    /// Full details. Unknown ids fail with `NotFound`.
    async fn details(&self, tmdb_id: TmdbId) -> AppResult<MovieDetails>;

    /// Movies recommended alongside `tmdb_id`
    async fn similar(&self, tmdb_id: TmdbId, page: u32) -> AppResult<MoviePage>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Fetches details for many movies in parallel
///
/// Duplicate ids are fetched once, at most [`ENRICH_CONCURRENCY`] at a time.
/// Ids that fail to resolve are logged and left out of the map, so callers
/// decide how to render a missing movie.
pub async fn fetch_details(
    provider: &dyn MovieProvider,
    ids: impl IntoIterator<Item = TmdbId>,
) -> HashMap<TmdbId, MovieDetails> {
    let mut unique: Vec<TmdbId> = ids.into_iter().collect();
    unique.sort_unstable();
    unique.dedup();

    let results: Vec<_> = stream::iter(unique)
        .map(|id| async move { (id, provider.details(id).await) })
        .buffer_unordered(ENRICH_CONCURRENCY)
        .collect()
        .await;

    let mut movies = HashMap::with_capacity(results.len());
    let mut failures = 0usize;
    for (id, result) in results {
        match result {
            Ok(details) => {
                movies.insert(id, details);
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(
                    tmdb_id = id,
                    provider = provider.name(),
                    error = %e,
                    "Movie enrichment failed"
                );
            }
        }
    }

    if failures > 0 {
        tracing::warn!(
            success_count = movies.len(),
            error_count = failures,
            "Partial movie enrichment"
        );
    }

    movies
}

/// Summary-only variant of [`fetch_details`]
pub async fn fetch_summaries(
    provider: &dyn MovieProvider,
    ids: impl IntoIterator<Item = TmdbId>,
) -> HashMap<TmdbId, Movie> {
    fetch_details(provider, ids)
        .await
        .into_iter()
        .map(|(id, details)| (id, details.movie))
        .collect()
}
