use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{clamp_page, Genre, MovieCategory, MovieDetails, MoviePage, TmdbId},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    genre: u32,
    page: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    WithRejection(Path(category), _): WithRejection<Path<String>, AppError>,
    WithRejection(Query(params), _): WithRejection<Query<PageQuery>, AppError>,
) -> AppResult<Json<MoviePage>> {
    let category: MovieCategory = category.parse()?;
    let page = state.movies.list(category, clamp_page(params.page)).await?;
    Ok(Json(page))
}

pub async fn search(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<SearchQuery>, AppError>,
) -> AppResult<Json<MoviePage>> {
    let page = state
        .movies
        .search(&params.q, clamp_page(params.page))
        .await?;
    Ok(Json(page))
}

pub async fn genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.movies.genres().await?))
}

/// Most popular movies in one genre
pub async fn discover(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<DiscoverQuery>, AppError>,
) -> AppResult<Json<MoviePage>> {
    let page = state
        .movies
        .discover(params.genre, clamp_page(params.page))
        .await?;
    Ok(Json(page))
}

pub async fn details(
    State(state): State<AppState>,
    WithRejection(Path(tmdb_id), _): WithRejection<Path<TmdbId>, AppError>,
) -> AppResult<Json<MovieDetails>> {
    Ok(Json(state.movies.details(tmdb_id).await?))
}

pub async fn similar(
    State(state): State<AppState>,
    WithRejection(Path(tmdb_id), _): WithRejection<Path<TmdbId>, AppError>,
    WithRejection(Query(params), _): WithRejection<Query<PageQuery>, AppError>,
) -> AppResult<Json<MoviePage>> {
    let page = state
        .movies
        .similar(tmdb_id, clamp_page(params.page))
        .await?;
    Ok(Json(page))
}
