use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{LibraryList, TmdbId},
    services::library::{self, LibraryItem, MovieState, RatedMovie},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListChange {
    pub tmdb_id: TmdbId,
    pub list: LibraryList,
    pub added: bool,
}

pub async fn movie_state(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(tmdb_id), _): WithRejection<Path<TmdbId>, AppError>,
) -> AppResult<Json<MovieState>> {
    Ok(Json(
        library::movie_state(state.users.as_ref(), user.id, tmdb_id).await?,
    ))
}

pub async fn ratings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<RatedMovie>>> {
    let rated = library::ratings(state.users.as_ref(), state.movies.as_ref(), user.id).await?;
    Ok(Json(rated))
}

pub async fn rate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(tmdb_id), _): WithRejection<Path<TmdbId>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<RateRequest>, AppError>,
) -> AppResult<Json<RatedMovie>> {
    let rated = library::rate(
        state.users.as_ref(),
        state.movies.as_ref(),
        user.id,
        tmdb_id,
        request.rating,
    )
    .await?;
    Ok(Json(rated))
}

pub async fn unrate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(tmdb_id), _): WithRejection<Path<TmdbId>, AppError>,
) -> AppResult<StatusCode> {
    library::unrate(state.users.as_ref(), user.id, tmdb_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn entries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(list), _): WithRejection<Path<String>, AppError>,
) -> AppResult<Json<Vec<LibraryItem>>> {
    let list: LibraryList = list.parse()?;
    let items = library::entries(state.users.as_ref(), state.movies.as_ref(), user.id, list).await?;
    Ok(Json(items))
}

/// 201 when the movie was added, 200 when it was already on the list
pub async fn add(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path((list, tmdb_id)), _): WithRejection<Path<(String, TmdbId)>, AppError>,
) -> AppResult<(StatusCode, Json<ListChange>)> {
    let list: LibraryList = list.parse()?;
    let added = library::add(
        state.users.as_ref(),
        state.movies.as_ref(),
        user.id,
        list,
        tmdb_id,
    )
    .await?;

    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ListChange {
            tmdb_id,
            list,
            added,
        }),
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path((list, tmdb_id)), _): WithRejection<Path<(String, TmdbId)>, AppError>,
) -> AppResult<StatusCode> {
    let list: LibraryList = list.parse()?;
    library::remove(state.users.as_ref(), user.id, list, tmdb_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
