use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{CommentView, TmdbId},
    services::{
        comments::{self, PostCommentRequest},
        profile::Page,
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    page: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    WithRejection(Path(tmdb_id), _): WithRejection<Path<TmdbId>, AppError>,
    WithRejection(Query(params), _): WithRejection<Query<CommentsQuery>, AppError>,
) -> AppResult<Json<Page<CommentView>>> {
    let page = comments::list(state.comments.as_ref(), tmdb_id, params.page).await?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(tmdb_id), _): WithRejection<Path<TmdbId>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<PostCommentRequest>, AppError>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    let comment = comments::post(
        state.comments.as_ref(),
        state.movies.as_ref(),
        user.id,
        &user.username,
        tmdb_id,
        &request.body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(comment_id), _): WithRejection<Path<String>, AppError>,
) -> AppResult<StatusCode> {
    comments::delete(state.comments.as_ref(), user.id, &comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
