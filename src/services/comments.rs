use bson::oid::ObjectId;
use serde::Deserialize;

use crate::{
    db::CommentRepository,
    error::{AppError, AppResult},
    models::{Comment, CommentView, TmdbId},
    services::{profile::Page, providers::MovieProvider},
};

pub const COMMENTS_PER_PAGE: u32 = 20;
pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    pub body: String,
}

/// Trims the body and enforces the length limit
pub fn normalize_body(body: &str) -> AppResult<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::InvalidInput("Comment cannot be empty".to_string()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Comment cannot exceed {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(body.to_string())
}

pub fn parse_comment_id(id: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| AppError::InvalidInput(format!("Invalid comment id: {}", id)))
}

/// One page of a movie's comments, newest first
pub async fn list(
    comments: &dyn CommentRepository,
    tmdb_id: TmdbId,
    page: Option<u32>,
) -> AppResult<Page<CommentView>> {
    let page = page.unwrap_or(1).max(1);
    let skip = (page as u64 - 1) * COMMENTS_PER_PAGE as u64;

    let total = comments.count_for_movie(tmdb_id).await?;
    let items = comments
        .for_movie(tmdb_id, skip, COMMENTS_PER_PAGE as i64)
        .await?
        .iter()
        .map(CommentView::from)
        .collect();

    Ok(Page {
        page,
        per_page: COMMENTS_PER_PAGE,
        total: total as usize,
        total_pages: total.div_ceil(COMMENTS_PER_PAGE as u64) as u32,
        items,
    })
}

pub async fn post(
    comments: &dyn CommentRepository,
    movies: &dyn MovieProvider,
    user_id: ObjectId,
    username: &str,
    tmdb_id: TmdbId,
    body: &str,
) -> AppResult<CommentView> {
    let body = normalize_body(body)?;
    movies.details(tmdb_id).await?;

    let comment = Comment::new(tmdb_id, user_id, username.to_string(), body);
    comments.insert(&comment).await?;

    tracing::info!(
        comment_id = %comment.id,
        user_id = %user_id,
        tmdb_id,
        "Comment posted"
    );

    Ok(CommentView::from(&comment))
}

/// Deletes a comment. Only its author may do so.
pub async fn delete(
    comments: &dyn CommentRepository,
    user_id: ObjectId,
    comment_id: &str,
) -> AppResult<()> {
    let id = parse_comment_id(comment_id)?;
    let comment = comments
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))?;

    if comment.user_id != user_id {
        return Err(AppError::Forbidden(
            "Only the author can delete this comment".to_string(),
        ));
    }

    if !comments.delete(id).await? {
        return Err(AppError::NotFound(format!("Comment {} not found", comment_id)));
    }

    tracing::info!(comment_id = %id, user_id = %user_id, "Comment deleted");
    Ok(())
}
