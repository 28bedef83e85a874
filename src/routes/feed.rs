use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use axum_extra::extract::WithRejection;
use futures::{Stream, StreamExt};

use crate::{
    error::{AppError, AppResult},
    models::FeedCursor,
    services::feed::{self, FeedPage, FeedQuery},
    state::AppState,
};

pub async fn page(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<FeedQuery>, AppError>,
) -> AppResult<Json<FeedPage>> {
    let page = feed::page(state.comments.as_ref(), state.movies.as_ref(), &query).await?;
    Ok(Json(page))
}

/// Server-sent `comment` events for every comment posted after the client connects
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("Feed stream opened");

    let items = feed::live(
        state.comments.clone(),
        state.movies.clone(),
        state.feed_poll_interval,
        FeedCursor::starting_now(),
    );

    let events = items.filter_map(|item| async move {
        match Event::default()
            .event("comment")
            .id(item.comment.id.clone())
            .json_data(&item)
        {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(comment_id = %item.comment.id, error = %e, "Dropping feed event");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
