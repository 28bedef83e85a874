use std::{collections::VecDeque, sync::Arc, time::Duration};

use futures::{stream, Stream};
use serde::{Deserialize, Serialize};

use crate::{
    db::CommentRepository,
    error::AppResult,
    models::{Comment, CommentView, FeedCursor, FeedItem},
    services::providers::{fetch_summaries, MovieProvider},
};

pub const DEFAULT_FEED_LIMIT: u32 = 20;
pub const MAX_FEED_LIMIT: u32 = 50;

/// Upper bound on comments pulled by a single live poll
const LIVE_BATCH: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub before: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Pass back as `before` to fetch the next page. Absent on the last page.
    pub next_before: Option<String>,
}

pub fn parse_before(before: Option<&str>) -> AppResult<Option<FeedCursor>> {
    before.map(str::parse).transpose()
}

pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT)
}

/// Attaches movie summaries to comments, keeping their order
pub async fn enrich(movies: &dyn MovieProvider, comments: Vec<Comment>) -> Vec<FeedItem> {
    let summaries = fetch_summaries(movies, comments.iter().map(|c| c.tmdb_id)).await;

    comments
        .iter()
        .map(|c| FeedItem {
            comment: CommentView::from(c),
            movie: summaries.get(&c.tmdb_id).cloned(),
        })
        .collect()
}

/// Reverse-chronological comments across all movies
pub async fn page(
    comments: &dyn CommentRepository,
    movies: &dyn MovieProvider,
    query: &FeedQuery,
) -> AppResult<FeedPage> {
    let before = parse_before(query.before.as_deref())?;
    let limit = clamp_limit(query.limit);

    let batch = comments.recent(before, limit as i64).await?;
    let next_before = if batch.len() == limit as usize {
        batch.last().map(|c| FeedCursor::after(c).to_string())
    } else {
        None
    };

    Ok(FeedPage {
        items: enrich(movies, batch).await,
        next_before,
    })
}

struct LiveFeed {
    comments: Arc<dyn CommentRepository>,
    movies: Arc<dyn MovieProvider>,
    interval: Duration,
    cursor: FeedCursor,
    pending: VecDeque<FeedItem>,
}

impl LiveFeed {
    async fn poll(&mut self) {
        let batch = match self.comments.since(self.cursor, LIVE_BATCH).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, "Feed poll failed");
                return;
            }
        };

        let Some(last) = batch.last() else {
            return;
        };
        self.cursor = FeedCursor::after(last);

        tracing::debug!(count = batch.len(), "Feed poll found new comments");
        self.pending.extend(enrich(self.movies.as_ref(), batch).await);
    }
}

/// Endless stream of comments posted after `cursor`, in chronological order
///
/// Polls every `interval`. A failed poll is logged and retried on the next
/// tick without moving the cursor.
pub fn live(
    comments: Arc<dyn CommentRepository>,
    movies: Arc<dyn MovieProvider>,
    interval: Duration,
    cursor: FeedCursor,
) -> impl Stream<Item = FeedItem> + Send + 'static {
    let feed = LiveFeed {
        comments,
        movies,
        interval,
        cursor,
        pending: VecDeque::new(),
    };

    stream::unfold(feed, |mut feed| async move {
        loop {
            if let Some(item) = feed.pending.pop_front() {
                return Some((item, feed));
            }
            tokio::time::sleep(feed.interval).await;
            feed.poll().await;
        }
    })
}
