use std::{sync::Arc, time::Duration};

use crate::{
    auth::{PasswordHasher, TokenService},
    db::{CommentRepository, UserRepository},
    services::providers::MovieProvider,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub movies: Arc<dyn MovieProvider>,
    pub tokens: TokenService,
    pub hasher: PasswordHasher,
    pub feed_poll_interval: Duration,
}
