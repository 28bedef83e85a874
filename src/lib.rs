use std::sync::Arc;

use tokio::{net::TcpListener, signal};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use auth::{PasswordHasher, TokenService};
use config::Config;
use db::{Cache, MongoCommentStore, MongoUserStore};
use routes::{cors_layer, create_router};
use services::providers::TmdbProvider;
use state::AppState;

/// Connects the stores, builds the router and serves until shutdown
pub async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!("Connecting to MongoDB...");
    let database = db::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    let users = MongoUserStore::new(&database).await?;
    let comments = MongoCommentStore::new(&database).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client).await;

    let movies = TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_image_url.clone(),
    );

    let state = AppState {
        users: Arc::new(users),
        comments: Arc::new(comments),
        movies: Arc::new(movies),
        tokens: TokenService::new(&config.jwt_secret, config.jwt_expiry_hours)?,
        hasher: PasswordHasher::new(config.bcrypt_cost),
        feed_poll_interval: config.feed_poll_interval(),
    };

    let app = create_router(state).layer(cors_layer(config.cors_origin.as_deref()));

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
