use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware, require_auth},
    state::AppState,
};

pub mod auth;
pub mod comments;
pub mod feed;
pub mod library;
pub mod movies;
pub mod users;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// API routes under /api
fn api_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/movies/lists/:category", get(movies::list))
        .route("/movies/search", get(movies::search))
        .route("/movies/genres", get(movies::genres))
        .route("/movies/discover", get(movies::discover))
        .route("/movies/:id", get(movies::details))
        .route("/movies/:id/similar", get(movies::similar))
        .route("/movies/:id/comments", get(comments::list))
        .route("/users/:username/profile", get(users::profile))
        .route("/feed", get(feed::page))
        .route("/feed/stream", get(feed::stream));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/movies/:id/comments", post(comments::create))
        .route("/comments/:id", delete(comments::delete))
        .route("/me/movies/:id", get(library::movie_state))
        .route("/me/ratings", get(library::ratings))
        .route(
            "/me/ratings/:id",
            put(library::rate).delete(library::unrate),
        )
        .route("/me/:list", get(library::entries))
        .route("/me/:list/:id", put(library::add).delete(library::remove))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}

/// CORS for the browser client. Without a configured origin any origin is allowed.
pub fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(tower_http::cors::Any),
    }
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
