use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::AccountView,
    services::accounts::{self, AuthResponse, LoginRequest, RegisterRequest},
    state::AppState,
};

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response =
        accounts::register(state.users.as_ref(), &state.hasher, &state.tokens, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<AuthResponse>> {
    let response =
        accounts::login(state.users.as_ref(), &state.hasher, &state.tokens, request).await?;
    Ok(Json(response))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<AccountView>> {
    Ok(Json(accounts::account(state.users.as_ref(), user.id).await?))
}
