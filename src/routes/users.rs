use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    services::profile::{self, Profile, ProfileQuery},
    state::AppState,
};

pub async fn profile(
    State(state): State<AppState>,
    WithRejection(Path(username), _): WithRejection<Path<String>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<ProfileQuery>, AppError>,
) -> AppResult<Json<Profile>> {
    let view =
        profile::profile(state.users.as_ref(), state.movies.as_ref(), &username, query).await?;
    Ok(Json(view))
}
