use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::AppState;
use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{NewUser, ProfileUpdate, UserResponse},
    services::users,
};

pub async fn create(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(payload): Json<NewUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = users::register(state.users.as_ref(), payload).await?;
    tracing::info!(request_id = %request_id, user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let user = users::profile(state.users.as_ref(), user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<UserResponse>> {
    let user = users::update_profile(state.users.as_ref(), user_id, update).await?;
    Ok(Json(UserResponse::from(&user)))
}
