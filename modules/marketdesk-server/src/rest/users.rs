//! Profile endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::envelope::{self, ApiError};
use crate::rest::UserProfile;
use crate::AppState;

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let account = state
        .users
        .get(user.user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(envelope::success(
        "User profile retrieved successfully",
        UserProfile::from(account),
    ))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub username: String,
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Response, ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::Validation("Username must not be empty".into()));
    }

    if state.users.get(user.user_id).await?.is_none() {
        return Err(ApiError::NotFound("User"));
    }

    let updated = state
        .users
        .set_username(user.user_id, payload.username.trim())
        .await?;

    Ok(envelope::success(
        "User profile updated successfully",
        UserProfile::from(updated),
    ))
}
