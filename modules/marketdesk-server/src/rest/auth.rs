//! Signup, login, email verification and password lifecycle.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use marketdesk_store::NewUser;

use crate::auth::{hash_password, validate_password_strength, verify_password, AuthUser};
use crate::envelope::{self, ApiError};
use crate::jwt::TokenPurpose;
use crate::rest::UserProfile;
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<Response, ApiError> {
    validate_password_strength(&payload.password)?;

    if state.users.get_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let user = state
        .users
        .insert(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash: hash_password(&payload.password)?,
        })
        .await?;

    let token = state
        .jwt
        .create_purpose_token(user.id, TokenPurpose::Verification)?;
    let link = format!("{}/verify-user?token={token}", state.config.frontend_url);
    state
        .mailer
        .send_verification_email(&user.username, &user.email, &link)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(envelope::created(
        "User registered successfully. A verification email has been sent.",
        UserProfile::from(user),
    ))
}

#[derive(Deserialize)]
pub struct TokenPayload {
    pub token: String,
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenPayload>,
) -> Result<Response, ApiError> {
    let user_id = state
        .jwt
        .verify_purpose_token(&payload.token, TokenPurpose::Verification)
        .map_err(|_| ApiError::Auth("Invalid verification token".into()))?;

    let user = state
        .users
        .get(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    if user.is_verified {
        return Err(ApiError::Validation("Email already verified".into()));
    }

    state.users.set_verified(user.id).await?;

    Ok(envelope::success(
        "Email verified successfully.",
        UserProfile {
            is_verified: true,
            ..UserProfile::from(user)
        },
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .users
        .get_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::Auth(INVALID_CREDENTIALS.into()))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
    }

    if !user.is_verified {
        return Err(ApiError::Auth(
            "Email not verified. Please verify your email first.".into(),
        ));
    }

    let access_token = state.jwt.create_access_token(user.id, &user.email)?;

    Ok(envelope::success(
        "User authenticated successfully",
        json!({
            "access_token": access_token,
            "token_type": "bearer",
        }),
    ))
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Response, ApiError> {
    // Always report success so the endpoint can't be used to enumerate users
    if let Some(user) = state.users.get_by_email(&payload.email).await? {
        let token = state.jwt.create_purpose_token(user.id, TokenPurpose::Reset)?;
        let link = format!("{}/reset-password?token={token}", state.config.frontend_url);
        state
            .mailer
            .send_password_reset_email(&user.username, &user.email, &link)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
    }

    Ok(envelope::message_only(
        "Password reset email sent successfully.",
    ))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let user_id = state
        .jwt
        .verify_purpose_token(&payload.token, TokenPurpose::Reset)
        .map_err(|_| ApiError::Auth("Invalid or expired reset token".into()))?;

    let user = state
        .users
        .get(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    validate_password_strength(&payload.new_password)?;
    state
        .users
        .set_password(user.id, &hash_password(&payload.new_password)?)
        .await?;

    Ok(envelope::message_only(
        "Password reset completed successfully.",
    ))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    let account = state
        .users
        .get(user.user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    if !verify_password(&payload.old_password, &account.password_hash) {
        return Err(ApiError::Validation("Current password is incorrect".into()));
    }

    validate_password_strength(&payload.new_password)?;
    state
        .users
        .set_password(account.id, &hash_password(&payload.new_password)?)
        .await?;

    Ok(envelope::message_only("Password changed successfully."))
}
