// handlers/auth.rs - /api/v1/auth/* handlers, gated on the AUTH feature
//
// Sign-up and sign-in are public. `me` and `signout` run behind `require_user`,
// which has already verified the bearer token and inserted `AuthUser`.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::TokenVerification;
use crate::tenant::CurrentTenant;
use crate::upstream::Credentials;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// POST /api/v1/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(credentials) = payload?;
    let user = state.auth_service.sign_up(&credentials).await?;
    tracing::info!("User signed up for tenant '{}'", tenant.id());
    Ok(ApiResponse::created(user).with_message("Signup successful"))
}

/// POST /api/v1/auth/signin
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(credentials) = payload?;
    let session = state.auth_service.sign_in(&credentials).await?;
    Ok(ApiResponse::success(session))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let session = state.auth_service.refresh(&request.refresh_token).await?;
    Ok(ApiResponse::success(session))
}

/// POST /api/v1/auth/signout
pub async fn signout(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    state.auth_service.sign_out(&user.access_token).await?;
    Ok(ApiResponse::success(json!({ "signed_out": true })).with_message("Signed out"))
}

/// GET /api/v1/auth/me
pub async fn me(Extension(user): Extension<AuthUser>) -> ApiResult<AuthUser> {
    Ok(ApiResponse::success(user))
}

/// POST /api/v1/auth/verify - check a token with the provider and report its expiry
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<TokenVerification> {
    let Json(request) = payload?;
    let threshold = state.config.security.token_expiry_threshold_minutes;
    let verification = state.auth_service.verify(&request.token, threshold).await?;
    Ok(ApiResponse::success(verification))
}
