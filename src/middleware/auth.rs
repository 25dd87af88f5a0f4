use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::auth::{verify_token, TokenClaims};
use crate::error::ApiError;
use crate::AppState;

/// Verified caller, injected by [`require_user`].
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    /// Raw bearer token, forwarded upstream so row-level policies apply to the caller
    #[serde(skip_serializing)]
    pub access_token: String,
}

impl AuthUser {
    fn from_claims(claims: TokenClaims, access_token: String) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            access_token,
        }
    }

    fn from_upstream_user(user: &Value, access_token: String) -> Option<Self> {
        let text = |key: &str| user.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id: text("id")?,
            email: text("email"),
            role: text("role"),
            access_token,
        })
    }
}

/// Rejects requests without a valid bearer token, otherwise inserts [`AuthUser`].
///
/// With `SUPABASE_JWT_SECRET` configured tokens are checked locally; otherwise the
/// upstream is asked who owns the token.
pub async fn require_user(State(state): State<AppState>, headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let token = match extract_bearer_token(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    match authenticate(&state, token).await {
        Ok(user) => {
            tracing::debug!("Authenticated user {}", user.id);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

async fn authenticate(state: &AppState, token: String) -> Result<AuthUser, ApiError> {
    if let Some(secret) = state.config.supabase.jwt_secret.as_deref() {
        let claims = verify_token(&token, secret).map_err(|e| ApiError::unauthorized(e.to_string()))?;
        return Ok(AuthUser::from_claims(claims, token));
    }

    let user = state.auth_service.current_user(&token).await?;
    AuthUser::from_upstream_user(&user, token).ok_or_else(|| ApiError::unauthorized("Token does not identify a user"))
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
