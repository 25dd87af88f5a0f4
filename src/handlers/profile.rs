use axum::extract::{Extension, Path, State};
use serde::Deserialize;
use serde_json::Value;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::tenant::CurrentTenant;
use crate::upstream::TableScope;
use crate::AppState;

/// Named so the `:tenant` capture of the prefixed mount is ignored
#[derive(Debug, Deserialize)]
pub struct ProfilePath {
    pub id: String,
}

/// GET /api/v1/profile - the caller's own profile
pub async fn own(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let scope = TableScope::new(&tenant.storage_schema_name, Some(user.access_token.clone()));
    let profile = state.profiles.get_profile(&scope, &user.id).await?;
    Ok(ApiResponse::success(profile))
}

/// GET /api/v1/profiles/:id
pub async fn by_id(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
    Path(ProfilePath { id }): Path<ProfilePath>,
) -> ApiResult<Value> {
    let scope = TableScope::new(&tenant.storage_schema_name, Some(user.access_token));
    let profile = state.profiles.get_profile(&scope, &id).await?;
    Ok(ApiResponse::success(profile))
}
