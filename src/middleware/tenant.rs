use axum::{
    extract::{OriginalUri, Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::tenant::resolver::first_path_segment;
use crate::tenant::{resolve, CurrentTenant, FeatureFlag, Resolution, ResolutionSource};
use crate::AppState;

/// Full request path, even when running inside a nested router.
fn original_path(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Resolve the tenant for this request and attach it to the request's extensions.
///
/// Never rejects. Routes that need a tenant fail later through the
/// [`CurrentTenant`] extractor or [`require_feature`].
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = original_path(&request);
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let resolution = resolve(&path, host.as_deref(), &state.registry, &state.config.api.default_tenant);

    match state.registry.current(&resolution.tenant_id) {
        Ok(tenant) => {
            tracing::debug!(
                "Resolved tenant '{}' from {:?} for {}",
                resolution.tenant_id,
                resolution.source,
                path
            );
            request.extensions_mut().insert(tenant);
        }
        Err(_) => {
            tracing::debug!("No registered tenant for {} (tried '{}')", path, resolution.tenant_id);
        }
    }
    request.extensions_mut().insert(resolution);

    next.run(request).await
}

/// Guard for the `/{tenant}/...` mount: the first path segment must have named the tenant.
pub async fn require_path_tenant(request: Request, next: Next) -> Response {
    let by_path = matches!(
        request.extensions().get::<Resolution>(),
        Some(Resolution { source: ResolutionSource::Path, .. })
    );
    if by_path {
        return next.run(request).await;
    }

    let path = original_path(&request);
    let requested = first_path_segment(&path).unwrap_or_default().to_string();
    tracing::debug!("Path tenant '{}' is not registered", requested);
    ApiError::tenant_not_found(requested).into_response()
}

/// Routes that need a tenant but no particular feature. Runs ahead of any
/// credential check so a tenant-less request never reaches the identity provider.
pub async fn require_tenant(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentTenant>().is_some() {
        return next.run(request).await;
    }
    ApiError::tenant_not_found(requested_tenant(&request)).into_response()
}

fn requested_tenant(request: &Request) -> String {
    request
        .extensions()
        .get::<Resolution>()
        .map(|resolution| resolution.tenant_id.clone())
        .unwrap_or_default()
}

/// Feature gate. Attach with `from_fn_with_state(FeatureFlag::X, require_feature)`.
pub async fn require_feature(State(feature): State<FeatureFlag>, request: Request, next: Next) -> Response {
    let Some(tenant) = request.extensions().get::<CurrentTenant>() else {
        return ApiError::tenant_not_found(requested_tenant(&request)).into_response();
    };

    if !tenant.has_feature(feature) {
        tracing::info!("Tenant '{}' denied feature {}", tenant.id(), feature);
        return ApiError::feature_not_available(tenant.id(), feature).into_response();
    }

    next.run(request).await
}
