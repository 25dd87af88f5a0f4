use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::ops::Deref;
use std::sync::Arc;

use super::config::TenantConfig;
use super::feature::FeatureFlag;
use super::resolver::Resolution;
use crate::error::ApiError;

/// The tenant resolved for the request currently being handled.
///
/// Lives in the request's extensions, so every in-flight request carries its own.
/// Extracting it in a handler rejects with `TenantNotFound` when resolution failed.
#[derive(Debug, Clone)]
pub struct CurrentTenant(Arc<TenantConfig>);

impl CurrentTenant {
    pub fn new(config: Arc<TenantConfig>) -> Self {
        Self(config)
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn config(&self) -> &Arc<TenantConfig> {
        &self.0
    }

    pub fn has_feature(&self, feature: FeatureFlag) -> bool {
        self.0.has_feature(feature)
    }
}

impl Deref for CurrentTenant {
    type Target = TenantConfig;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(tenant) = parts.extensions.get::<CurrentTenant>() {
            return Ok(tenant.clone());
        }

        let requested = parts
            .extensions
            .get::<Resolution>()
            .map(|resolution| resolution.tenant_id.clone())
            .unwrap_or_default();
        Err(ApiError::tenant_not_found(requested))
    }
}
