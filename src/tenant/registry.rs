use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use super::config::{TenantConfig, TenantError, TenantLimits, TenantsFile};
use super::context::CurrentTenant;
use super::feature::FeatureFlag;
use crate::error::ApiError;

/// Tenant id → configuration. Built at startup and shared read-only behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, Arc<TenantConfig>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two stock applications shipped with the gateway.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            TenantConfig::new("app1")
                .with_features([FeatureFlag::Auth, FeatureFlag::Payments])
                .with_cors_origins(["https://app1.yourdomain.com"])
                .with_theme([("primary", "#007bff"), ("secondary", "#6c757d")])
                .with_limits(TenantLimits {
                    max_users: Some(1000),
                    storage_limit_bytes: Some(5_000_000),
                }),
        );
        registry.register(
            TenantConfig::new("app2")
                .with_features([
                    FeatureFlag::Auth,
                    FeatureFlag::Scheduling,
                    FeatureFlag::Videoconference,
                ])
                .with_cors_origins(["https://app2.yourdomain.com"])
                .with_theme([("primary", "#28a745"), ("secondary", "#ffc107")])
                .with_limits(TenantLimits {
                    max_users: Some(500),
                    storage_limit_bytes: Some(1_000_000),
                }),
        );

        registry
    }

    pub fn from_settings(file: TenantsFile) -> Result<Self, TenantError> {
        let mut registry = Self::new();
        for settings in file.tenants {
            registry.register(TenantConfig::from_settings(settings)?);
        }
        Ok(registry)
    }

    /// Insert a tenant. A second registration under the same id replaces the first;
    /// feature sets are never merged.
    pub fn register(&mut self, config: TenantConfig) -> Option<Arc<TenantConfig>> {
        let id = config.id.clone();
        let previous = self.tenants.insert(id.clone(), Arc::new(config));
        if previous.is_some() {
            tracing::warn!("Tenant '{}' registered twice; keeping the latest configuration", id);
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<Arc<TenantConfig>> {
        self.tenants.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tenants.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tenants.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TenantConfig>> {
        let mut configs: Vec<&Arc<TenantConfig>> = self.tenants.values().collect();
        configs.sort_by(|a, b| a.id.cmp(&b.id));
        configs.into_iter()
    }

    /// Request-scoped current tenant for `id`. Unknown ids are rejected.
    pub fn current(&self, id: &str) -> Result<CurrentTenant, ApiError> {
        self.get(id)
            .map(CurrentTenant::new)
            .ok_or_else(|| ApiError::tenant_not_found(id))
    }

    /// False when no tenant was resolved for the request.
    pub fn has_feature(current: Option<&CurrentTenant>, feature: FeatureFlag) -> bool {
        current.map(|tenant| tenant.has_feature(feature)).unwrap_or(false)
    }

    /// Short digest of the full registration set, stable across process restarts.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for config in self.iter() {
            match serde_json::to_vec(config.as_ref()) {
                Ok(bytes) => hasher.update(&bytes),
                Err(_) => hasher.update(config.id.as_bytes()),
            }
        }
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }
}
