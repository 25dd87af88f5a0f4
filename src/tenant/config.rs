use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::feature::FeatureFlag;

/// Path segments that already name routes at the root of the router.
/// A tenant with one of these ids would shadow them.
pub const RESERVED_TENANT_IDS: &[&str] = &["api", "health", "products", "checkout", "courses", "schedule"];

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Invalid tenant id '{id}': {reason}")]
    InvalidId { id: String, reason: String },
    #[error("Tenant id '{0}' collides with a reserved route segment")]
    Reserved(String),
    #[error("Failed to read tenants file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse tenants file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Per-tenant limits. `storage_limit_bytes` caps a single upload; `max_users` is informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantLimits {
    #[serde(default)]
    pub max_users: Option<u32>,
    #[serde(default)]
    pub storage_limit_bytes: Option<u64>,
}

/// Immutable configuration for one tenant, built once at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantConfig {
    pub id: String,
    pub display_name: String,
    pub enabled_features: BTreeSet<FeatureFlag>,
    /// Postgres schema that table calls for this tenant run against
    pub storage_schema_name: String,
    pub api_path_prefix: String,
    pub allowed_cors_origins: Vec<String>,
    pub theme: BTreeMap<String, String>,
    pub limits: TenantLimits,
}

impl TenantConfig {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: format!("Application {}", id),
            storage_schema_name: id.clone(),
            api_path_prefix: "/api/v1".to_string(),
            enabled_features: BTreeSet::new(),
            allowed_cors_origins: Vec::new(),
            theme: BTreeMap::new(),
            limits: TenantLimits::default(),
            id,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_features(mut self, features: impl IntoIterator<Item = FeatureFlag>) -> Self {
        self.enabled_features = features.into_iter().collect();
        self
    }

    pub fn with_storage_schema(mut self, schema: impl Into<String>) -> Self {
        self.storage_schema_name = schema.into();
        self
    }

    pub fn with_cors_origins(mut self, origins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_cors_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_theme(mut self, theme: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        self.theme = theme
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn with_limits(mut self, limits: TenantLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn has_feature(&self, feature: FeatureFlag) -> bool {
        self.enabled_features.contains(&feature)
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_cors_origins.iter().any(|o| o == origin)
    }

    /// Build from a settings entry, keeping only flags switched on.
    pub fn from_settings(settings: TenantSettings) -> Result<Self, TenantError> {
        validate_tenant_id(&settings.id)?;

        let mut config = TenantConfig::new(settings.id);
        if let Some(name) = settings.display_name {
            config.display_name = name;
        }
        if let Some(schema) = settings.storage_schema {
            config.storage_schema_name = schema;
        }
        if let Some(prefix) = settings.api_prefix {
            config.api_path_prefix = prefix;
        }
        config.enabled_features = settings
            .features
            .into_iter()
            .filter_map(|(flag, enabled)| enabled.then_some(flag))
            .collect();
        config.allowed_cors_origins = settings.cors_origins;
        config.theme = settings.theme;
        config.limits = settings.limits;

        Ok(config)
    }
}

/// Tenant id rules: URL-safe, lowercase-insensitive path segment, not a reserved route.
pub fn validate_tenant_id(id: &str) -> Result<(), TenantError> {
    let invalid = |reason: &str| TenantError::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.len() < 2 {
        return Err(invalid("must be at least 2 characters"));
    }
    if id.len() > 63 {
        return Err(invalid("must be at most 63 characters"));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(invalid("may only contain letters, numbers, hyphens and underscores"));
    }
    if RESERVED_TENANT_IDS.contains(&id) {
        return Err(TenantError::Reserved(id.to_string()));
    }

    Ok(())
}

/// One entry of the tenants YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSettings {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub features: BTreeMap<FeatureFlag, bool>,
    #[serde(default)]
    pub storage_schema: Option<String>,
    #[serde(default)]
    pub api_prefix: Option<String>,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub theme: BTreeMap<String, String>,
    #[serde(default)]
    pub limits: TenantLimits,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantsFile {
    #[serde(default)]
    pub tenants: Vec<TenantSettings>,
}

impl TenantsFile {
    pub fn from_yaml(source: &str) -> Result<Self, TenantError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, TenantError> {
        let source = std::fs::read_to_string(path).map_err(|source| TenantError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
tenants:
  - id: app1
    display_name: Storefront
    features: { auth: true, payments: true, marketplace: false }
    cors_origins: [https://app1.yourdomain.com]
    theme: { primary: "#007bff" }
    limits: { max_users: 1000 }
  - id: app2
    features:
      scheduling: true
"##;

    #[test]
    fn only_enabled_flags_are_kept() {
        let file = TenantsFile::from_yaml(SAMPLE).unwrap();
        let app1 = TenantConfig::from_settings(file.tenants[0].clone()).unwrap();

        assert_eq!(app1.display_name, "Storefront");
        assert!(app1.has_feature(FeatureFlag::Payments));
        assert!(!app1.has_feature(FeatureFlag::Marketplace));
        assert_eq!(app1.limits.max_users, Some(1000));
        assert_eq!(app1.theme.get("primary").map(String::as_str), Some("#007bff"));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let file = TenantsFile::from_yaml(SAMPLE).unwrap();
        let app2 = TenantConfig::from_settings(file.tenants[1].clone()).unwrap();

        assert_eq!(app2.display_name, "Application app2");
        assert_eq!(app2.storage_schema_name, "app2");
        assert_eq!(app2.api_path_prefix, "/api/v1");
        assert!(app2.allowed_cors_origins.is_empty());
    }

    #[test]
    fn unknown_feature_fails_to_parse() {
        let yaml = "tenants:\n  - id: app3\n    features: { chat: true }\n";
        assert!(TenantsFile::from_yaml(yaml).is_err());
    }

    #[test]
    fn reserved_and_malformed_ids_are_rejected() {
        assert!(matches!(validate_tenant_id("api"), Err(TenantError::Reserved(_))));
        assert!(matches!(validate_tenant_id("a"), Err(TenantError::InvalidId { .. })));
        assert!(matches!(validate_tenant_id("app/1"), Err(TenantError::InvalidId { .. })));
        assert!(validate_tenant_id("app_1-eu").is_ok());
    }
}
