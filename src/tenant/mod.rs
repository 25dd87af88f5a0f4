pub mod config;
pub mod context;
pub mod feature;
pub mod registry;
pub mod resolver;

pub use config::{TenantConfig, TenantError, TenantLimits, TenantSettings, TenantsFile};
pub use context::CurrentTenant;
pub use feature::FeatureFlag;
pub use registry::TenantRegistry;
pub use resolver::{resolve, Resolution, ResolutionSource};
