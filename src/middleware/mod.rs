pub mod auth;
pub mod rate_limit;
pub mod response;
pub mod tenant;

pub use auth::{require_user, AuthUser};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use response::{ApiResponse, ApiResult};
pub use tenant::{require_feature, require_path_tenant, require_tenant, tenant_context_middleware};
