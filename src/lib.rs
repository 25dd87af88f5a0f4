pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod tenant;
pub mod upstream;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HOST},
        request::Parts,
        HeaderValue, Method,
    },
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::{auth as auth_handlers, data, domain, profile, storage, system};
use crate::middleware::{
    rate_limit_middleware, require_feature, require_path_tenant, require_tenant, require_user,
    tenant_context_middleware, RateLimiter,
};
use crate::services::{AuthService, ProfileService};
use crate::tenant::{resolve, FeatureFlag, TenantError, TenantRegistry, TenantsFile};
use crate::upstream::supabase::SupabaseClient;
use crate::upstream::{AuthProvider, FileStore, HealthProbe, TableStore};

/// Everything a handler can reach. Cheap to clone; nothing in here changes after startup
/// apart from the rate limiter's counters.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<TenantRegistry>,
    pub auth: Arc<dyn AuthProvider>,
    pub tables: Arc<dyn TableStore>,
    pub files: Arc<dyn FileStore>,
    pub health: Arc<dyn HealthProbe>,
    pub limiter: Arc<RateLimiter>,
    pub auth_service: AuthService,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        registry: TenantRegistry,
        auth: Arc<dyn AuthProvider>,
        tables: Arc<dyn TableStore>,
        files: Arc<dyn FileStore>,
        health: Arc<dyn HealthProbe>,
    ) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::from_config(&config.api)),
            auth_service: AuthService::new(auth.clone()),
            profiles: ProfileService::new(tables.clone()),
            config: Arc::new(config),
            registry: Arc::new(registry),
            auth,
            tables,
            files,
            health,
        }
    }

    /// All four capabilities served by one Supabase project.
    pub fn with_supabase(config: AppConfig, registry: TenantRegistry, client: SupabaseClient) -> Self {
        let client = Arc::new(client);
        Self::new(config, registry, client.clone(), client.clone(), client.clone(), client)
    }
}

/// Tenants from `TENANTS_FILE` when configured, the built-in pair otherwise.
pub fn load_registry(config: &AppConfig) -> Result<TenantRegistry, TenantError> {
    match &config.tenants_file {
        Some(path) => TenantRegistry::from_settings(TenantsFile::load(path)?),
        None => Ok(TenantRegistry::builtin()),
    }
}

/// Build the full router.
///
/// The tenant routes are mounted twice: under `/:tenant` (tenant named by the
/// first path segment) and at the root (tenant taken from the host or default).
pub fn app(state: AppState) -> Router {
    let tenant = tenant_routes(&state);

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest("/:tenant", tenant.clone().route_layer(from_fn(require_path_tenant)))
        .merge(tenant)
        .fallback(|| async { ApiError::not_found("Route not found") })
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), tenant_context_middleware))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn tenant_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/app", get(system::app_info))
        .nest("/api/v1/auth", auth_routes(state))
        .merge(profile_routes(state))
        .merge(data_routes(state))
        .merge(gated("/products", get(domain::list_products), FeatureFlag::Marketplace))
        .merge(gated("/checkout", post(domain::checkout), FeatureFlag::Payments))
        .merge(gated("/courses", get(domain::list_courses), FeatureFlag::Scheduling))
        .merge(gated("/schedule", post(domain::schedule_session), FeatureFlag::Videoconference))
}

fn gated(path: &str, route: MethodRouter<AppState>, feature: FeatureFlag) -> Router<AppState> {
    Router::new()
        .route(path, route)
        .route_layer(from_fn_with_state(feature, require_feature))
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    let session = Router::new()
        .route("/signout", post(auth_handlers::signout))
        .route("/me", get(auth_handlers::me))
        .route_layer(from_fn_with_state(state.clone(), require_user));

    Router::new()
        .route("/signup", post(auth_handlers::signup))
        .route("/signin", post(auth_handlers::signin))
        .route("/refresh", post(auth_handlers::refresh))
        .route("/verify", post(auth_handlers::verify))
        .merge(session)
        .route_layer(from_fn_with_state(FeatureFlag::Auth, require_feature))
}

fn profile_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/profile", get(profile::own))
        .route("/api/v1/profiles/:id", get(profile::by_id))
        .route_layer(from_fn_with_state(state.clone(), require_user))
        .route_layer(from_fn_with_state(FeatureFlag::Auth, require_feature))
}

fn data_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/data/:table",
            get(data::select)
                .post(data::insert)
                .patch(data::update)
                .delete(data::delete),
        )
        .route("/api/v1/storage/:bucket", get(storage::list))
        .route(
            "/api/v1/storage/:bucket/*path",
            put(storage::upload).delete(storage::remove),
        )
        .route_layer(from_fn_with_state(state.clone(), require_user))
        .route_layer(from_fn(require_tenant))
}

/// Globally configured origins, plus whatever the request's tenant allows.
fn cors_layer(state: &AppState) -> CorsLayer {
    let config = state.config.clone();
    let registry = state.registry.clone();

    let allow = AllowOrigin::predicate(move |origin: &HeaderValue, parts: &Parts| {
        let Ok(origin) = origin.to_str() else {
            return false;
        };
        if config.security.cors_origins.iter().any(|o| o == origin) {
            return true;
        }

        let host = parts.headers.get(HOST).and_then(|value| value.to_str().ok());
        let resolution = resolve(parts.uri.path(), host, &registry, &config.api.default_tenant);
        registry
            .get(&resolution.tenant_id)
            .is_some_and(|tenant| tenant.allows_origin(origin))
    });

    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
}
