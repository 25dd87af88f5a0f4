use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    /// YAML file with tenant definitions; built-in tenants are used when unset
    pub tenants_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub key: String,
    /// When set, bearer tokens are verified locally instead of round-tripping to auth
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_tenant: String,
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub token_expiry_threshold_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set
    pub level: String,
}

/// One week.
pub const MAX_TOKEN_THRESHOLD_MINUTES: i64 = 7 * 24 * 60;
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source: a preset picked by `APP_ENV` (or `ENV`),
    /// then per-variable overrides. Unparseable numbers keep the preset value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").or_else(|| lookup("ENV")).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(raw: Option<String>, current: T) -> T {
            raw.and_then(|v| v.parse().ok()).unwrap_or(current)
        }

        // Server overrides
        if let Some(v) = lookup("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(port) = lookup("SERVER_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Supabase overrides
        if let Some(v) = lookup("SUPABASE_URL") {
            self.supabase.url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("SUPABASE_KEY") {
            self.supabase.key = v;
        }
        if let Some(v) = lookup("SUPABASE_JWT_SECRET") {
            self.supabase.jwt_secret = Some(v).filter(|s| !s.is_empty());
        }
        self.supabase.timeout_secs = parsed(lookup("SUPABASE_TIMEOUT_SECS"), self.supabase.timeout_secs);
        self.supabase.max_retries = parsed(lookup("SUPABASE_MAX_RETRIES"), self.supabase.max_retries);
        self.supabase.retry_backoff_ms = parsed(lookup("SUPABASE_RETRY_BACKOFF_MS"), self.supabase.retry_backoff_ms);

        // API overrides
        if let Some(v) = lookup("API_DEFAULT_TENANT") {
            self.api.default_tenant = v;
        }
        self.api.enable_rate_limiting = parsed(lookup("API_ENABLE_RATE_LIMITING"), self.api.enable_rate_limiting);
        self.api.rate_limit_requests = parsed(lookup("API_RATE_LIMIT_REQUESTS"), self.api.rate_limit_requests);
        self.api.rate_limit_window_secs = parsed(lookup("API_RATE_LIMIT_WINDOW_SECS"), self.api.rate_limit_window_secs);
        self.api.max_request_size_bytes = parsed(lookup("API_MAX_REQUEST_SIZE_BYTES"), self.api.max_request_size_bytes);

        // Security overrides
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = parse_origins(&v);
        }
        if let Some(v) = lookup("SECRET_KEY") {
            self.security.secret_key = v;
        }
        self.security.token_expiry_threshold_minutes = parsed(
            lookup("SECURITY_TOKEN_EXPIRY_THRESHOLD_MINUTES"),
            self.security.token_expiry_threshold_minutes,
        );

        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("TENANTS_FILE") {
            self.tenants_file = Some(PathBuf::from(v)).filter(|p| !p.as_os_str().is_empty());
        }

        self
    }

    /// Check the settings the gateway cannot run without. All problems are reported at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        match url::Url::parse(&self.supabase.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => problems.push("SUPABASE_URL must use http or https".to_string()),
            Err(_) => problems.push("SUPABASE_URL must be a valid URL".to_string()),
        }

        if self.supabase.key.len() < 20 {
            problems.push("SUPABASE_KEY is too short".to_string());
        }

        if self.environment != Environment::Development && self.security.secret_key.len() < 32 {
            problems.push("SECRET_KEY must be at least 32 characters".to_string());
        }

        if self.api.default_tenant.is_empty() {
            problems.push("API_DEFAULT_TENANT must not be empty".to_string());
        }

        if self.api.enable_rate_limiting
            && (self.api.rate_limit_requests == 0 || self.api.rate_limit_window_secs == 0)
        {
            problems.push("rate limit requests and window must be greater than zero".to_string());
        }

        if !(0..=MAX_TOKEN_THRESHOLD_MINUTES).contains(&self.security.token_expiry_threshold_minutes) {
            problems.push(format!(
                "SECURITY_TOKEN_EXPIRY_THRESHOLD_MINUTES must be between 0 and {}",
                MAX_TOKEN_THRESHOLD_MINUTES
            ));
        }

        if self.supabase.max_retries > MAX_RETRIES {
            problems.push(format!("SUPABASE_MAX_RETRIES must be at most {}", MAX_RETRIES));
        }

        // Credentials are allowed on CORS responses, so a wildcard would trust every site.
        if self.security.cors_origins.iter().any(|o| o == "*") {
            problems.push("SECURITY_CORS_ORIGINS must list origins explicitly, '*' is not allowed".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            supabase: SupabaseConfig {
                url: String::new(),
                key: String::new(),
                jwt_secret: None,
                timeout_secs: 30,
                max_retries: 2,
                retry_backoff_ms: 200,
            },
            api: ApiConfig {
                default_tenant: "default".to_string(),
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                secret_key: String::new(),
                token_expiry_threshold_minutes: 5,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
            tenants_file: None,
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            supabase: SupabaseConfig {
                url: String::new(),
                key: String::new(),
                jwt_secret: None,
                timeout_secs: 10,
                max_retries: 2,
                retry_backoff_ms: 200,
            },
            api: ApiConfig {
                default_tenant: "default".to_string(),
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 1,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.yourdomain.com".to_string()],
                secret_key: String::new(),
                token_expiry_threshold_minutes: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            tenants_file: None,
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            supabase: SupabaseConfig {
                url: String::new(),
                key: String::new(),
                jwt_secret: None,
                timeout_secs: 5,
                max_retries: 2,
                retry_backoff_ms: 500,
            },
            api: ApiConfig {
                default_tenant: "default".to_string(),
                enable_rate_limiting: true,
                rate_limit_requests: 10,
                rate_limit_window_secs: 1,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
                secret_key: String::new(),
                token_expiry_threshold_minutes: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            tenants_file: None,
        }
    }

    /// Development defaults pointed at the given upstream; used by tests and local tooling.
    pub fn for_upstream(url: impl Into<String>, key: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.supabase.url = url.into();
        config.supabase.key = key.into();
        config
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> AppConfig {
        let mut config = AppConfig::for_upstream("https://abc.supabase.co", "k".repeat(40));
        config.security.secret_key = "s".repeat(32);
        config
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.api.enable_rate_limiting);
        assert_eq!(config.api.default_tenant, "default");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.api.enable_rate_limiting);
        assert_eq!(config.api.rate_limit_requests, 10);
        assert!(config.security.cors_origins.is_empty());
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut config = valid();
        config.environment = Environment::Production;
        config.supabase.url = "ftp://abc.supabase.co".to_string();
        config.supabase.key = "short".to_string();
        config.security.secret_key = "short".to_string();

        let ConfigError::Invalid(problems) = config.validate().unwrap_err();
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("http or https")));
        assert!(problems.iter().any(|p| p.contains("SUPABASE_KEY")));
        assert!(problems.iter().any(|p| p.contains("SECRET_KEY")));
    }

    #[test]
    fn short_secret_is_tolerated_in_development() {
        let mut config = valid();
        config.security.secret_key = String::new();
        assert!(config.validate().is_ok());
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_selects_the_preset() {
        assert_eq!(AppConfig::from_lookup(lookup_from(&[])).environment, Environment::Development);
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[("APP_ENV", "prod")])).environment,
            Environment::Production
        );
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[("ENV", "staging")])).environment,
            Environment::Staging
        );
        // APP_ENV wins over ENV
        let config = AppConfig::from_lookup(lookup_from(&[("APP_ENV", "development"), ("ENV", "production")]));
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn port_falls_back_to_port_variable() {
        let config = AppConfig::from_lookup(lookup_from(&[("PORT", "9100")]));
        assert_eq!(config.server.port, 9100);

        let config = AppConfig::from_lookup(lookup_from(&[("PORT", "9100"), ("SERVER_PORT", "9200")]));
        assert_eq!(config.server.port, 9200);

        let config = AppConfig::from_lookup(lookup_from(&[("SERVER_PORT", "not-a-port")]));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn supabase_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://abc.supabase.co//"),
            ("SUPABASE_KEY", "anon"),
            ("SUPABASE_JWT_SECRET", ""),
            ("SUPABASE_MAX_RETRIES", "4"),
            ("SUPABASE_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.supabase.url, "https://abc.supabase.co");
        assert_eq!(config.supabase.key, "anon");
        assert_eq!(config.supabase.jwt_secret, None);
        assert_eq!(config.supabase.max_retries, 4);
        assert_eq!(config.supabase.timeout_secs, 30);

        let config = AppConfig::from_lookup(lookup_from(&[("SUPABASE_JWT_SECRET", "jwt")]));
        assert_eq!(config.supabase.jwt_secret.as_deref(), Some("jwt"));
    }

    #[test]
    fn api_security_and_file_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("API_DEFAULT_TENANT", "app1"),
            ("API_ENABLE_RATE_LIMITING", "true"),
            ("API_RATE_LIMIT_REQUESTS", "5"),
            ("SECURITY_CORS_ORIGINS", "https://a.com, https://b.com"),
            ("SECURITY_TOKEN_EXPIRY_THRESHOLD_MINUTES", "15"),
            ("LOG_LEVEL", "warn"),
            ("TENANTS_FILE", "/etc/gateway/tenants.yaml"),
        ]));
        assert_eq!(config.api.default_tenant, "app1");
        assert!(config.api.enable_rate_limiting);
        assert_eq!(config.api.rate_limit_requests, 5);
        assert_eq!(config.security.cors_origins, vec!["https://a.com", "https://b.com"]);
        assert_eq!(config.security.token_expiry_threshold_minutes, 15);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.tenants_file, Some(PathBuf::from("/etc/gateway/tenants.yaml")));

        let config = AppConfig::from_lookup(lookup_from(&[("TENANTS_FILE", "")]));
        assert_eq!(config.tenants_file, None);
    }

    #[test]
    fn out_of_range_threshold_and_retries_are_rejected() {
        let mut config = valid();
        config.security.token_expiry_threshold_minutes = i64::MAX;
        config.supabase.max_retries = u32::MAX;

        let ConfigError::Invalid(problems) = config.validate().unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.contains("THRESHOLD")));
        assert!(problems.iter().any(|p| p.contains("MAX_RETRIES")));
    }

    #[test]
    fn wildcard_cors_origin_is_rejected() {
        let mut config = valid();
        config.security.cors_origins = vec!["https://a.com".to_string(), "*".to_string()];

        let ConfigError::Invalid(problems) = config.validate().unwrap_err();
        assert!(problems[0].contains("'*'"));
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins("https://a.com, https://b.com ,,"),
            vec!["https://a.com".to_string(), "https://b.com".to_string()]
        );
    }
}
