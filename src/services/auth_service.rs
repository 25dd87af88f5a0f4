use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::{token_status, TokenStatus};
use crate::upstream::{AuthProvider, Capability, Credentials, UpstreamError};

/// GoTrue's default minimum
pub const MIN_PASSWORD_LEN: usize = 6;

/// Result of `POST auth/verify`
#[derive(Debug, Clone, Serialize)]
pub struct TokenVerification {
    pub user: Value,
    #[serde(flatten)]
    pub status: Option<TokenStatus>,
}

/// Identity operations with local input checks in front of the upstream provider.
///
/// Malformed input is rejected as `InvalidInput` before any upstream call is made.
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self { provider }
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> Result<Value, UpstreamError> {
        validate_credentials(credentials)?;
        tracing::info!("Signing up {}", credentials.email);
        self.provider.sign_up(credentials).await
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Value, UpstreamError> {
        validate_email_format(&credentials.email).map_err(invalid)?;
        if credentials.password.is_empty() {
            return Err(invalid("Password cannot be empty"));
        }
        self.provider.sign_in(credentials).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Value, UpstreamError> {
        if refresh_token.trim().is_empty() {
            return Err(invalid("Refresh token cannot be empty"));
        }
        self.provider.refresh_session(refresh_token).await
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), UpstreamError> {
        self.provider.sign_out(access_token).await
    }

    pub async fn current_user(&self, access_token: &str) -> Result<Value, UpstreamError> {
        self.provider.get_user(access_token).await
    }

    /// Confirm the token with the provider and report its expiry.
    pub async fn verify(&self, access_token: &str, threshold_minutes: i64) -> Result<TokenVerification, UpstreamError> {
        if access_token.trim().is_empty() {
            return Err(invalid("Token cannot be empty"));
        }
        let user = self.provider.get_user(access_token).await?;
        // Opaque tokens are fine as long as the provider accepts them
        let status = token_status(access_token, threshold_minutes, chrono::Utc::now()).ok();
        Ok(TokenVerification { user, status })
    }
}

fn invalid(message: impl Into<String>) -> UpstreamError {
    UpstreamError::invalid_input(Capability::Auth, message)
}

fn validate_credentials(credentials: &Credentials) -> Result<(), UpstreamError> {
    validate_email_format(&credentials.email).map_err(invalid)?;
    if credentials.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Basic email format validation
pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format".to_string());
    };

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(validate_email_format("ada@example.com").is_ok());
        assert!(validate_email_format("a.b+tag@mail.example.co.uk").is_ok());

        for bad in ["", "not-an-email", "@example.com", "ada@", "ada@example", "ada@@example.com", "a da@example.com", "ada@example..com"] {
            assert!(validate_email_format(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn short_passwords_are_invalid_input() {
        let err = validate_credentials(&Credentials {
            email: "ada@example.com".into(),
            password: "12345".into(),
        })
        .unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidInput { capability: Capability::Auth, .. }));
    }
}
