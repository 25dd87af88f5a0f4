pub mod secret;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::MAX_TOKEN_THRESHOLD_MINUTES;

/// Claims carried by upstream-issued access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("Token expiry is out of range")]
    BadExpiry,
}

/// Audience GoTrue stamps on user sessions
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Verify signature, expiry and audience against the project's JWT secret.
pub fn verify_token(token: &str, secret: &str) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Read claims without checking the signature. Only for inspecting expiry.
pub fn decode_unverified(token: &str) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
    pub expiring_soon: bool,
}

/// Expiry report for `token` relative to `now`. The threshold is clamped to
/// `0..=MAX_TOKEN_THRESHOLD_MINUTES`.
pub fn token_status(token: &str, threshold_minutes: i64, now: DateTime<Utc>) -> Result<TokenStatus, TokenError> {
    let threshold = Duration::minutes(threshold_minutes.clamp(0, MAX_TOKEN_THRESHOLD_MINUTES));
    let claims = decode_unverified(token)?;
    let expires_at = claims.expires_at().ok_or(TokenError::BadExpiry)?;

    Ok(TokenStatus {
        subject: claims.sub,
        expires_at,
        expired: expires_at <= now,
        expiring_soon: expires_at - now < threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

    fn token(exp: i64, aud: &str) -> String {
        let claims = json!({
            "sub": "user-1",
            "email": "ada@example.com",
            "role": "authenticated",
            "aud": aud,
            "exp": exp,
            "iat": exp - 3600,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[test]
    fn verifies_well_formed_tokens() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let claims = verify_token(&token(exp, AUTHENTICATED_AUDIENCE), SECRET).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn rejects_wrong_secret_audience_and_expiry() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        assert!(verify_token(&token(exp, AUTHENTICATED_AUDIENCE), "another-secret").is_err());
        assert!(verify_token(&token(exp, "anon"), SECRET).is_err());

        let expired = (Utc::now() - Duration::hours(1)).timestamp();
        assert!(verify_token(&token(expired, AUTHENTICATED_AUDIENCE), SECRET).is_err());
    }

    #[test]
    fn status_reports_expiry_without_verifying() {
        let now = Utc::now();
        let soon = token((now + Duration::minutes(2)).timestamp(), "anon");
        let status = token_status(&soon, 5, now).unwrap();
        assert!(status.expiring_soon);
        assert!(!status.expired);

        let later = token((now + Duration::hours(2)).timestamp(), "anon");
        let status = token_status(&later, 5, now).unwrap();
        assert!(!status.expiring_soon);
        assert_eq!(status.subject, "user-1");
    }

    #[test]
    fn oversized_threshold_is_clamped() {
        let now = Utc::now();
        let far = token((now + Duration::days(30)).timestamp(), AUTHENTICATED_AUDIENCE);

        let status = token_status(&far, i64::MAX, now).unwrap();
        assert!(!status.expiring_soon, "threshold is capped at one week");
        let status = token_status(&far, -10, now).unwrap();
        assert!(!status.expiring_soon);
    }
}
