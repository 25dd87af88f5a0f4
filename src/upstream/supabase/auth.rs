use async_trait::async_trait;
use serde_json::{json, Value};

use super::SupabaseClient;
use crate::upstream::{AuthProvider, Capability, Credentials, UpstreamError};

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Value, UpstreamError> {
        let body = json!({ "email": credentials.email, "password": credentials.password });
        let response = self
            .execute(Capability::Auth, "sign_up", false, || {
                self.authorize(self.http.post(self.endpoint("/auth/v1/signup")), None)
                    .json(&body)
            })
            .await?;
        Self::read_json(Capability::Auth, response).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Value, UpstreamError> {
        let body = json!({ "email": credentials.email, "password": credentials.password });
        let response = self
            .execute(Capability::Auth, "sign_in", false, || {
                self.authorize(self.http.post(self.endpoint("/auth/v1/token")), None)
                    .query(&[("grant_type", "password")])
                    .json(&body)
            })
            .await?;
        Self::read_json(Capability::Auth, response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, UpstreamError> {
        let body = json!({ "refresh_token": refresh_token });
        let response = self
            .execute(Capability::Auth, "refresh_session", false, || {
                self.authorize(self.http.post(self.endpoint("/auth/v1/token")), None)
                    .query(&[("grant_type", "refresh_token")])
                    .json(&body)
            })
            .await?;

        let session = Self::read_json(Capability::Auth, response).await?;
        if session.get("access_token").is_none() {
            return Err(UpstreamError::Decode {
                capability: Capability::Auth,
                message: "Session refresh failed - no session returned".to_string(),
            });
        }
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), UpstreamError> {
        self.execute(Capability::Auth, "sign_out", false, || {
            self.authorize(self.http.post(self.endpoint("/auth/v1/logout")), Some(access_token))
        })
        .await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Value, UpstreamError> {
        let response = self
            .execute(Capability::Auth, "get_user", true, || {
                self.authorize(self.http.get(self.endpoint("/auth/v1/user")), Some(access_token))
            })
            .await?;
        Self::read_json(Capability::Auth, response).await
    }
}
