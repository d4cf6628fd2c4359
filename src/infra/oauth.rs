use reqwest::{Client, header::ACCEPT};
use serde::Deserialize;

use crate::config::{OAuthCredentials, required};
use crate::error::{AppError, AppResult};
use crate::infra::http::error_body;

/// Exchanges fixed password-grant credentials for a bearer token. Nothing is cached; each
/// call is one POST to the token endpoint.
pub struct OAuthTokenAcquirer {
    http: Client,
    token_url: Option<String>,
    credentials: OAuthCredentials,
}

impl OAuthTokenAcquirer {
    pub fn new(http: Client, token_url: Option<String>, credentials: OAuthCredentials) -> Self {
        Self {
            http,
            token_url,
            credentials,
        }
    }

    pub async fn acquire_token(&self) -> AppResult<String> {
        let token_url = required(&self.token_url, "SERVICENOW_INSTANCE_URL")?;
        let form = [
            ("grant_type", "password"),
            (
                "client_id",
                required(&self.credentials.client_id, "SERVICENOW_CLIENT_ID")?,
            ),
            (
                "client_secret",
                required(&self.credentials.client_secret, "SERVICENOW_CLIENT_SECRET")?,
            ),
            (
                "username",
                required(&self.credentials.username, "SERVICENOW_USERNAME")?,
            ),
            (
                "password",
                required(&self.credentials.password, "SERVICENOW_PASSWORD")?,
            ),
        ];

        tracing::debug!(url = token_url, "requesting OAuth token");

        let response = self
            .http
            .post(token_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|err| {
                AppError::IssueTracker(format!("failed to call token endpoint: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AppError::IssueTracker(format!(
                "token endpoint responded with {status}: {body}"
            )));
        }

        let payload: TokenResponse = response.json().await.map_err(|err| {
            AppError::IssueTracker(format!("failed to parse token response: {err}"))
        })?;

        Ok(payload.access_token)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}
