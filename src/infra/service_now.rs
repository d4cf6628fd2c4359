use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::{ServiceNowConfig, required};
use crate::domain::ticket::{Ticket, TicketRequest, TicketStatus};
use crate::error::{AppError, AppResult};
use crate::infra::http::{encode_segment, error_body};
use crate::infra::oauth::OAuthTokenAcquirer;
use crate::services::IssueTrackerService;

const STATE_NEW: &str = "1";
const STATE_RESOLVED: &str = "6";
const STATE_CANCELLED: &str = "8";

/// Incident `state` value for a relay status label.
pub fn state_code(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::New => STATE_NEW,
        TicketStatus::Resolved => STATE_RESOLVED,
        TicketStatus::Cancelled => STATE_CANCELLED,
    }
}

/// Relay status label for an incident `state` value; codes outside the supported set map
/// to `None`.
pub fn status_from_state(code: &str) -> Option<TicketStatus> {
    match code.trim() {
        STATE_NEW => Some(TicketStatus::New),
        STATE_RESOLVED => Some(TicketStatus::Resolved),
        STATE_CANCELLED => Some(TicketStatus::Cancelled),
        _ => None,
    }
}

/// Incident record as returned by the Table API. Only the fields the relay exposes are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceNowRecord {
    #[serde(default)]
    pub sys_id: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_state")]
    pub state: Option<String>,
}

impl From<ServiceNowRecord> for Ticket {
    fn from(record: ServiceNowRecord) -> Self {
        Ticket {
            id: record.sys_id,
            title: record.short_description,
            description: record.description,
            status: record.state.as_deref().and_then(status_from_state),
        }
    }
}

// Instances return `state` as a string by default and as a number with some display settings.
fn deserialize_state<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(code)) => Some(code),
        Some(serde_json::Value::Number(code)) => Some(code.to_string()),
        _ => None,
    })
}

pub struct ServiceNowClient {
    http: Client,
    instance_url: Option<String>,
    ticket_path: String,
    tokens: OAuthTokenAcquirer,
}

impl ServiceNowClient {
    pub fn new(http: Client, config: &ServiceNowConfig) -> Self {
        let token_url = config
            .instance_url
            .as_deref()
            .map(|instance| join_url(instance, &config.oauth_path));
        let tokens = OAuthTokenAcquirer::new(http.clone(), token_url, config.credentials.clone());

        Self {
            http,
            instance_url: config.instance_url.clone(),
            ticket_path: config.ticket_path.clone(),
            tokens,
        }
    }

    fn ticket_endpoint(&self) -> AppResult<String> {
        let instance = required(&self.instance_url, "SERVICENOW_INSTANCE_URL")?;
        Ok(join_url(instance, &self.ticket_path))
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<Ticket> {
        let token = self.tokens.acquire_token().await?;

        let response = request
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to call ServiceNow: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AppError::IssueTracker(format!(
                "ServiceNow responded with {status}: {body}"
            )));
        }

        let payload: ServiceNowResponse = response.json().await.map_err(|err| {
            AppError::IssueTracker(format!("failed to parse ServiceNow response: {err}"))
        })?;

        Ok(payload.result.into())
    }
}

#[async_trait]
impl IssueTrackerService for ServiceNowClient {
    async fn create_ticket(&self, request: TicketRequest) -> AppResult<Ticket> {
        let url = self.ticket_endpoint()?;
        let body = ServiceNowTicketFields::from_request(&request);

        tracing::debug!(url = %url, "creating ServiceNow ticket");

        let ticket = self
            .send(
                self.http
                    .post(&url)
                    .header(CONTENT_TYPE, "application/json")
                    .json(&body),
            )
            .await?;

        tracing::info!(ticket_id = ticket.id.as_deref().unwrap_or(""), "ticket created");
        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: &str) -> AppResult<Ticket> {
        let url = format!(
            "{}/{}",
            self.ticket_endpoint()?,
            encode_segment(ticket_id)?
        );

        tracing::debug!(url = %url, "fetching ServiceNow ticket");

        self.send(self.http.get(&url)).await
    }

    async fn update_ticket(&self, ticket_id: &str, request: TicketRequest) -> AppResult<Ticket> {
        let url = format!(
            "{}/{}",
            self.ticket_endpoint()?,
            encode_segment(ticket_id)?
        );
        let body = ServiceNowTicketFields::from_request(&request);

        tracing::debug!(url = %url, "updating ServiceNow ticket");

        let ticket = self
            .send(
                self.http
                    .patch(&url)
                    .header(CONTENT_TYPE, "application/json")
                    .json(&body),
            )
            .await?;

        tracing::info!(ticket_id, "ticket updated");
        Ok(ticket)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Serialize)]
struct ServiceNowTicketFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    short_description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
}

impl<'a> ServiceNowTicketFields<'a> {
    fn from_request(request: &'a TicketRequest) -> Self {
        Self {
            short_description: request.title.as_deref(),
            description: request.description.as_deref(),
            state: request.status().map(state_code),
        }
    }
}

#[derive(Deserialize)]
struct ServiceNowResponse {
    result: ServiceNowRecord,
}
