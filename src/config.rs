use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_GITHUB_BASE_URL: &str = "https://api.github.com";
const DEFAULT_BITBUCKET_BASE_URL: &str = "https://api.bitbucket.org/2.0";
const DEFAULT_SERVICENOW_OAUTH_PATH: &str = "/oauth_token.do";
const DEFAULT_SERVICENOW_TICKET_PATH: &str = "/api/now/table/incident";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub http_timeout: Duration,
    pub max_body_bytes: usize,
    pub repository: RepositoryConfig,
    pub github: GitHubConfig,
    pub bitbucket: BitbucketConfig,
    pub service_now: ServiceNowConfig,
}

/// Settings shared by both version-control providers.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub branch: Option<String>,
    pub folder_path: String,
    pub validate_file_paths: bool,
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub base_url: String,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BitbucketConfig {
    pub base_url: String,
    pub workspace: Option<String>,
    pub repo_slug: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceNowConfig {
    pub instance_url: Option<String>,
    pub oauth_path: String,
    pub ticket_path: String,
    pub credentials: OAuthCredentials,
}

/// Password-grant credentials exchanged for a bearer token on every ticket call.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let http_timeout_secs = match var("RELAY_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|err| {
                AppError::Configuration(format!("RELAY_HTTP_TIMEOUT_SECS '{raw}': {err}"))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        if http_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "RELAY_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        let max_body_bytes = match var("RELAY_MAX_BODY_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|err| {
                AppError::Configuration(format!("RELAY_MAX_BODY_BYTES '{raw}': {err}"))
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        let validate_file_paths = match var("RELAY_VALIDATE_FILE_PATHS") {
            Some(raw) => parse_flag("RELAY_VALIDATE_FILE_PATHS", &raw)?,
            None => false,
        };

        Ok(Self {
            listen_addr: var("RELAY_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            max_body_bytes,
            repository: RepositoryConfig {
                branch: var("REPO_BRANCH"),
                folder_path: var("REPO_FOLDER_PATH").unwrap_or_default(),
                validate_file_paths,
            },
            github: GitHubConfig {
                base_url: var("GITHUB_REST_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GITHUB_BASE_URL.to_string()),
                owner: var("GITHUB_REPO_OWNER"),
                repo: var("GITHUB_REPO_NAME"),
                access_token: var("GITHUB_ACCESS_TOKEN"),
            },
            bitbucket: BitbucketConfig {
                base_url: var("BITBUCKET_REST_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BITBUCKET_BASE_URL.to_string()),
                workspace: var("BITBUCKET_WORKSPACE"),
                repo_slug: var("BITBUCKET_REPO_SLUG"),
                access_token: var("BITBUCKET_ACCESS_TOKEN"),
            },
            service_now: ServiceNowConfig {
                instance_url: var("SERVICENOW_INSTANCE_URL"),
                oauth_path: var("SERVICENOW_OAUTH_PATH")
                    .unwrap_or_else(|| DEFAULT_SERVICENOW_OAUTH_PATH.to_string()),
                ticket_path: var("SERVICENOW_TICKET_PATH")
                    .unwrap_or_else(|| DEFAULT_SERVICENOW_TICKET_PATH.to_string()),
                credentials: OAuthCredentials {
                    client_id: var("SERVICENOW_CLIENT_ID"),
                    client_secret: var("SERVICENOW_CLIENT_SECRET"),
                    username: var("SERVICENOW_USERNAME"),
                    password: var("SERVICENOW_PASSWORD"),
                },
            },
        })
    }

    /// Names of settings that are unset, so startup can warn about the integrations
    /// that will fail.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let checks = [
            ("REPO_BRANCH", self.repository.branch.is_some()),
            ("GITHUB_REPO_OWNER", self.github.owner.is_some()),
            ("GITHUB_REPO_NAME", self.github.repo.is_some()),
            ("GITHUB_ACCESS_TOKEN", self.github.access_token.is_some()),
            ("BITBUCKET_WORKSPACE", self.bitbucket.workspace.is_some()),
            ("BITBUCKET_REPO_SLUG", self.bitbucket.repo_slug.is_some()),
            ("BITBUCKET_ACCESS_TOKEN", self.bitbucket.access_token.is_some()),
            ("SERVICENOW_INSTANCE_URL", self.service_now.instance_url.is_some()),
            (
                "SERVICENOW_CLIENT_ID",
                self.service_now.credentials.client_id.is_some(),
            ),
            (
                "SERVICENOW_CLIENT_SECRET",
                self.service_now.credentials.client_secret.is_some(),
            ),
            (
                "SERVICENOW_USERNAME",
                self.service_now.credentials.username.is_some(),
            ),
            (
                "SERVICENOW_PASSWORD",
                self.service_now.credentials.password.is_some(),
            ),
        ];

        checks
            .into_iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Turns an optional setting into a value or a configuration error naming it.
pub fn required<'a>(value: &'a Option<String>, name: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| AppError::Configuration(format!("{name} not configured")))
}

fn parse_flag(name: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Configuration(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}
