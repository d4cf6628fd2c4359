use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::infra::bitbucket::BitbucketClient;
use crate::infra::github::GitHubClient;
use crate::infra::http::build_client;
use crate::infra::service_now::ServiceNowClient;
use crate::services::{CommitProtocol, IssueTrackerService};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub github: Arc<dyn CommitProtocol>,
    pub bitbucket: Arc<dyn CommitProtocol>,
    pub issue_tracker: Arc<dyn IssueTrackerService>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        github: Arc<dyn CommitProtocol>,
        bitbucket: Arc<dyn CommitProtocol>,
        issue_tracker: Arc<dyn IssueTrackerService>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            github,
            bitbucket,
            issue_tracker,
        }
    }

    /// Wires the provider clients from configuration, sharing one HTTP client.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let http = build_client(config.http_timeout)?;

        let github = Arc::new(GitHubClient::new(
            http.clone(),
            &config.github,
            &config.repository,
        ));
        let bitbucket = Arc::new(BitbucketClient::new(
            http.clone(),
            &config.bitbucket,
            &config.repository,
        ));
        let issue_tracker = Arc::new(ServiceNowClient::new(http, &config.service_now));

        Ok(Self::new(config, github, bitbucket, issue_tracker))
    }
}
