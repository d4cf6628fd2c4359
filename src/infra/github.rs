use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::ACCEPT,
};
use serde::{Deserialize, Serialize};

use crate::config::{GitHubConfig, RepositoryConfig, required};
use crate::domain::commit::{CommitPath, RemoteFileState};
use crate::error::{AppError, AppResult};
use crate::infra::http::{encode_path, error_body};
use crate::services::CommitProtocol;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Commits through the repository contents API. The concurrency token is the blob SHA.
pub struct GitHubClient {
    http: Client,
    base_url: String,
    owner: Option<String>,
    repo: Option<String>,
    token: Option<String>,
    branch: Option<String>,
}

struct ApiDetails<'a> {
    owner: &'a str,
    repo: &'a str,
    token: &'a str,
    branch: &'a str,
}

impl GitHubClient {
    pub fn new(http: Client, config: &GitHubConfig, repository: &RepositoryConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.access_token.clone(),
            branch: repository.branch.clone(),
        }
    }

    fn api_details(&self) -> AppResult<ApiDetails<'_>> {
        Ok(ApiDetails {
            owner: required(&self.owner, "GITHUB_REPO_OWNER")?,
            repo: required(&self.repo, "GITHUB_REPO_NAME")?,
            token: required(&self.token, "GITHUB_ACCESS_TOKEN")?,
            branch: required(&self.branch, "REPO_BRANCH")?,
        })
    }

    fn contents_endpoint(&self, owner: &str, repo: &str, path: &CommitPath) -> String {
        format!(
            "{}/repos/{owner}/{repo}/contents/{}",
            self.base_url.trim_end_matches('/'),
            encode_path(path.as_str())
        )
    }

    fn authorized(request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(API_VERSION_HEADER, API_VERSION)
    }
}

#[async_trait]
impl CommitProtocol for GitHubClient {
    fn provider(&self) -> &'static str {
        "github"
    }

    async fn probe(&self, path: &CommitPath) -> AppResult<RemoteFileState> {
        let api = self.api_details()?;
        let url = self.contents_endpoint(api.owner, api.repo, path);

        tracing::debug!(url = %url, branch = api.branch, "probing GitHub file");

        let response = Self::authorized(self.http.get(&url), api.token)
            .query(&[("ref", api.branch)])
            .send()
            .await
            .map_err(|err| AppError::VersionControl(format!("failed to call GitHub: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(RemoteFileState::Absent);
        }
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AppError::VersionControl(format!(
                "GitHub responded with {status}: {body}"
            )));
        }

        let payload: GitHubContent = response.json().await.map_err(|err| {
            AppError::VersionControl(format!("failed to parse GitHub response: {err}"))
        })?;

        Ok(RemoteFileState::Existing { token: payload.sha })
    }

    async fn write(
        &self,
        path: &CommitPath,
        content: &[u8],
        message: &str,
        concurrency_token: Option<&str>,
    ) -> AppResult<()> {
        let api = self.api_details()?;
        let url = self.contents_endpoint(api.owner, api.repo, path);
        let request_body = GitHubCommitRequest {
            message,
            content: BASE64_STANDARD.encode(content),
            sha: concurrency_token.filter(|sha| !sha.is_empty()),
            branch: api.branch,
        };

        let response = Self::authorized(self.http.put(&url), api.token)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| AppError::VersionControl(format!("failed to call GitHub: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AppError::VersionControl(format!(
                "GitHub rejected commit with {status}: {body}"
            )));
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct GitHubContent {
    sha: String,
}

#[derive(Serialize)]
struct GitHubCommitRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::workflow::commit::upsert_file;

    const CONTENTS_PATH: &str = "/repos/acme/site/contents/docs/notes.md";

    fn client(server: &MockServer) -> GitHubClient {
        let config = GitHubConfig {
            base_url: server.uri(),
            owner: Some("acme".to_string()),
            repo: Some("site".to_string()),
            access_token: Some("gh-token".to_string()),
        };
        let repository = RepositoryConfig {
            branch: Some("main".to_string()),
            folder_path: "docs".to_string(),
            validate_file_paths: false,
        };
        GitHubClient::new(Client::new(), &config, &repository)
    }

    fn notes_path() -> CommitPath {
        CommitPath::from_parts("docs", "notes.md", false).unwrap()
    }

    async fn written_body(server: &MockServer) -> Value {
        let requests = server.received_requests().await.unwrap();
        let put = requests
            .iter()
            .find(|request| request.method.as_str() == "PUT")
            .expect("no PUT request recorded");
        serde_json::from_slice(&put.body).unwrap()
    }

    #[tokio::test]
    async fn creates_file_without_sha_when_probe_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .and(query_param("ref", "main"))
            .and(header("authorization", "Bearer gh-token"))
            .and(header("x-github-api-version", "2022-11-28"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let state = upsert_file(&client(&server), &notes_path(), b"hello", "add notes")
            .await
            .unwrap();

        assert_eq!(state, RemoteFileState::Absent);
        let body = written_body(&server).await;
        assert_eq!(
            body,
            json!({"message": "add notes", "content": "aGVsbG8=", "branch": "main"})
        );
        assert!(body.get("sha").is_none());
    }

    #[tokio::test]
    async fn updates_file_with_probed_sha() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "notes.md", "sha": "abc123"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS_PATH))
            .and(body_partial_json(json!({"sha": "abc123", "branch": "main"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let state = upsert_file(&client(&server), &notes_path(), b"hello", "update notes")
            .await
            .unwrap();

        assert_eq!(state.concurrency_token(), Some("abc123"));
    }

    #[tokio::test]
    async fn probe_error_never_writes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = upsert_file(&client(&server), &notes_path(), b"hello", "add notes").await;

        let error = result.unwrap_err();
        assert!(error.to_string().contains("500"));
    }

    #[tokio::test]
    async fn malformed_probe_body_never_writes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "a"}])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = upsert_file(&client(&server), &notes_path(), b"hello", "add notes").await;

        assert!(matches!(result, Err(AppError::VersionControl(_))));
    }

    #[tokio::test]
    async fn write_conflict_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sha": "stale"})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409).set_body_string("sha does not match"))
            .expect(1)
            .mount(&server)
            .await;

        let result = upsert_file(&client(&server), &notes_path(), b"hello", "add notes").await;

        assert!(matches!(result, Err(AppError::VersionControl(_))));
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&server)
            .await;

        let mut github = client(&server);
        github.token = None;

        let result = github.probe(&notes_path()).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn reserved_characters_in_file_name_stay_in_the_path() {
        let server = MockServer::start().await;
        let encoded = "/repos/acme/site/contents/docs/notes%231%3F.md";
        Mock::given(method("GET"))
            .and(path(encoded))
            .and(query_param("ref", "main"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(encoded))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let file = CommitPath::from_parts("docs", "notes#1?.md", false).unwrap();
        upsert_file(&client(&server), &file, b"hello", "add notes")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn slow_lookup_times_out_without_writing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"sha": "abc123"}))
                    .set_delay(std::time::Duration::from_secs(2)),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut github = client(&server);
        github.http =
            crate::infra::http::build_client(std::time::Duration::from_millis(200)).unwrap();

        let result = upsert_file(&github, &notes_path(), b"hello", "add notes").await;

        assert!(matches!(result, Err(AppError::VersionControl(_))));
    }
}
