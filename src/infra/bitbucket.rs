use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::ACCEPT,
};
use serde::Deserialize;

use crate::config::{BitbucketConfig, RepositoryConfig, required};
use crate::domain::commit::{CommitPath, RemoteFileState};
use crate::error::{AppError, AppResult};
use crate::infra::http::{encode_path, error_body};
use crate::services::CommitProtocol;

/// Commits through the `src` endpoint. The concurrency token is the hash of the last commit
/// touching the path, sent back as `parents`.
pub struct BitbucketClient {
    http: Client,
    base_url: String,
    workspace: Option<String>,
    repo_slug: Option<String>,
    token: Option<String>,
    branch: Option<String>,
}

struct ApiDetails<'a> {
    workspace: &'a str,
    repo_slug: &'a str,
    token: &'a str,
    branch: &'a str,
}

impl BitbucketClient {
    pub fn new(http: Client, config: &BitbucketConfig, repository: &RepositoryConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            workspace: config.workspace.clone(),
            repo_slug: config.repo_slug.clone(),
            token: config.access_token.clone(),
            branch: repository.branch.clone(),
        }
    }

    fn api_details(&self) -> AppResult<ApiDetails<'_>> {
        Ok(ApiDetails {
            workspace: required(&self.workspace, "BITBUCKET_WORKSPACE")?,
            repo_slug: required(&self.repo_slug, "BITBUCKET_REPO_SLUG")?,
            token: required(&self.token, "BITBUCKET_ACCESS_TOKEN")?,
            branch: required(&self.branch, "REPO_BRANCH")?,
        })
    }

    fn src_endpoint(&self, workspace: &str, repo_slug: &str) -> String {
        format!(
            "{}/repositories/{workspace}/{repo_slug}/src",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CommitProtocol for BitbucketClient {
    fn provider(&self) -> &'static str {
        "bitbucket"
    }

    async fn probe(&self, path: &CommitPath) -> AppResult<RemoteFileState> {
        let api = self.api_details()?;
        let url = format!(
            "{}/{}/{}",
            self.src_endpoint(api.workspace, api.repo_slug),
            encode_path(api.branch),
            encode_path(path.as_str())
        );

        tracing::debug!(url = %url, "probing Bitbucket file");

        let response = self
            .http
            .get(&url)
            .bearer_auth(api.token)
            .header(ACCEPT, "application/json")
            .query(&[("format", "meta")])
            .send()
            .await
            .map_err(|err| AppError::VersionControl(format!("failed to call Bitbucket: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(RemoteFileState::Absent);
        }
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AppError::VersionControl(format!(
                "Bitbucket responded with {status}: {body}"
            )));
        }

        let payload: BitbucketFileMeta = response.json().await.map_err(|err| {
            AppError::VersionControl(format!("failed to parse Bitbucket response: {err}"))
        })?;

        Ok(RemoteFileState::Existing {
            token: payload.commit.hash,
        })
    }

    async fn write(
        &self,
        path: &CommitPath,
        content: &[u8],
        message: &str,
        concurrency_token: Option<&str>,
    ) -> AppResult<()> {
        let api = self.api_details()?;
        let parents = concurrency_token.into_iter().collect::<Vec<_>>().join(",");
        let content = String::from_utf8_lossy(content);

        // The file's repository path is itself the form field carrying its content.
        let form = [
            ("message", message),
            ("branch", api.branch),
            ("parents", parents.as_str()),
            (path.as_str(), &*content),
        ];

        let response = self
            .http
            .post(self.src_endpoint(api.workspace, api.repo_slug))
            .bearer_auth(api.token)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|err| AppError::VersionControl(format!("failed to call Bitbucket: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AppError::VersionControl(format!(
                "Bitbucket rejected commit with {status}: {body}"
            )));
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct BitbucketFileMeta {
    commit: BitbucketCommitRef,
}

#[derive(Deserialize)]
struct BitbucketCommitRef {
    hash: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{
        body_string, body_string_contains, header, method, path, query_param,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::workflow::commit::upsert_file;

    const SRC_PATH: &str = "/repositories/acme-ws/site/src";
    const META_PATH: &str = "/repositories/acme-ws/site/src/main/docs/notes.md";

    fn client(server: &MockServer) -> BitbucketClient {
        let config = BitbucketConfig {
            base_url: server.uri(),
            workspace: Some("acme-ws".to_string()),
            repo_slug: Some("site".to_string()),
            access_token: Some("bb-token".to_string()),
        };
        let repository = RepositoryConfig {
            branch: Some("main".to_string()),
            folder_path: "docs".to_string(),
            validate_file_paths: false,
        };
        BitbucketClient::new(Client::new(), &config, &repository)
    }

    fn notes_path() -> CommitPath {
        CommitPath::from_parts("docs", "notes.md", false).unwrap()
    }

    #[tokio::test]
    async fn creates_file_with_empty_parents_when_probe_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(META_PATH))
            .and(query_param("format", "meta"))
            .and(header("authorization", "Bearer bb-token"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SRC_PATH))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string(
                "message=add+notes&branch=main&parents=&docs%2Fnotes.md=hello",
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let state = upsert_file(&client(&server), &notes_path(), b"hello", "add notes")
            .await
            .unwrap();

        assert_eq!(state, RemoteFileState::Absent);
    }

    #[tokio::test]
    async fn updates_file_with_last_commit_as_parent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(META_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "path": "docs/notes.md",
                "commit": {"hash": "abc123", "type": "commit"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SRC_PATH))
            .and(body_string_contains("parents=abc123"))
            .respond_with(ResponseTemplate::new(201))
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
            .and(path(META_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let result = upsert_file(&client(&server), &notes_path(), b"hello", "add notes").await;

        assert!(matches!(result, Err(AppError::VersionControl(_))));
    }

    #[tokio::test]
    async fn rejected_write_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("parents mismatch"))
            .expect(1)
            .mount(&server)
            .await;

        let result = upsert_file(&client(&server), &notes_path(), b"hello", "add notes").await;

        let error = result.unwrap_err();
        assert!(error.to_string().contains("parents mismatch"));
    }

    #[tokio::test]
    async fn reserved_characters_in_file_name_stay_in_the_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repositories/acme-ws/site/src/main/docs/notes%3Fv%3D1%231.md"))
            .and(query_param("format", "meta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "commit": {"hash": "abc123"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SRC_PATH))
            .and(body_string_contains("docs%2Fnotes%3Fv%3D1%231.md=hello"))
            .and(body_string_contains("parents=abc123"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let file = CommitPath::from_parts("docs", "notes?v=1#1.md", false).unwrap();
        let state = upsert_file(&client(&server), &file, b"hello", "update notes")
            .await
            .unwrap();

        assert_eq!(state.concurrency_token(), Some("abc123"));
    }
}
