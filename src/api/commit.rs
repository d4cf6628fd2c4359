use axum::{
    Json,
    extract::{Multipart, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::domain::commit::FileCommitRequest;
use crate::error::{AppError, AppResult};
use crate::workflow::commit::commit_file;

const COMMITTED_MESSAGE: &str = "File Committed Successfully";

#[derive(Serialize)]
pub struct CommitResponse {
    message: &'static str,
}

impl CommitResponse {
    fn committed() -> Json<Self> {
        Json(Self {
            message: COMMITTED_MESSAGE,
        })
    }
}

#[derive(Deserialize)]
pub struct BitbucketCommitBody {
    #[serde(default)]
    file_content: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    commit_message: Option<String>,
}

/// `POST /github/commit-file`: multipart upload with a `file` part and a `commit_message` field.
pub async fn github_commit_file(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> AppResult<Json<CommitResponse>> {
    let multipart =
        multipart.map_err(|err| AppError::InvalidInput(format!("invalid multipart body: {err}")))?;
    let request = read_upload(multipart).await?;

    commit_file(ctx.github.as_ref(), &ctx.config.repository, request).await?;
    Ok(CommitResponse::committed())
}

/// `POST /bitbucket/commit-file`: JSON body carrying the file inline.
pub async fn bitbucket_commit_file(
    State(ctx): State<AppContext>,
    body: Result<Json<BitbucketCommitBody>, JsonRejection>,
) -> AppResult<Json<CommitResponse>> {
    let Json(body) =
        body.map_err(|err| AppError::InvalidInput(format!("invalid JSON body: {err}")))?;

    let request = FileCommitRequest {
        file_name: body.file_name.unwrap_or_default(),
        content: body.file_content.unwrap_or_default().into_bytes(),
        commit_message: body.commit_message.unwrap_or_default(),
    };

    commit_file(ctx.bitbucket.as_ref(), &ctx.config.repository, request).await?;
    Ok(CommitResponse::committed())
}

async fn read_upload(mut multipart: Multipart) -> AppResult<FileCommitRequest> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut commit_message = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::InvalidInput(format!("invalid multipart field: {err}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(|err| {
                    AppError::InvalidInput(format!("failed to read uploaded file: {err}"))
                })?;
                upload = Some((file_name, content.to_vec()));
            }
            Some("commit_message") => {
                commit_message = field.text().await.map_err(|err| {
                    AppError::InvalidInput(format!("failed to read commit message: {err}"))
                })?;
            }
            _ => {}
        }
    }

    let (file_name, content) =
        upload.ok_or_else(|| AppError::InvalidInput("missing 'file' part".to_string()))?;

    Ok(FileCommitRequest {
        file_name,
        content,
        commit_message,
    })
}
