use crate::config::RepositoryConfig;
use crate::domain::commit::{CommitPath, FileCommitRequest, RemoteFileState};
use crate::error::AppResult;
use crate::services::CommitProtocol;

/// Commits an uploaded file under the configured folder of the target repository.
pub async fn commit_file(
    protocol: &dyn CommitProtocol,
    repository: &RepositoryConfig,
    request: FileCommitRequest,
) -> AppResult<RemoteFileState> {
    let path = CommitPath::from_parts(
        &repository.folder_path,
        &request.file_name,
        repository.validate_file_paths,
    )?;

    let state = upsert_file(
        protocol,
        &path,
        &request.content,
        &request.commit_message,
    )
    .await?;

    tracing::info!(
        provider = protocol.provider(),
        path = path.as_str(),
        updated = state.exists(),
        "file committed"
    );

    Ok(state)
}

/// Probe, then write with whatever version the probe saw. A probe failure never reaches the
/// write; a conflict reported by the provider on write is returned as-is.
pub async fn upsert_file(
    protocol: &dyn CommitProtocol,
    path: &CommitPath,
    content: &[u8],
    message: &str,
) -> AppResult<RemoteFileState> {
    let state = protocol.probe(path).await?;

    tracing::debug!(
        provider = protocol.provider(),
        path = path.as_str(),
        exists = state.exists(),
        "probed remote file"
    );

    protocol
        .write(path, content, message, state.concurrency_token())
        .await?;

    Ok(state)
}
