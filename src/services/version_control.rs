use async_trait::async_trait;

use crate::domain::commit::{CommitPath, RemoteFileState};
use crate::error::AppResult;

/// A provider-specific file commit, split into the read-only probe and the write it informs.
///
/// Implementations only speak the provider's wire format. The ordering of probe and write,
/// and the choice of token, belong to [`crate::workflow::commit::upsert_file`].
#[async_trait]
pub trait CommitProtocol: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Looks up `path` on the configured branch. A provider 404 is `Ok(Absent)`; anything
    /// else that is not a success is an error.
    async fn probe(&self, path: &CommitPath) -> AppResult<RemoteFileState>;

    /// Writes `content` to `path`. `concurrency_token` is `Some` only for updates.
    async fn write(
        &self,
        path: &CommitPath,
        content: &[u8],
        message: &str,
        concurrency_token: Option<&str>,
    ) -> AppResult<()>;
}
