use crate::error::{AppError, AppResult};

/// A file upload to be committed, as received from a relay caller.
#[derive(Debug, Clone)]
pub struct FileCommitRequest {
    pub file_name: String,
    pub content: Vec<u8>,
    pub commit_message: String,
}

/// What the probe learned about the target path before writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFileState {
    /// The file exists at the given version (GitHub blob SHA, Bitbucket commit hash).
    Existing { token: String },
    Absent,
}

impl RemoteFileState {
    pub fn exists(&self) -> bool {
        matches!(self, RemoteFileState::Existing { .. })
    }

    pub fn concurrency_token(&self) -> Option<&str> {
        match self {
            RemoteFileState::Existing { token } => Some(token),
            RemoteFileState::Absent => None,
        }
    }
}

/// Repository-relative path of the file being committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPath(String);

impl CommitPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins the configured folder and the uploaded file name. With `validate` off the file
    /// name is used as given, traversal segments included.
    pub fn from_parts(folder: &str, file_name: &str, validate: bool) -> AppResult<Self> {
        if validate {
            validate_file_name(file_name)?;
        }

        let folder = folder.trim_end_matches('/');
        if folder.is_empty() {
            Ok(Self(file_name.to_string()))
        } else {
            Ok(Self(format!("{folder}/{file_name}")))
        }
    }
}

fn validate_file_name(file_name: &str) -> AppResult<()> {
    if file_name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "file name must not be empty".to_string(),
        ));
    }
    if file_name.starts_with('/') || file_name.contains('\\') {
        return Err(AppError::InvalidInput(format!(
            "file name '{file_name}' must be a relative path"
        )));
    }
    if file_name.split('/').any(|segment| segment == "..") {
        return Err(AppError::InvalidInput(format!(
            "file name '{file_name}' escapes the target folder"
        )));
    }
    Ok(())
}
