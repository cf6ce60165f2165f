use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Failed to write config {path}: {reason}")]
    ConfigWrite { path: PathBuf, reason: String },

    #[error("Post already exists: {0}")]
    PostExists(PathBuf),

    #[error("Post not found: {0}")]
    PostNotFound(PathBuf),

    #[error("Generator command failed: {0}")]
    CommandFailed(String),

    #[error("Post {title:?} maps to {slug:?}, already used by {claimed_by:?} in this batch")]
    DuplicateSlug {
        title: String,
        slug: String,
        claimed_by: String,
    },

    #[error("Invalid post: {0}")]
    InvalidPost(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SiteError {
    pub fn config_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ConfigWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SiteError>;
