use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

use crate::error::CoreError;

/// Hosting service behind a repository descriptor.
///
/// Unknown services deserialize into [`GitServiceType::Other`] so that the
/// descriptor still parses; validation then rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GitServiceType {
    GitHub,
    Gitee,
    Other(String),
}

impl GitServiceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::GitHub => "github",
            Self::Gitee => "gitee",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for GitServiceType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "github" => Self::GitHub,
            "gitee" => Self::Gitee,
            _ => Self::Other(value),
        }
    }
}

impl From<GitServiceType> for String {
    fn from(value: GitServiceType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for GitServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository descriptor carried by a task.
///
/// The token only lives for the duration of one task and is never written to
/// disk by the worker except inside a scoped git credential.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitInfo {
    #[serde(rename = "type", alias = "service")]
    pub service: GitServiceType,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default, alias = "access_token")]
    pub token: String,
}

fn default_branch() -> String {
    "master".to_string()
}

impl GitInfo {
    pub fn new(
        service: GitServiceType,
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            service,
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            token: String::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.owner.trim().is_empty() {
            return Err(CoreError::MissingField("owner"));
        }
        if self.repo.trim().is_empty() {
            return Err(CoreError::MissingField("repo"));
        }
        if self.branch.trim().is_empty() {
            return Err(CoreError::MissingField("branch"));
        }
        if let GitServiceType::Other(name) = &self.service {
            return Err(CoreError::Validation(format!(
                "unsupported git service '{}'",
                name
            )));
        }
        if !is_plain_dir_name(&self.repo) {
            return Err(CoreError::Validation(format!(
                "repository name '{}' is not a plain directory name",
                self.repo
            )));
        }
        Ok(())
    }
}

/// A single normal path component: no separators, no `.` or `..`.
fn is_plain_dir_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl fmt::Debug for GitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitInfo")
            .field("service", &self.service)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .finish()
    }
}
