//! Worker configuration.
//!
//! One [`WorkerConfig`] is built at startup and handed to the dispatcher,
//! which passes the relevant parts into the services it builds per task.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::task::TaskMethod;
use crate::error::CoreError;

/// Which task methods this worker accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    /// Deploy and publish only
    Site,
    /// Post create/update/delete/publish/conceal only
    Post,
    #[default]
    All,
}

impl EntryMode {
    pub fn allows(&self, method: TaskMethod) -> bool {
        match self {
            Self::Site => method.is_site_task(),
            Self::Post => !method.is_site_task(),
            Self::All => true,
        }
    }

    pub fn allowed_methods(&self) -> Vec<TaskMethod> {
        TaskMethod::ALL
            .into_iter()
            .filter(|method| self.allows(*method))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Post => "post",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "site" => Ok(Self::Site),
            "post" => Ok(Self::Post),
            "all" => Ok(Self::All),
            other => Err(CoreError::UnknownEntryMode(other.to_string())),
        }
    }
}

/// Identity recorded on every commit the worker makes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for GitAuthor {
    fn default() -> Self {
        Self {
            name: "press-worker".to_string(),
            email: "press-worker@users.noreply.github.com".to_string(),
        }
    }
}

impl GitAuthor {
    /// `Name <email>` form accepted by `git commit --author`.
    pub fn signature(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendSettings {
    pub url: String,
    pub token: Option<String>,
    pub worker_id: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/api".to_string(),
            token: None,
            worker_id: "press-worker".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Parent directory of the per-repository workspaces
    pub workspace_root: PathBuf,
    /// Shared generator installation the workspaces are linked into
    pub generator_dir: PathBuf,
    /// Site template providing the template config layers
    pub template_dir: PathBuf,
    /// Command used for the generator build step
    pub generator_command: Vec<String>,
    pub git_author: GitAuthor,
    pub entry_mode: EntryMode,
    pub backend: BackendSettings,
    pub poll_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("./workspaces"),
            generator_dir: PathBuf::from("./generator"),
            template_dir: PathBuf::from("./template"),
            generator_command: vec![
                "npx".to_string(),
                "hexo".to_string(),
                "generate".to_string(),
            ],
            git_author: GitAuthor::default(),
            entry_mode: EntryMode::default(),
            backend: BackendSettings::default(),
            poll_interval_secs: 5,
            heartbeat_interval_secs: 60,
        }
    }
}

impl WorkerConfig {
    pub fn new(workspace_root: impl Into<PathBuf>, generator_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            generator_dir: generator_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    pub fn with_entry_mode(mut self, mode: EntryMode) -> Self {
        self.entry_mode = mode;
        self
    }

    pub fn with_git_author(mut self, author: GitAuthor) -> Self {
        self.git_author = author;
        self
    }

    /// Working tree for a given repository name.
    pub fn workspace_for(&self, repo: &str) -> PathBuf {
        self.workspace_root.join(repo)
    }

    pub fn generator_dir(&self) -> &Path {
        &self.generator_dir
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.generator_command.is_empty() {
            return Err(CoreError::Validation(
                "generator_command must not be empty".to_string(),
            ));
        }
        if self.git_author.name.trim().is_empty() || self.git_author.email.trim().is_empty() {
            return Err(CoreError::Validation(
                "git author name and email are required".to_string(),
            ));
        }
        Ok(())
    }
}
