use async_trait::async_trait;
use press_core::GitAuthor;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// Low-level git operations against one working tree.
///
/// Implementations are expected to be thin: no retries, no policy. Everything
/// about ordering and credentials lives in [`crate::GitService`].
#[async_trait]
pub trait GitCommands: Send + Sync {
    /// Working tree this helper operates on
    fn path(&self) -> &Path;

    /// Initialize a repository; re-running on an existing repository is a no-op
    async fn init(&self, branch: Option<&str>) -> Result<()>;

    async fn fetch(&self, remote: &str, refspecs: &[String]) -> Result<()>;

    /// Check out `branch`, resetting it to the fetched remote-tracking ref
    async fn checkout(&self, branch: &str) -> Result<()>;

    async fn add_all(&self) -> Result<()>;

    /// Whether the working tree has anything to stage or commit
    async fn has_changes(&self) -> Result<bool>;

    async fn commit(&self, message: &str, author: &GitAuthor, allow_empty: bool) -> Result<()>;

    /// Names of the configured remotes
    async fn remote_show(&self) -> Result<Vec<String>>;

    async fn remote_add(&self, name: &str, url: &str) -> Result<()>;

    async fn remote_remove(&self, name: &str) -> Result<()>;

    async fn push(&self, remote: &str, branch: &str, force: bool) -> Result<()>;

    /// Set a repository-local config value
    async fn config_set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove every value of a repository-local config key; missing keys are fine
    async fn config_unset(&self, key: &str) -> Result<()>;

    async fn config_get(&self, key: &str) -> Result<Option<String>>;
}

/// Opens a [`GitCommands`] helper for an arbitrary directory.
pub trait RepoOpener: Send + Sync {
    fn open(&self, path: &Path) -> Arc<dyn GitCommands>;
}
