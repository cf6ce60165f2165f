use chrono::Utc;
use press_core::{GitAuthor, GitInfo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::GitAuth;
use crate::error::{Result, VcsError};
use crate::remote::provider_for;
use crate::traits::{GitCommands, RepoOpener};

const REMOTE_NAME: &str = "origin";

/// Version-control side of a task: one content repository in one workspace.
pub struct GitService {
    workspace: PathBuf,
    repo: GitInfo,
    author: GitAuthor,
    opener: Arc<dyn RepoOpener>,
    git: Arc<dyn GitCommands>,
}

impl GitService {
    pub fn new(
        workspace: impl Into<PathBuf>,
        repo: GitInfo,
        author: GitAuthor,
        opener: Arc<dyn RepoOpener>,
    ) -> Self {
        let workspace = workspace.into();
        let git = opener.open(&workspace);
        Self {
            workspace,
            repo,
            author,
            opener,
            git,
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn repository(&self) -> &GitInfo {
        &self.repo
    }

    /// Wipe the workspace and start a fresh repository on the target branch.
    pub async fn create_repository(&self) -> Result<()> {
        info!(
            workspace = %self.workspace.display(),
            branch = %self.repo.branch,
            "Creating repository"
        );

        if self.workspace.exists() {
            debug!("Removing stale workspace {:?}", self.workspace);
            tokio::fs::remove_dir_all(&self.workspace).await?;
        }
        tokio::fs::create_dir_all(&self.workspace).await?;

        self.git.init(Some(&self.repo.branch)).await
    }

    /// Bring the workspace up to date with the remote branch.
    pub async fn fetch_repository(&self) -> Result<()> {
        info!(
            workspace = %self.workspace.display(),
            repo = %self.repo.repo,
            branch = %self.repo.branch,
            "Fetching repository"
        );

        let auth = self.auth_for(&self.repo)?;
        let url = self.remote_url(&self.repo)?;

        tokio::fs::create_dir_all(&self.workspace).await?;
        self.git.init(None).await?;
        reset_remote(self.git.as_ref(), &url).await?;

        let refspecs = vec![format!(
            "+refs/heads/{branch}:refs/remotes/{remote}/{branch}",
            branch = self.repo.branch,
            remote = REMOTE_NAME
        )];
        let git = self.git.as_ref();
        auth.scoped(git, || git.fetch(REMOTE_NAME, &refspecs))
            .await?;

        self.git.checkout(&self.repo.branch).await
    }

    /// Stage everything and commit.
    ///
    /// Returns `false` when there was nothing to commit and `allow_empty` was
    /// not set, in which case no commit is made.
    pub async fn commit_all_changes(&self, message: &str, allow_empty: bool) -> Result<bool> {
        commit_all(self.git.as_ref(), message, &self.author, allow_empty).await
    }

    /// Push the content branch to `origin`.
    pub async fn push_to_remote(&self, force: bool) -> Result<()> {
        info!(
            repo = %self.repo.repo,
            branch = %self.repo.branch,
            force,
            "Pushing to remote"
        );

        let auth = self.auth_for(&self.repo)?;
        let url = self.remote_url(&self.repo)?;
        reset_remote(self.git.as_ref(), &url).await?;

        let git = self.git.as_ref();
        let branch = self.repo.branch.as_str();
        auth.scoped(git, || git.push(REMOTE_NAME, branch, force))
            .await
    }

    /// Publish a generated output directory to the publisher repository.
    ///
    /// The directory is treated as its own repository. Any previous history
    /// in it is discarded and the publisher branch is force-pushed.
    pub async fn publish_to_pages(&self, output_dir: &Path, publisher: &GitInfo) -> Result<()> {
        info!(
            output = %output_dir.display(),
            repo = %publisher.repo,
            branch = %publisher.branch,
            "Publishing generated site"
        );

        let auth = self.auth_for(publisher)?;
        let url = self.remote_url(publisher)?;

        if !output_dir.is_dir() {
            return Err(VcsError::PathNotFound(output_dir.display().to_string()));
        }

        let stale_git_dir = output_dir.join(".git");
        if stale_git_dir.exists() {
            tokio::fs::remove_dir_all(&stale_git_dir).await?;
        }

        let pages = self.opener.open(output_dir);
        pages.init(Some(&publisher.branch)).await?;

        let message = format!("Publish site {}", timestamp());
        commit_all(pages.as_ref(), &message, &self.author, true).await?;
        reset_remote(pages.as_ref(), &url).await?;

        let git = pages.as_ref();
        let branch = publisher.branch.as_str();
        auth.scoped(git, || git.push(REMOTE_NAME, branch, true))
            .await
    }

    fn auth_for(&self, info: &GitInfo) -> Result<GitAuth> {
        let provider = provider_for(&info.service)?;
        Ok(GitAuth::new(provider.as_ref(), &info.owner, &info.token))
    }

    fn remote_url(&self, info: &GitInfo) -> Result<String> {
        info.validate()
            .map_err(|e| VcsError::InvalidRepository(e.to_string()))?;
        let provider = provider_for(&info.service)?;
        Ok(provider.remote_url(&info.owner, &info.repo))
    }
}

/// Timestamp suffix used in commit messages.
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn reset_remote(git: &dyn GitCommands, url: &str) -> Result<()> {
    let remotes = git.remote_show().await?;
    if remotes.iter().any(|name| name == REMOTE_NAME) {
        git.remote_remove(REMOTE_NAME).await?;
    }
    git.remote_add(REMOTE_NAME, url).await
}

async fn commit_all(
    git: &dyn GitCommands,
    message: &str,
    author: &GitAuthor,
    allow_empty: bool,
) -> Result<bool> {
    git.add_all().await?;

    if !allow_empty && !git.has_changes().await? {
        info!(path = %git.path().display(), "Nothing to commit");
        return Ok(false);
    }

    info!(path = %git.path().display(), commit_message = %message, "Committing changes");
    git.commit(message, author, allow_empty).await?;
    Ok(true)
}
