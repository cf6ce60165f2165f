//! The orchestrator calls a pipeline step may make.

use async_trait::async_trait;
use press_core::{GitInfo, Post, PostAction, SiteTask};
use site::{PostOutcome, SiteService};
use std::path::{Path, PathBuf};
use vcs::GitService;

#[async_trait]
pub trait GitOps: Send + Sync {
    async fn create_repository(&self) -> vcs::Result<()>;

    async fn fetch_repository(&self) -> vcs::Result<()>;

    async fn commit_all_changes(&self, message: &str, allow_empty: bool) -> vcs::Result<bool>;

    async fn push_to_remote(&self, force: bool) -> vcs::Result<()>;

    async fn publish_to_pages(&self, output_dir: &Path, publisher: &GitInfo) -> vcs::Result<()>;
}

#[async_trait]
pub trait SiteOps: Send + Sync {
    async fn prepare_workspace(&self, task: &SiteTask) -> site::Result<()>;

    async fn symlink_workspace_and_files(&self) -> site::Result<()>;

    /// Never fails as a whole; failures are carried per post.
    async fn apply_posts(&self, action: PostAction, posts: &[Post]) -> Vec<PostOutcome>;

    async fn build_static_files(&self) -> site::Result<()>;

    async fn write_marker_files(&self, domain: Option<&str>) -> site::Result<()>;

    fn public_dir(&self) -> PathBuf;
}

#[async_trait]
impl GitOps for GitService {
    async fn create_repository(&self) -> vcs::Result<()> {
        GitService::create_repository(self).await
    }

    async fn fetch_repository(&self) -> vcs::Result<()> {
        GitService::fetch_repository(self).await
    }

    async fn commit_all_changes(&self, message: &str, allow_empty: bool) -> vcs::Result<bool> {
        GitService::commit_all_changes(self, message, allow_empty).await
    }

    async fn push_to_remote(&self, force: bool) -> vcs::Result<()> {
        GitService::push_to_remote(self, force).await
    }

    async fn publish_to_pages(&self, output_dir: &Path, publisher: &GitInfo) -> vcs::Result<()> {
        GitService::publish_to_pages(self, output_dir, publisher).await
    }
}

#[async_trait]
impl SiteOps for SiteService {
    async fn prepare_workspace(&self, task: &SiteTask) -> site::Result<()> {
        SiteService::prepare_workspace(self, task).await
    }

    async fn symlink_workspace_and_files(&self) -> site::Result<()> {
        SiteService::symlink_workspace_and_files(self).await?;
        Ok(())
    }

    async fn apply_posts(&self, action: PostAction, posts: &[Post]) -> Vec<PostOutcome> {
        SiteService::apply_posts(self, action, posts).await
    }

    async fn build_static_files(&self) -> site::Result<()> {
        SiteService::build_static_files(self).await
    }

    async fn write_marker_files(&self, domain: Option<&str>) -> site::Result<()> {
        SiteService::write_marker_files(self, domain).await?;
        Ok(())
    }

    fn public_dir(&self) -> PathBuf {
        SiteService::public_dir(self)
    }
}
