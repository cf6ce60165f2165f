use site::{HexoGenerator, SitePaths, SiteService};
use std::sync::Arc;
use vcs::{GitCliOpener, GitService};

use super::context::TaskContext;
use super::ops::{GitOps, SiteOps};

/// Services handed to one task's pipeline.
#[derive(Clone)]
pub struct TaskServices {
    pub git: Arc<dyn GitOps>,
    pub site: Arc<dyn SiteOps>,
}

/// Builds the services for a task.
pub trait ServiceFactory: Send + Sync {
    fn build(&self, ctx: &TaskContext) -> TaskServices;
}

/// Real services: the `git` CLI and a Hexo-style generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultServiceFactory;

impl ServiceFactory for DefaultServiceFactory {
    fn build(&self, ctx: &TaskContext) -> TaskServices {
        let git = GitService::new(
            &ctx.workspace,
            ctx.storage.clone(),
            ctx.author.clone(),
            Arc::new(GitCliOpener),
        );

        let generator = HexoGenerator::new(&ctx.generator_dir, ctx.generator_command.clone());
        let site = SiteService::new(
            SitePaths::new(&ctx.workspace, &ctx.generator_dir, &ctx.template_dir),
            Arc::new(generator),
        );

        TaskServices {
            git: Arc::new(git),
            site: Arc::new(site),
        }
    }
}
