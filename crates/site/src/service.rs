use futures::future::join_all;
use press_core::{Post, PostAction, SiteTask};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::{
    self, default_generator_config, installation_config_path, site_layer, space_layer,
    ConfigLayer, LayerSource,
};
use crate::error::{Result, SiteError};
use crate::generator::{Generator, GeneratorPost, Layout};
use crate::post::{generator_post_titled, slug_conflicts, to_generator_post, PostOutcome};
use crate::workspace::{self, LinkOutcome};

const MAIN_CONFIG: &str = "_config.yml";
const SPACE_CONFIG: &str = "_space.yml";
const NOJEKYLL: &str = ".nojekyll";
const CNAME: &str = "CNAME";

/// Directories one site task works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub workspace: PathBuf,
    pub generator_dir: PathBuf,
    pub template_dir: PathBuf,
}

impl SitePaths {
    pub fn new(
        workspace: impl Into<PathBuf>,
        generator_dir: impl Into<PathBuf>,
        template_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            generator_dir: generator_dir.into(),
            template_dir: template_dir.into(),
        }
    }

    pub fn main_config(&self) -> PathBuf {
        self.workspace.join(MAIN_CONFIG)
    }

    pub fn theme_config(&self, theme: &str) -> PathBuf {
        self.workspace.join(theme_config_name(theme))
    }

    pub fn space_config(&self) -> PathBuf {
        self.workspace.join(SPACE_CONFIG)
    }

    pub fn public_dir(&self) -> PathBuf {
        self.generator_dir.join("public")
    }
}

fn theme_config_name(theme: &str) -> String {
    format!("_config.{}.yml", theme)
}

/// Site-generation orchestrator for one workspace.
pub struct SiteService {
    paths: SitePaths,
    generator: Arc<dyn Generator>,
}

impl SiteService {
    pub fn new(paths: SitePaths, generator: Arc<dyn Generator>) -> Self {
        Self { paths, generator }
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    pub fn public_dir(&self) -> PathBuf {
        self.paths.public_dir()
    }

    /// Scaffold the workspace and write its generator, theme and space configs.
    pub async fn prepare_workspace(&self, task: &SiteTask) -> Result<()> {
        info!(workspace = %self.paths.workspace.display(), "Preparing site workspace");

        for layout in [Layout::Post, Layout::Draft] {
            fs::create_dir_all(self.paths.workspace.join("source").join(layout.dir_name()))
                .await?;
        }

        self.write_main_config(task).await?;
        if !task.theme.name.trim().is_empty() {
            self.write_theme_config(task.theme.name.trim()).await?;
        }
        self.write_space_config(task).await?;

        debug!(workspace = %self.paths.workspace.display(), "Site workspace ready");
        Ok(())
    }

    async fn write_main_config(&self, task: &SiteTask) -> Result<()> {
        let installation = installation_config_path(&self.paths.generator_dir);
        let layers = [
            ConfigLayer::new(LayerSource::Default, default_generator_config()),
            ConfigLayer::from_file(LayerSource::Generator, &installation).await,
            ConfigLayer::from_file(LayerSource::Template, &self.paths.template_dir.join(MAIN_CONFIG))
                .await,
            ConfigLayer::from_file(LayerSource::Workspace, &self.paths.main_config()).await,
            ConfigLayer::new(LayerSource::Task, site_layer(task)),
        ];
        config::write_config(&self.paths.main_config(), &config::merge(&layers)).await
    }

    async fn write_theme_config(&self, theme: &str) -> Result<()> {
        let target = self.paths.theme_config(theme);
        let layers = [
            ConfigLayer::from_file(
                LayerSource::Template,
                &self.paths.template_dir.join(theme_config_name(theme)),
            )
            .await,
            ConfigLayer::from_file(LayerSource::Workspace, &target).await,
        ];
        config::write_config(&target, &config::merge(&layers)).await
    }

    async fn write_space_config(&self, task: &SiteTask) -> Result<()> {
        let target = self.paths.space_config();
        let layers = [
            ConfigLayer::from_file(LayerSource::Workspace, &target).await,
            ConfigLayer::new(LayerSource::Task, space_layer(task)),
        ];
        config::write_config(&target, &config::merge(&layers)).await
    }

    /// Link the workspace configs and `source/` into the generator directory.
    pub async fn symlink_workspace_and_files(&self) -> Result<Vec<LinkOutcome>> {
        fs::create_dir_all(self.paths.workspace.join("source")).await?;
        let outcomes =
            workspace::link_workspace(&self.paths.workspace, &self.paths.generator_dir).await?;
        info!(
            links = outcomes.len(),
            generator_dir = %self.paths.generator_dir.display(),
            "Workspace linked into generator"
        );
        Ok(outcomes)
    }

    /// Apply `action` to every post concurrently. One post failing never
    /// stops the others; each outcome carries its own result.
    ///
    /// A post whose file name is already claimed by an earlier post of the
    /// batch fails without touching the generator.
    pub async fn apply_posts(&self, action: PostAction, posts: &[Post]) -> Vec<PostOutcome> {
        let conflicts = slug_conflicts(posts);
        let outcomes = join_all(posts.iter().zip(conflicts).map(|(post, conflict)| async move {
            let result = match conflict {
                Some(e) => Err(e),
                None => self.apply_post(action, post).await,
            };
            match result {
                Ok(path) => PostOutcome::succeeded(&post.title, path),
                Err(e) => {
                    warn!(title = %post.title, %action, error = %e, "Post operation failed");
                    PostOutcome::failed(&post.title, e.to_string())
                }
            }
        }))
        .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        let summary = (failed > 0).then(|| format!("{} of {} posts failed", failed, outcomes.len()));
        if let Err(e) = self.generator.exit(summary.as_deref()).await {
            warn!(error = %e, "Generator exit failed");
        }

        outcomes
    }

    pub async fn create_posts(&self, posts: &[Post]) -> Vec<PostOutcome> {
        self.apply_posts(PostAction::Create, posts).await
    }

    pub async fn update_posts(&self, posts: &[Post]) -> Vec<PostOutcome> {
        self.apply_posts(PostAction::Update, posts).await
    }

    pub async fn delete_posts(&self, posts: &[Post]) -> Vec<PostOutcome> {
        self.apply_posts(PostAction::Delete, posts).await
    }

    pub async fn publish_posts(&self, posts: &[Post]) -> Vec<PostOutcome> {
        self.apply_posts(PostAction::Publish, posts).await
    }

    pub async fn conceal_posts(&self, posts: &[Post]) -> Vec<PostOutcome> {
        self.apply_posts(PostAction::Conceal, posts).await
    }

    async fn apply_post(&self, action: PostAction, post: &Post) -> Result<PathBuf> {
        let generated = to_generator_post(post)?;

        let rename = post.rename_source().filter(|_| action != PostAction::Delete);
        if let Some(old_title) = rename {
            self.remove_renamed(post, old_title).await?;
        }

        match action {
            PostAction::Create => self.generator.create(&generated, Layout::Post, false).await,
            PostAction::Update => self.generator.create(&generated, Layout::Post, true).await,
            PostAction::Delete => match self.remove_from_all_layouts(&generated).await {
                Err(SiteError::PostNotFound(path)) => {
                    warn!(title = %post.title, "Post already absent");
                    Ok(path)
                }
                other => other,
            },
            PostAction::Publish => self.generator.publish(&generated, true).await,
            PostAction::Conceal => self.generator.conceal(&generated).await,
        }
    }

    /// Remove the post from `_posts` and `_drafts`. `PostNotFound` only when
    /// neither held it.
    async fn remove_from_all_layouts(&self, post: &GeneratorPost) -> Result<PathBuf> {
        let mut removed = None;
        let mut missing = None;
        for layout in [Layout::Post, Layout::Draft] {
            match self.generator.remove(post, layout).await {
                Ok(path) => {
                    removed.get_or_insert(path);
                }
                Err(SiteError::PostNotFound(path)) => {
                    missing.get_or_insert(path);
                }
                Err(e) => return Err(e),
            }
        }
        removed.ok_or_else(|| {
            SiteError::PostNotFound(missing.unwrap_or_else(|| PathBuf::from(post.file_name())))
        })
    }

    async fn remove_renamed(&self, post: &Post, old_title: &str) -> Result<()> {
        let old = generator_post_titled(post, old_title)?;
        match self.remove_from_all_layouts(&old).await {
            Ok(path) => {
                debug!(from = %old_title, to = %post.title, path = %path.display(), "Removed renamed post");
                Ok(())
            }
            Err(SiteError::PostNotFound(_)) => {
                warn!(from = %old_title, to = %post.title, "Renamed post had no file under its old title");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Run the generator's build step.
    pub async fn build_static_files(&self) -> Result<()> {
        let result = self.generator.generate().await;
        let error = result.as_ref().err().map(ToString::to_string);
        if let Err(e) = self.generator.exit(error.as_deref()).await {
            warn!(error = %e, "Generator exit failed");
        }
        result
    }

    /// Write `.nojekyll` and, with a domain, `CNAME` into the public
    /// directory. Existing files are left untouched. Returns the files written.
    pub async fn write_marker_files(&self, domain: Option<&str>) -> Result<Vec<PathBuf>> {
        let public = self.public_dir();
        fs::create_dir_all(&public).await?;

        let mut written = Vec::new();
        let nojekyll = public.join(NOJEKYLL);
        if write_if_absent(&nojekyll, "").await? {
            written.push(nojekyll);
        }

        if let Some(domain) = domain.map(str::trim).filter(|d| !d.is_empty()) {
            let cname = public.join(CNAME);
            if write_if_absent(&cname, &format!("{}\n", domain)).await? {
                written.push(cname);
            }
        }

        Ok(written)
    }

    /// Build the site, then write its marker files.
    pub async fn generate_static_files(&self, domain: Option<&str>) -> Result<Vec<PathBuf>> {
        self.build_static_files().await?;
        self.write_marker_files(domain).await
    }
}

async fn write_if_absent(path: &Path, content: &str) -> Result<bool> {
    use tokio::io::AsyncWriteExt;

    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await;

    match file {
        Ok(mut file) => {
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            debug!(path = %path.display(), "Marker file written");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Marker file already present");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
