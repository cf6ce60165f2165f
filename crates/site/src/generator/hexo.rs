use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{Generator, GeneratorPost, Layout};
use crate::error::{Result, SiteError};

/// Hexo-style generator rooted at an installation directory.
///
/// Posts are written under `<base_dir>/source`, which the worker links to
/// the active workspace. Site rendering shells out to `command`.
#[derive(Debug, Clone)]
pub struct HexoGenerator {
    base_dir: PathBuf,
    command: Vec<String>,
}

impl HexoGenerator {
    pub fn new(base_dir: impl Into<PathBuf>, command: Vec<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            command,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, post: &GeneratorPost, layout: Layout) -> PathBuf {
        self.base_dir
            .join("source")
            .join(layout.dir_name())
            .join(post.file_name())
    }

    async fn write_post(&self, post: &GeneratorPost, path: &Path, replace: bool) -> Result<()> {
        let rendered = post.render()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        if replace {
            fs::write(path, rendered).await?;
            return Ok(());
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(SiteError::PostExists(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(rendered.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn remove_if_present(path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Generator for HexoGenerator {
    async fn create(&self, post: &GeneratorPost, layout: Layout, replace: bool) -> Result<PathBuf> {
        let path = self.path_for(post, layout);
        self.write_post(post, &path, replace).await?;
        debug!(path = %path.display(), replace, "Post written");
        Ok(path)
    }

    async fn publish(&self, post: &GeneratorPost, replace: bool) -> Result<PathBuf> {
        let path = self.path_for(post, Layout::Post);
        self.write_post(post, &path, replace).await?;

        if Self::remove_if_present(&self.path_for(post, Layout::Draft)).await? {
            debug!(slug = %post.slug, "Draft promoted");
        }
        Ok(path)
    }

    async fn conceal(&self, post: &GeneratorPost) -> Result<PathBuf> {
        let path = self.path_for(post, Layout::Draft);
        self.write_post(post, &path, true).await?;

        if Self::remove_if_present(&self.path_for(post, Layout::Post)).await? {
            debug!(slug = %post.slug, "Post moved to drafts");
        }
        Ok(path)
    }

    async fn remove(&self, post: &GeneratorPost, layout: Layout) -> Result<PathBuf> {
        let path = self.path_for(post, layout);
        if !Self::remove_if_present(&path).await? {
            return Err(SiteError::PostNotFound(path));
        }
        debug!(path = %path.display(), "Post removed");
        Ok(path)
    }

    async fn generate(&self) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| SiteError::CommandFailed("generator command is empty".to_string()))?;

        info!(command = ?self.command, dir = %self.base_dir.display(), "Generating static files");

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.base_dir)
            .output()
            .await
            .map_err(|e| SiteError::CommandFailed(format!("{}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SiteError::CommandFailed(format!(
                "{} exited with {}: {}",
                self.command.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn exit(&self, error: Option<&str>) -> Result<()> {
        match error {
            Some(error) => warn!(error = %error, "Generator session ended with error"),
            None => debug!("Generator session ended"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::to_generator_post;
    use press_core::Post;
    use tempfile::TempDir;

    fn post(title: &str) -> GeneratorPost {
        to_generator_post(&Post::new(title).with_source("body")).unwrap()
    }

    fn generator(dir: &TempDir) -> HexoGenerator {
        HexoGenerator::new(dir.path(), vec!["true".to_string()])
    }

    #[tokio::test]
    async fn test_create_respects_replace() {
        let dir = TempDir::new().unwrap();
        let hexo = generator(&dir);
        let post = post("Hello");

        let path = hexo.create(&post, Layout::Post, false).await.unwrap();
        assert_eq!(path, dir.path().join("source/_posts/Hello.md"));

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.starts_with("---\ntitle: Hello\n"));
        assert!(content.ends_with("body\n"));

        let err = hexo.create(&post, Layout::Post, false).await.unwrap_err();
        assert!(matches!(err, SiteError::PostExists(_)));

        hexo.create(&post, Layout::Post, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_creates_of_one_file_admit_one() {
        let dir = TempDir::new().unwrap();
        let hexo = generator(&dir);
        let first = post("Hello World");
        let second = post("Hello, World!");
        assert_eq!(first.file_name(), second.file_name());

        let (a, b) = tokio::join!(
            hexo.create(&first, Layout::Post, false),
            hexo.create(&second, Layout::Post, false)
        );
        let created = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(created, 1);
        assert!(matches!(
            a.err().or(b.err()),
            Some(SiteError::PostExists(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_and_conceal_move_files() {
        let dir = TempDir::new().unwrap();
        let hexo = generator(&dir);
        let post = post("Draft");

        hexo.create(&post, Layout::Draft, false).await.unwrap();
        let published = hexo.publish(&post, false).await.unwrap();
        assert!(published.exists());
        assert!(!dir.path().join("source/_drafts/Draft.md").exists());

        let concealed = hexo.conceal(&post).await.unwrap();
        assert!(concealed.exists());
        assert!(!published.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_post() {
        let dir = TempDir::new().unwrap();
        let err = generator(&dir)
            .remove(&post("Ghost"), Layout::Post)
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::PostNotFound(_)));
    }

    #[tokio::test]
    async fn test_generate_reports_failure() {
        let dir = TempDir::new().unwrap();
        let ok = HexoGenerator::new(dir.path(), vec!["true".to_string()]);
        ok.generate().await.unwrap();

        let failing = HexoGenerator::new(dir.path(), vec!["false".to_string()]);
        assert!(matches!(
            failing.generate().await.unwrap_err(),
            SiteError::CommandFailed(_)
        ));

        let empty = HexoGenerator::new(dir.path(), Vec::new());
        assert!(empty.generate().await.is_err());
    }
}
