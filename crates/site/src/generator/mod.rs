//! Static site generator seam.

mod hexo;

pub use hexo::HexoGenerator;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;
use crate::post::FrontMatter;

/// Folder a post lives in under the site source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Post,
    Draft,
}

impl Layout {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Layout::Post => "_posts",
            Layout::Draft => "_drafts",
        }
    }
}

/// A post as written to disk by the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorPost {
    pub slug: String,
    pub front_matter: FrontMatter,
    pub content: String,
}

impl GeneratorPost {
    pub fn file_name(&self) -> String {
        format!("{}.md", self.slug)
    }

    /// Markdown file content: YAML front matter followed by the body.
    pub fn render(&self) -> Result<String> {
        let front_matter = serde_yaml::to_string(&self.front_matter)?;
        Ok(format!("---\n{}---\n\n{}\n", front_matter, self.content.trim_end()))
    }
}

/// Operations the worker needs from a static site generator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Write a post. Fails if the file exists and `replace` is false.
    async fn create(&self, post: &GeneratorPost, layout: Layout, replace: bool) -> Result<PathBuf>;

    /// Move a post into the published folder.
    async fn publish(&self, post: &GeneratorPost, replace: bool) -> Result<PathBuf>;

    /// Move a post back into drafts.
    async fn conceal(&self, post: &GeneratorPost) -> Result<PathBuf>;

    async fn remove(&self, post: &GeneratorPost, layout: Layout) -> Result<PathBuf>;

    /// Render the site into its public directory.
    async fn generate(&self) -> Result<()>;

    /// Release generator resources after a batch, noting the error that ended
    /// it if any.
    async fn exit(&self, error: Option<&str>) -> Result<()>;
}
