//! Linking a task workspace into the shared generator installation.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::Result;

pub const BACKUP_SUFFIX: &str = ".bak";

/// What happened at one link destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub link: PathBuf,
    pub target: PathBuf,
    /// Where a pre-existing real file was moved to
    pub backup: Option<PathBuf>,
}

/// Workspace entries that must be visible from the generator directory:
/// `_config.yml`, every theme config, `_space.yml` and `source/`.
pub async fn linkable_entries(workspace: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = fs::read_dir(workspace).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_config = name == "_config.yml"
            || name == "_space.yml"
            || (name.starts_with("_config.") && name.ends_with(".yml"));
        if is_config || name == "source" {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

async fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .await
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

async fn remove_any(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).await?;
    if meta.is_dir() {
        fs::remove_dir_all(path).await?;
    } else {
        fs::remove_file(path).await?;
    }
    Ok(())
}

/// Point `link` at `target`.
///
/// An existing link is replaced. A real file or directory is first moved to
/// `<link>.bak`, replacing any older backup.
pub async fn link_entry(target: &Path, link: &Path) -> Result<LinkOutcome> {
    let mut backup = None;

    if is_symlink(link).await {
        fs::remove_file(link).await?;
    } else if fs::try_exists(link).await? {
        let backup_to = backup_path(link);
        if fs::symlink_metadata(&backup_to).await.is_ok() {
            remove_any(&backup_to).await?;
        }
        fs::rename(link, &backup_to).await?;
        info!(path = %link.display(), backup = %backup_to.display(), "Backed up generator file");
        backup = Some(backup_to);
    }

    #[cfg(unix)]
    fs::symlink(target, link).await?;
    #[cfg(windows)]
    if target.is_dir() {
        fs::symlink_dir(target, link).await?;
    } else {
        fs::symlink_file(target, link).await?;
    }

    debug!(link = %link.display(), target = %target.display(), "Linked");
    Ok(LinkOutcome {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        backup,
    })
}

/// Link every linkable workspace entry into `generator_dir`.
pub async fn link_workspace(workspace: &Path, generator_dir: &Path) -> Result<Vec<LinkOutcome>> {
    fs::create_dir_all(generator_dir).await?;
    let workspace = fs::canonicalize(workspace).await?;

    let mut outcomes = Vec::new();
    for name in linkable_entries(&workspace).await? {
        let outcome = link_entry(&workspace.join(&name), &generator_dir.join(&name)).await?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
