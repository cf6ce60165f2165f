use async_trait::async_trait;
use press_core::GitAuthor;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VcsError};
use crate::traits::{GitCommands, RepoOpener};

/// `git config` exits with 5 when unsetting a key that is not set.
const CONFIG_KEY_MISSING: i32 = 5;
/// `git config --get` exits with 1 when the key is not set.
const CONFIG_GET_MISSING: i32 = 1;

/// [`GitCommands`] backed by the `git` executable.
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub async fn is_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn output(&self, args: &[&str]) -> Result<Output> {
        debug!("Running git {:?} in {:?}", redact_args(args), self.repo_path);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;

        Ok(output)
    }

    async fn run_git(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;

        if !output.status.success() {
            return Err(command_failed(args, &output));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn command_failed(args: &[&str], output: &Output) -> VcsError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    VcsError::CommandFailed(format!(
        "git {} failed: {}",
        redact_args(args).join(" "),
        stderr.trim()
    ))
}

/// Hide config values so credentials never reach logs or error messages.
fn redact_args<'a>(args: &[&'a str]) -> Vec<&'a str> {
    match args {
        ["config", "--local", key, _value] => vec!["config", "--local", *key, "[REDACTED]"],
        _ => args.to_vec(),
    }
}

#[async_trait]
impl GitCommands for GitCli {
    fn path(&self) -> &Path {
        &self.repo_path
    }

    async fn init(&self, branch: Option<&str>) -> Result<()> {
        match branch {
            Some(branch) => {
                let flag = format!("--initial-branch={}", branch);
                self.run_git(&["init", flag.as_str()]).await?;
            }
            None => {
                self.run_git(&["init"]).await?;
            }
        }
        Ok(())
    }

    async fn fetch(&self, remote: &str, refspecs: &[String]) -> Result<()> {
        let mut args = vec!["fetch", "--no-tags", remote];
        args.extend(refspecs.iter().map(String::as_str));
        self.run_git(&args).await?;
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> Result<()> {
        let tracking = format!("refs/remotes/origin/{}", branch);
        self.run_git(&["checkout", "--force", "-B", branch, tracking.as_str()])
            .await?;
        Ok(())
    }

    async fn add_all(&self) -> Result<()> {
        self.run_git(&["add", "--all"]).await?;
        Ok(())
    }

    async fn has_changes(&self) -> Result<bool> {
        let status = self.run_git(&["status", "--porcelain"]).await?;
        Ok(!status.trim().is_empty())
    }

    async fn commit(&self, message: &str, author: &GitAuthor, allow_empty: bool) -> Result<()> {
        let name = format!("user.name={}", author.name);
        let email = format!("user.email={}", author.email);
        let signature = format!("--author={}", author.signature());

        let mut args = vec![
            "-c",
            name.as_str(),
            "-c",
            email.as_str(),
            "commit",
            "-m",
            message,
            signature.as_str(),
        ];
        if allow_empty {
            args.push("--allow-empty");
        }

        self.run_git(&args).await?;
        Ok(())
    }

    async fn remote_show(&self) -> Result<Vec<String>> {
        let output = self.run_git(&["remote"]).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn remote_add(&self, name: &str, url: &str) -> Result<()> {
        self.run_git(&["remote", "add", name, url]).await?;
        Ok(())
    }

    async fn remote_remove(&self, name: &str) -> Result<()> {
        self.run_git(&["remote", "remove", name]).await?;
        Ok(())
    }

    async fn push(&self, remote: &str, branch: &str, force: bool) -> Result<()> {
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.extend([remote, branch]);

        self.run_git(&args).await?;
        Ok(())
    }

    async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.run_git(&["config", "--local", key, value]).await?;
        Ok(())
    }

    async fn config_unset(&self, key: &str) -> Result<()> {
        let args = ["config", "--local", "--unset-all", key];
        let output = self.output(&args).await?;

        match output.status.code() {
            Some(0) | Some(CONFIG_KEY_MISSING) => Ok(()),
            _ => Err(command_failed(&args, &output)),
        }
    }

    async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let args = ["config", "--local", "--get", key];
        let output = self.output(&args).await?;

        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            )),
            Some(CONFIG_GET_MISSING) => Ok(None),
            _ => Err(command_failed(&args, &output)),
        }
    }
}

/// Opens [`GitCli`] helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCliOpener;

impl RepoOpener for GitCliOpener {
    fn open(&self, path: &Path) -> Arc<dyn GitCommands> {
        Arc::new(GitCli::new(path))
    }
}
