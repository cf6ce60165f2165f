//! Remote URL derivation per hosting service

use press_core::{GitInfo, GitServiceType};

use crate::error::{Result, VcsError};

/// A git hosting service the worker knows how to talk to.
pub trait GitProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn host(&self) -> &'static str;

    /// HTTPS fetch/push URL for `owner/repo`.
    fn remote_url(&self, owner: &str, repo: &str) -> String {
        format!("https://{}/{}/{}.git", self.host(), owner, repo)
    }

    /// Username paired with the access token for basic auth.
    fn auth_username(&self, owner: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubProvider;

impl GitProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn host(&self) -> &'static str {
        "github.com"
    }

    fn auth_username(&self, _owner: &str) -> String {
        "x-access-token".to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GiteeProvider;

impl GitProvider for GiteeProvider {
    fn name(&self) -> &'static str {
        "gitee"
    }

    fn host(&self) -> &'static str {
        "gitee.com"
    }

    // Gitee takes the account name with the personal access token as password
    fn auth_username(&self, owner: &str) -> String {
        owner.to_string()
    }
}

pub fn provider_for(service: &GitServiceType) -> Result<Box<dyn GitProvider>> {
    match service {
        GitServiceType::GitHub => Ok(Box::new(GitHubProvider)),
        GitServiceType::Gitee => Ok(Box::new(GiteeProvider)),
        GitServiceType::Other(name) => Err(VcsError::UnsupportedService(name.clone())),
    }
}

/// Remote URL for a repository descriptor.
pub fn remote_url(info: &GitInfo) -> Result<String> {
    let provider = provider_for(&info.service)?;
    Ok(provider.remote_url(&info.owner, &info.repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_url() {
        let info = GitInfo::new(GitServiceType::GitHub, "alice", "blog", "main");
        assert_eq!(remote_url(&info).unwrap(), "https://github.com/alice/blog.git");
    }

    #[test]
    fn test_gitee_url() {
        let info = GitInfo::new(GitServiceType::Gitee, "bob", "notes", "master");
        assert_eq!(remote_url(&info).unwrap(), "https://gitee.com/bob/notes.git");
    }

    #[test]
    fn test_unsupported_service() {
        let info = GitInfo::new(
            GitServiceType::Other("svn-hub".to_string()),
            "carol",
            "site",
            "main",
        );
        let err = remote_url(&info).unwrap_err();
        assert!(matches!(err, VcsError::UnsupportedService(ref name) if name == "svn-hub"));
        assert!(err.is_configuration());
    }
}
