//! Scoped git credentials.
//!
//! Credentials are injected as an `http.extraheader` entry in the repository's
//! local config right before a network operation and removed right after it,
//! whether the operation succeeded or not. Nothing token-bearing ends up in
//! the remote URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::future::Future;
use tracing::{debug, error};

use crate::error::{Result, VcsError};
use crate::remote::GitProvider;
use crate::traits::GitCommands;

/// Config key holding the injected authorization header.
pub const AUTH_CONFIG_KEY: &str = "http.extraheader";

/// Basic-auth credentials for one repository.
pub struct GitAuth {
    header: Option<String>,
}

impl GitAuth {
    /// Build credentials for `owner` on `provider`. An empty token yields
    /// anonymous access.
    pub fn new(provider: &dyn GitProvider, owner: &str, token: &str) -> Self {
        if token.is_empty() {
            return Self::anonymous();
        }

        let username = provider.auth_username(owner);
        let encoded = STANDARD.encode(format!("{}:{}", username, token));
        Self {
            header: Some(format!("AUTHORIZATION: basic {}", encoded)),
        }
    }

    pub fn anonymous() -> Self {
        Self { header: None }
    }

    pub fn is_anonymous(&self) -> bool {
        self.header.is_none()
    }

    pub async fn configure_auth(&self, git: &dyn GitCommands) -> Result<()> {
        if let Some(header) = &self.header {
            debug!(path = %git.path().display(), "Configuring git credentials");
            git.config_set(AUTH_CONFIG_KEY, header).await?;
        }
        Ok(())
    }

    pub async fn remove_auth(&self, git: &dyn GitCommands) -> Result<()> {
        debug!(path = %git.path().display(), "Removing git credentials");
        git.config_unset(AUTH_CONFIG_KEY).await
    }

    /// Run `op` with credentials configured on `git`.
    ///
    /// The credentials are removed before this returns on every path. When
    /// both the operation and the cleanup fail the operation's error wins and
    /// the cleanup failure is logged.
    pub async fn scoped<T, F, Fut>(&self, git: &dyn GitCommands, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let result = match self.configure_auth(git).await {
            Ok(()) => op().await,
            Err(e) => Err(e),
        };

        let cleanup = self.remove_auth(git).await;

        match (result, cleanup) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(VcsError::CredentialCleanup(e.to_string())),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                error!(
                    error = %cleanup_err,
                    path = %git.path().display(),
                    "Failed to remove git credentials after failed operation"
                );
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for GitAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitAuth")
            .field("anonymous", &self.is_anonymous())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitCli;
    use crate::remote::{GitHubProvider, GiteeProvider};
    use tempfile::TempDir;

    #[test]
    fn test_header_encoding() {
        let auth = GitAuth::new(&GitHubProvider, "alice", "tok");
        let expected = STANDARD.encode("x-access-token:tok");
        assert_eq!(
            auth.header.as_deref(),
            Some(format!("AUTHORIZATION: basic {}", expected).as_str())
        );

        let auth = GitAuth::new(&GiteeProvider, "bob", "tok");
        let expected = STANDARD.encode("bob:tok");
        assert!(auth.header.unwrap().ends_with(&expected));
    }

    #[test]
    fn test_empty_token_is_anonymous() {
        let auth = GitAuth::new(&GitHubProvider, "alice", "");
        assert!(auth.is_anonymous());
        assert!(!format!("{:?}", auth).contains("basic"));
    }

    #[tokio::test]
    async fn test_scoped_removes_credentials_on_failure() {
        if !GitCli::is_available().await {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = GitCli::new(dir.path());
        git.init(None).await.unwrap();

        let auth = GitAuth::new(&GitHubProvider, "alice", "tok");
        let result: Result<()> = auth
            .scoped(&git, || async {
                assert!(git.config_get(AUTH_CONFIG_KEY).await?.is_some());
                Err(VcsError::CommandFailed("network down".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(git.config_get(AUTH_CONFIG_KEY).await.unwrap().is_none());
    }
}
