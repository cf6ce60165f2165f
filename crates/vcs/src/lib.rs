pub mod auth;
pub mod error;
pub mod git;
pub mod remote;
pub mod service;
pub mod traits;

pub use auth::GitAuth;
pub use error::{Result, VcsError};
pub use git::{GitCli, GitCliOpener};
pub use remote::{provider_for, remote_url, GitHubProvider, GitProvider, GiteeProvider};
pub use service::{timestamp, GitService};
pub use traits::{GitCommands, RepoOpener};
