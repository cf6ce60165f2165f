pub mod config;
pub mod domain;
pub mod error;

pub use config::{BackendSettings, EntryMode, GitAuthor, WorkerConfig};
pub use domain::post::{OneOrMany, Post};
pub use domain::repo::{GitInfo, GitServiceType};
pub use domain::site::{SiteMeta, ThemeRef, UserInfo};
pub use domain::task::{
    PostAction, PostTask, PublishTask, SiteTask, TaskDescriptor, TaskKind, TaskMethod,
};
pub use error::CoreError;
