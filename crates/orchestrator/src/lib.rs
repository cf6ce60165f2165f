pub mod allow_list;
pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod resources;
pub mod services;

pub use allow_list::AllowList;
pub use dispatcher::{TaskDispatcher, TaskReport};
pub use error::{OrchestratorError, Result};
pub use pipeline::{CommitKind, Step};
pub use services::{
    DefaultServiceFactory, GitOps, ServiceFactory, SiteOps, TaskContext, TaskServices,
};
