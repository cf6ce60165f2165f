pub mod context;
pub mod factory;
pub mod ops;

pub use context::TaskContext;
pub use factory::{DefaultServiceFactory, ServiceFactory, TaskServices};
pub use ops::{GitOps, SiteOps};
