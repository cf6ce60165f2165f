pub mod config;
pub mod error;
pub mod generator;
pub mod post;
pub mod service;
pub mod workspace;

pub use config::{merge, ConfigLayer, LayerSource};
pub use error::{Result, SiteError};
pub use generator::{Generator, GeneratorPost, HexoGenerator, Layout};
pub use post::{to_generator_post, PostOutcome};
pub use service::{SitePaths, SiteService};
pub use workspace::LinkOutcome;
