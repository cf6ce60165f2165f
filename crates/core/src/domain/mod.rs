pub mod post;
pub mod repo;
pub mod site;
pub mod task;
