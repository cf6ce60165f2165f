use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid task descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Unknown entry mode: {0}")]
    UnknownEntryMode(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
