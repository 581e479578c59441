//! Declaration and synthesis error types

use thiserror::Error;

/// Errors raised while synthesizing or persisting a stack declaration.
///
/// Building a stack never fails; these only surface when the declaration is
/// turned into a template or written to disk.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Duplicate construct: {0}")]
    DuplicateConstruct(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Context file error: {0}")]
    ContextError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
