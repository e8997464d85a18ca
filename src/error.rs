//! Crate-wide error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagManagerError {
    /// The rule configuration itself is malformed. Always fatal: the whole
    /// invocation aborts before any resource is mutated.
    #[error("Invalid rule configuration: {0}")]
    InvalidRule(String),

    /// A resource's tag field could not be read or written. Recorded
    /// against that one resource; never aborts the invocation.
    #[error("Tag field error: {0}")]
    Field(#[from] crate::document::FieldError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

pub type Result<T> = std::result::Result<T, TagManagerError>;
