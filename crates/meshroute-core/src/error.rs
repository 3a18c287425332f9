/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("message validation failed: {0}")]
    ValidationError(String),

    #[error("envelope serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("invalid routing configuration: {0}")]
    InvalidConfig(String),
}
