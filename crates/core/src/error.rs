use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid member reference: {0}")]
    InvalidMemberRef(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
