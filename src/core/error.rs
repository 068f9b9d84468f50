use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Entity type '{0}' is not part of the metadata model")]
    EntityTypeNotFound(String),

    #[error("Entity type '{0}' has no declared primary key")]
    PrimaryKeyNotFound(String),

    #[error("Entity type '{0}' is already registered")]
    EntityTypeExists(String),

    #[error("No audit query source registered for entity type '{0}'")]
    QuerySourceNotFound(String),

    #[error("Postponed audit storage for '{0}' was already finalized")]
    AlreadyFinalized(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Audit collaborator error: {0}")]
    External(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, AuditError>;

impl<T> From<std::sync::PoisonError<T>> for AuditError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
