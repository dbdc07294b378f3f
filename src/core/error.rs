use thiserror::Error;

use super::RecordId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Update aborted by hook '{0}'")]
    HookAborted(String),

    #[error("Record {id} not found in table '{table}'")]
    RecordNotFound { table: String, id: RecordId },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StoreError {
    /// True when a lookup by id came back empty.
    ///
    /// A pending record reloaded with `Visibility::ExcludePending` lands here
    /// even though its row exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
