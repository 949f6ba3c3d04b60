use thiserror::Error;

/// Failure of a single storage tier for a single logical operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Database(sqlx::Error::RowNotFound) => true,
            _ => false,
        }
    }
}

/// Both tiers rejected the same logical operation.
///
/// Carries both underlying causes; neither is discarded.
#[derive(Debug, Error)]
#[error("primary: {primary}, secondary: {secondary}")]
pub struct DualStorageError {
    pub primary: StorageError,
    pub secondary: StorageError,
}

impl DualStorageError {
    pub fn new(primary: StorageError, secondary: StorageError) -> Self {
        Self { primary, secondary }
    }

    pub fn primary(&self) -> &StorageError {
        &self.primary
    }

    pub fn secondary(&self) -> &StorageError {
        &self.secondary
    }

    /// True when neither tier holds the requested entity.
    pub fn is_not_found(&self) -> bool {
        self.primary.is_not_found() && self.secondary.is_not_found()
    }
}
