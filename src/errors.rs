use serde::Serialize;

/// Crate-wide service error taxonomy.
///
/// Validation failures (`CustomerNotFound`, `ProductNotFound`,
/// `InsufficientStock`, `InvalidInput`) are detected before any write and
/// carry enough detail for the caller to fix the request. Failures inside
/// the atomic write phase surface as `TransactionFailed` with the cause
/// preserved in the message and in logs; partial writes never escape.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// True for errors the caller can fix by adjusting the request;
    /// these never left partial writes behind.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ServiceError::CustomerNotFound(_)
                | ServiceError::ProductNotFound(_)
                | ServiceError::InsufficientStock(_)
                | ServiceError::InvalidInput(_)
                | ServiceError::ValidationError(_)
                | ServiceError::NotFound(_)
        )
    }
}
