pub mod identity;
pub mod repository;

pub use identity::{
    hash_password, verify_password, Address, GoogleIdentity, GoogleVerifier, Role,
    StaticGoogleVerifier, User, UserProfile,
};
pub use repository::{BookingFilter, BookingRepository, PackageRepository, UserRepository};

use tourdesk_catalog::CatalogError;
use tourdesk_order::OrderError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Identity verification failed: {0}")]
    IdentityError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl From<CatalogError> for CoreError {
    fn from(err: CatalogError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

impl From<OrderError> for CoreError {
    fn from(err: OrderError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
