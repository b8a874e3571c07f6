use thiserror::Error;

use crate::post::PostId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("post {0} not found")]
    NotFound(PostId),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<r2d2::Error> for StoreError {
    fn from(value: r2d2::Error) -> Self {
        StoreError::StorageUnavailable(value.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::StorageUnavailable(value.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CsrfError {
    #[error("The CSRF token is missing.")]
    Missing,
    #[error("The CSRF token is invalid.")]
    Invalid,
    #[error("The CSRF token has expired.")]
    Expired,
}
