//! Error types for Dirlink

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Store Errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("The specified user does not exist: {0}")]
    NoSuchUser(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid field path: {0}")]
    InvalidFieldPath(String),

    // Internal Errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "InvalidConfiguration",
            Error::NoSuchUser(_) => "NoSuchUser",
            Error::InvalidDocument(_) => "InvalidDocument",
            Error::InvalidFieldPath(_) => "InvalidFieldPath",
            Error::Database(_)
            | Error::Internal(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Other(_) => "InternalError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidDocument(_) | Error::InvalidFieldPath(_) => 400,
            Error::NoSuchUser(_) => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_internal() {
        let err = Error::Database("disk I/O error".to_string());
        assert_eq!(err.code(), "InternalError");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_missing_user_maps_to_404() {
        let err = Error::NoSuchUser("abc".to_string());
        assert_eq!(err.code(), "NoSuchUser");
        assert_eq!(err.http_status(), 404);
    }
}
