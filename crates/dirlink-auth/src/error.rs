//! Directory error types

use std::time::Duration;
use thiserror::Error;

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Faults talking to the directory. Never used for "no such user" or
/// "wrong password", which are ordinary outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Failed to connect to directory: {0}")]
    Connect(String),

    #[error("Directory protocol error: {0}")]
    Protocol(String),

    #[error("Service account bind rejected with code {0}")]
    ServiceBind(u32),

    #[error("Directory did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Directory operation ended without a result")]
    Abandoned,
}

impl From<ldap3::LdapError> for DirectoryError {
    fn from(err: ldap3::LdapError) -> Self {
        DirectoryError::Protocol(err.to_string())
    }
}
