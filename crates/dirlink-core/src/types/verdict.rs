//! Login attempt outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message shown to end users when the account cannot be resolved
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";

/// Message shown to end users when the credential is rejected
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Message shown to end users when the entry lacks its unique key
pub const MISSING_UNIQUE_MESSAGE: &str = "Missing matched unique mapping";

/// Why a login attempt was denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureKind {
    /// The search returned no entry
    UserNotFound,
    /// The directory rejected the password, or the password was empty
    InvalidCredentials,
    /// The authenticated entry has no value for the unique attribute
    MissingUniqueAttribute,
    /// The directory could not be searched
    SearchError(String),
    /// The directory could not be asked to verify the password
    BindError(String),
}

impl FailureKind {
    /// Message safe to show to the end user.
    ///
    /// Directory faults share the message of the failure they would
    /// otherwise be confused with, so availability is not disclosed.
    pub fn public_message(&self) -> &'static str {
        match self {
            FailureKind::UserNotFound | FailureKind::SearchError(_) => USER_NOT_FOUND_MESSAGE,
            FailureKind::InvalidCredentials | FailureKind::BindError(_) => {
                INVALID_CREDENTIALS_MESSAGE
            }
            FailureKind::MissingUniqueAttribute => MISSING_UNIQUE_MESSAGE,
        }
    }

    /// Stable label for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::UserNotFound => "user_not_found",
            FailureKind::InvalidCredentials => "invalid_credentials",
            FailureKind::MissingUniqueAttribute => "missing_unique_attribute",
            FailureKind::SearchError(_) => "search_error",
            FailureKind::BindError(_) => "bind_error",
        }
    }

    /// Whether the failure came from the directory being unavailable
    /// rather than from the submitted credentials
    pub fn is_directory_fault(&self) -> bool {
        matches!(self, FailureKind::SearchError(_) | FailureKind::BindError(_))
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::SearchError(detail) => write!(f, "directory search failed: {}", detail),
            FailureKind::BindError(detail) => write!(f, "directory bind failed: {}", detail),
            other => f.write_str(other.public_message()),
        }
    }
}

/// What reconciliation did to the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Created,
    Updated,
    Unchanged,
}

impl ReconcileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileAction::Created => "created",
            ReconcileAction::Updated => "updated",
            ReconcileAction::Unchanged => "unchanged",
        }
    }
}

/// Terminal result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success {
        user_id: String,
        action: ReconcileAction,
    },
    Failure(FailureKind),
}

impl Verdict {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Verdict::Success { user_id, .. } => Some(user_id),
            Verdict::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureKind> {
        match self {
            Verdict::Failure(kind) => Some(kind),
            Verdict::Success { .. } => None,
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            Verdict::Success { .. } => "success",
            Verdict::Failure(kind) => kind.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_faults_share_public_messages() {
        let search = FailureKind::SearchError("connection refused".to_string());
        let bind = FailureKind::BindError("timed out".to_string());

        assert_eq!(search.public_message(), FailureKind::UserNotFound.public_message());
        assert_eq!(bind.public_message(), FailureKind::InvalidCredentials.public_message());
        assert!(!search.public_message().contains("connection"));
    }

    #[test]
    fn test_directory_faults_stay_distinguishable() {
        let search = FailureKind::SearchError("connection refused".to_string());

        assert_ne!(search, FailureKind::UserNotFound);
        assert_eq!(search.code(), "search_error");
        assert!(search.is_directory_fault());
        assert!(!FailureKind::UserNotFound.is_directory_fault());
        assert!(search.to_string().contains("connection refused"));
    }

    #[test]
    fn test_verdict_accessors() {
        let ok = Verdict::Success {
            user_id: "u1".to_string(),
            action: ReconcileAction::Created,
        };
        assert_eq!(ok.user_id(), Some("u1"));
        assert_eq!(ok.outcome_label(), "success");

        let denied = Verdict::Failure(FailureKind::InvalidCredentials);
        assert_eq!(denied.failure(), Some(&FailureKind::InvalidCredentials));
        assert_eq!(denied.outcome_label(), "invalid_credentials");
    }
}
