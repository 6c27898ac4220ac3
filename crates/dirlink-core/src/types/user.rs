//! Local user records

use crate::document::Document;
use serde::{Deserialize, Serialize};

/// A user record held by the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: String,
    pub document: Document,
}

impl LocalUser {
    pub fn new(id: impl Into<String>, document: Document) -> Self {
        Self {
            id: id.into(),
            document,
        }
    }
}
