//! Reconciliation gateway trait
//!
//! Defines the interface the login flow uses to find, create and patch local
//! users. The storage engine behind it is not the caller's concern.

use async_trait::async_trait;
use dirlink_core::document::Document;
use dirlink_core::types::LocalUser;
use dirlink_core::Result;

#[async_trait]
pub trait UserGateway: Send + Sync {
    /// Find the single user whose document holds `value` at the dotted
    /// path `field`
    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<LocalUser>>;

    /// Store a new user and return its id
    async fn create_user(&self, document: &Document) -> Result<String>;

    /// Deep-merge `patch` into the stored document of user `id`
    async fn patch_user(&self, id: &str, patch: &Document) -> Result<()>;
}
