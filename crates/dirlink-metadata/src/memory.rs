//! In-memory user store

use async_trait::async_trait;
use dirlink_core::document::{get_path, merge_documents, Document};
use dirlink_core::types::LocalUser;
use dirlink_core::{Error, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;
use uuid::Uuid;

use crate::traits::UserGateway;

/// User store held in process memory.
///
/// Counts every create and patch so callers can assert that a code path
/// left the store untouched.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<LocalUser>>,
    writes: AtomicUsize,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user without counting it as a write
    pub fn seed(&self, document: Document) -> String {
        let id = Uuid::new_v4().to_string();
        self.users.write().push(LocalUser::new(id.clone(), document));
        id
    }

    pub fn get(&self, id: &str) -> Option<LocalUser> {
        self.users.read().iter().find(|u| u.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Number of creates and patches performed through the gateway
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserGateway for MemoryUserStore {
    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<LocalUser>> {
        let users = self.users.read();
        Ok(users
            .iter()
            .find(|u| matches!(get_path(&u.document, field), Some(Value::String(v)) if v == value))
            .cloned())
    }

    async fn create_user(&self, document: &Document) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.users
            .write()
            .push(LocalUser::new(id.clone(), document.clone()));
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!(user_id = %id, "Created user in memory store");
        Ok(id)
    }

    async fn patch_user(&self, id: &str, patch: &Document) -> Result<()> {
        let mut users = self.users.write();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::NoSuchUser(id.to_string()))?;

        merge_documents(&mut user.document, patch);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_find_by_nested_field() {
        let store = MemoryUserStore::new();
        let id = store.seed(doc(json!({"profile": {"email": "jdoe@x.com"}})));

        let found = store
            .find_one_by_field("profile.email", "jdoe@x.com")
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(id));

        let missing = store.find_one_by_field("profile.email", "other@x.com").await.unwrap();
        assert!(missing.is_none());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_create_then_patch() {
        let store = MemoryUserStore::new();
        let id = store
            .create_user(&doc(json!({"uid": "jdoe", "profile": {"site": "north"}})))
            .await
            .unwrap();

        store
            .patch_user(&id, &doc(json!({"profile": {"email": "jdoe@x.com"}})))
            .await
            .unwrap();

        let user = store.get(&id).unwrap();
        assert_eq!(
            Value::Object(user.document),
            json!({"uid": "jdoe", "profile": {"site": "north", "email": "jdoe@x.com"}})
        );
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_patch_unknown_user() {
        let store = MemoryUserStore::new();
        let err = store.patch_user("nope", &Document::new()).await.unwrap_err();
        assert!(matches!(err, Error::NoSuchUser(_)));
    }
}
