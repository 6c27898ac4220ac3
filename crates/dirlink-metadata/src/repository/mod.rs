//! SQLite user repository
//!
//! Each user is one row holding its JSON document. Field lookups go through
//! SQLite's `json_extract`, so any dotted path configured as the unique key
//! can be queried without a schema change.

use async_trait::async_trait;
use chrono::Utc;
use dirlink_core::document::{merge_documents, validate_field_path, Document};
use dirlink_core::types::LocalUser;
use dirlink_core::{Error, Result};
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use crate::traits::UserGateway;

pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 10).await
    }

    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.init().await?;

        info!("User store ready at {}", database_url);
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    #[cfg(test)]
    async fn get_user(&self, id: &str) -> Result<Option<LocalUser>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, document FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;

        match row {
            Some((id, raw)) => Ok(Some(LocalUser::new(id, parse_document(&raw)?))),
            None => Ok(None),
        }
    }

    pub async fn count_users(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }
}

#[async_trait]
impl UserGateway for UserStore {
    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<LocalUser>> {
        let path = json_path(field)?;

        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT id, document FROM users
            WHERE json_extract(document, ?) = ?
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(&path)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        match row {
            Some((id, raw)) => Ok(Some(LocalUser::new(id, parse_document(&raw)?))),
            None => Ok(None),
        }
    }

    async fn create_user(&self, document: &Document) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let raw = serde_json::to_string(document)?;

        sqlx::query(
            "INSERT INTO users (id, document, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&raw)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        debug!(user_id = %id, "Created user");
        Ok(id)
    }

    async fn patch_user(&self, id: &str, patch: &Document) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let row: Option<(String,)> = sqlx::query_as("SELECT document FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let (raw,) = row.ok_or_else(|| Error::NoSuchUser(id.to_string()))?;
        let mut document = parse_document(&raw)?;
        merge_documents(&mut document, patch);

        sqlx::query("UPDATE users SET document = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&document)?)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        debug!(user_id = %id, "Patched user");
        Ok(())
    }
}

/// SQLite JSON path for a dotted field, with every label quoted
fn json_path(field: &str) -> Result<String> {
    validate_field_path(field)?;
    let labels: Vec<String> = field.split('.').map(|s| format!("\"{}\"", s)).collect();
    Ok(format!("$.{}", labels.join(".")))
}

fn parse_document(raw: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::InvalidDocument("stored user is not a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> UserStore {
        UserStore::with_max_connections("sqlite::memory:", 1)
            .await
            .unwrap()
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_json_path_quotes_labels() {
        assert_eq!(json_path("uid").unwrap(), r#"$."uid""#);
        assert_eq!(
            json_path("profile.first-name").unwrap(),
            r#"$."profile"."first-name""#
        );
        assert!(json_path("profile'); DROP TABLE users; --").is_err());
    }

    #[tokio::test]
    async fn test_create_and_find_by_nested_field() {
        let store = store().await;
        let id = store
            .create_user(&doc(json!({"uid": "jdoe", "profile": {"email": "jdoe@x.com"}})))
            .await
            .unwrap();

        let by_uid = store.find_one_by_field("uid", "jdoe").await.unwrap().unwrap();
        assert_eq!(by_uid.id, id);

        let by_email = store
            .find_one_by_field("profile.email", "jdoe@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, id);

        assert!(store.find_one_by_field("uid", "other").await.unwrap().is_none());
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_patch_merges_document() {
        let store = store().await;
        let id = store
            .create_user(&doc(json!({"uid": "jdoe", "profile": {"site": "north"}})))
            .await
            .unwrap();

        store
            .patch_user(&id, &doc(json!({"profile": {"email": "jdoe@x.com"}})))
            .await
            .unwrap();

        let user = store.get_user(&id).await.unwrap().unwrap();
        assert_eq!(
            Value::Object(user.document),
            json!({"uid": "jdoe", "profile": {"site": "north", "email": "jdoe@x.com"}})
        );
    }

    #[tokio::test]
    async fn test_patch_unknown_user() {
        let store = store().await;
        let err = store
            .patch_user("missing", &doc(json!({"a": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchUser(_)));
    }
}
