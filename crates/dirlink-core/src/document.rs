//! Local user documents
//!
//! Local users are stored as JSON objects. Fields are addressed with dotted
//! paths such as `profile.email`, where every segment except the last names a
//! nested object.

use crate::{Error, Result};
use serde_json::{Map, Value};

/// A local user document or a partial document used as a patch
pub type Document = Map<String, Value>;

/// Check that a dotted path is usable as a document field
pub fn validate_field_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidFieldPath("path is empty".to_string()));
    }

    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(Error::InvalidFieldPath(format!(
                "empty segment in '{}'",
                path
            )));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::InvalidFieldPath(format!(
                "unsupported character in '{}'",
                path
            )));
        }
    }

    Ok(())
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// A non-object value sitting where an intermediate object is required is
/// replaced by an empty object.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = doc;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }

        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(map) => current = map,
            None => return,
        }
    }
}

/// Read the value at `path`, if every segment resolves
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut value = doc.get(segments.next()?)?;
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

/// Deep-merge `patch` into `target`.
///
/// Objects present on both sides merge recursively; any other value in the
/// patch replaces the target's value.
pub fn merge_documents(target: &mut Document, patch: &Document) {
    for (key, incoming) in patch {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_documents(existing, nested);
            }
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_set_path_creates_intermediate_objects() {
        let mut d = Document::new();
        set_path(&mut d, "profile.contact.email", json!("jdoe@x.com"));

        assert_eq!(
            Value::Object(d),
            json!({"profile": {"contact": {"email": "jdoe@x.com"}}})
        );
    }

    #[test]
    fn test_set_path_replaces_scalar_in_the_way() {
        let mut d = doc(json!({"profile": "legacy"}));
        set_path(&mut d, "profile.site", json!("north"));

        assert_eq!(Value::Object(d), json!({"profile": {"site": "north"}}));
    }

    #[test]
    fn test_get_path() {
        let d = doc(json!({"uid": "jdoe", "profile": {"email": "jdoe@x.com"}}));

        assert_eq!(get_path(&d, "uid"), Some(&json!("jdoe")));
        assert_eq!(get_path(&d, "profile.email"), Some(&json!("jdoe@x.com")));
        assert_eq!(get_path(&d, "profile.phone"), None);
        assert_eq!(get_path(&d, "uid.nested"), None);
    }

    #[test]
    fn test_merge_keeps_untouched_nested_fields() {
        let mut target = doc(json!({
            "uid": "jdoe",
            "profile": {"site": "north", "email": "old@x.com"}
        }));
        let patch = doc(json!({"profile": {"email": "new@x.com"}}));

        merge_documents(&mut target, &patch);

        assert_eq!(
            Value::Object(target),
            json!({"uid": "jdoe", "profile": {"site": "north", "email": "new@x.com"}})
        );
    }

    #[test]
    fn test_field_path_validation() {
        assert!(validate_field_path("uid").is_ok());
        assert!(validate_field_path("profile.email").is_ok());
        assert!(validate_field_path("").is_err());
        assert!(validate_field_path("profile..email").is_err());
        assert!(validate_field_path("profile.e'mail").is_err());
    }
}
