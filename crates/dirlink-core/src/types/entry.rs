//! Directory entry and login request types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// An entry returned by a directory search.
///
/// Lives only for the duration of one login attempt. It is not proof of
/// identity until a bind as `dn` has succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name, used as the bind identity
    pub dn: String,

    /// Attribute name to values, as returned by the server
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Values of an attribute. Names are matched case-insensitively, the
    /// way directory servers treat them.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .get(name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(|v| v.as_slice())
    }

    /// First value of an attribute. `dn` resolves to the entry's
    /// distinguished name unless the server returned a real `dn` attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        match self.values(name).and_then(|v| v.first()) {
            Some(value) => Some(value.as_str()),
            None if name.eq_ignore_ascii_case("dn") => Some(self.dn.as_str()),
            None => None,
        }
    }

    /// Attribute as a JSON value: a string for a single value, an array
    /// for several.
    pub fn value(&self, name: &str) -> Option<Value> {
        match self.values(name) {
            Some([]) => None,
            Some([single]) => Some(Value::String(single.clone())),
            Some(many) => Some(Value::Array(
                many.iter().cloned().map(Value::String).collect(),
            )),
            None => self.first(name).map(|v| Value::String(v.to_string())),
        }
    }
}

/// Credentials submitted for one login attempt
#[derive(Clone, Deserialize)]
pub struct AuthenticationRequest {
    pub username: String,
    pub password: String,
}

impl AuthenticationRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for AuthenticationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> DirectoryEntry {
        DirectoryEntry::new("uid=jdoe,ou=users,dc=example,dc=com")
            .with_attribute("uid", ["jdoe"])
            .with_attribute("mail", ["jdoe@x.com"])
            .with_attribute("memberOf", ["cn=a", "cn=b"])
    }

    #[test]
    fn test_attribute_names_are_case_insensitive() {
        let e = entry();
        assert_eq!(e.first("UID"), Some("jdoe"));
        assert_eq!(e.first("memberof"), Some("cn=a"));
    }

    #[test]
    fn test_dn_pseudo_attribute() {
        let e = entry();
        assert_eq!(e.first("dn"), Some("uid=jdoe,ou=users,dc=example,dc=com"));
        assert_eq!(
            e.value("dn"),
            Some(json!("uid=jdoe,ou=users,dc=example,dc=com"))
        );
    }

    #[test]
    fn test_multi_valued_attribute_becomes_array() {
        let e = entry();
        assert_eq!(e.value("mail"), Some(json!("jdoe@x.com")));
        assert_eq!(e.value("memberOf"), Some(json!(["cn=a", "cn=b"])));
        assert_eq!(e.value("telephoneNumber"), None);
    }

    #[test]
    fn test_password_is_not_printed() {
        let request = AuthenticationRequest::new("jdoe", "hunter2");
        let printed = format!("{:?}", request);
        assert!(printed.contains("jdoe"));
        assert!(!printed.contains("hunter2"));
    }
}
