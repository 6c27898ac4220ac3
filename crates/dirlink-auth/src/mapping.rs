//! Mapping engine
//!
//! Turns a directory entry into a local user document (or a patch for an
//! existing one) following the configured `(attr, key, unique)` rules.
//! Pure data transform, no I/O.

use dirlink_core::config::{AttributeMapping, UpdatePolicy, UserOptions};
use dirlink_core::document::{set_path, Document};
use dirlink_core::types::DirectoryEntry;
use dirlink_core::DEFAULT_UNIQUE_ATTRIBUTE;
use serde_json::Value;
use tracing::trace;

/// The rule marked unique, or `uid -> uid` when none is
pub fn find_unique_mapping(mappings: &[AttributeMapping]) -> AttributeMapping {
    mappings
        .iter()
        .find(|m| m.unique)
        .cloned()
        .unwrap_or_else(|| {
            AttributeMapping::unique_key(DEFAULT_UNIQUE_ATTRIBUTE, DEFAULT_UNIQUE_ATTRIBUTE)
        })
}

/// Mapping rules resolved once at startup and shared by every attempt
#[derive(Debug, Clone)]
pub struct MappingEngine {
    rules: Vec<AttributeMapping>,
    unique: AttributeMapping,
    seed: Document,
    update_policy: UpdatePolicy,
}

impl MappingEngine {
    pub fn new(options: &UserOptions) -> Self {
        let unique = find_unique_mapping(&options.mappings);

        let mut rules = options.mappings.clone();
        if !rules.iter().any(|m| m.unique) {
            // a synthesized key must still be written, or later logins
            // could never find the record again
            rules.push(unique.clone());
        }

        let mut seed = Document::new();
        if let Some(site) = options.site.as_deref().filter(|s| !s.is_empty()) {
            set_path(&mut seed, "profile.site", Value::String(site.to_string()));
            set_path(
                &mut seed,
                "profile.teams",
                Value::Array(vec![Value::String(site.to_string())]),
            );
        }
        for (path, value) in &options.defaults {
            set_path(&mut seed, path, value.clone());
        }

        Self {
            rules,
            unique,
            seed,
            update_policy: options.update_policy,
        }
    }

    pub fn unique(&self) -> &AttributeMapping {
        &self.unique
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        self.update_policy
    }

    /// Value of the unique attribute in `entry`, if present and non-empty
    pub fn unique_value<'e>(&self, entry: &'e DirectoryEntry) -> Option<&'e str> {
        entry
            .first(self.unique.source())
            .filter(|value| !value.is_empty())
    }

    /// Build the document for `entry`.
    ///
    /// New users start from the seeded defaults and receive every rule.
    /// Existing users get a patch without the unique rule, since the key
    /// never changes after creation.
    pub fn reconcile_shape(&self, entry: &DirectoryEntry, is_new_user: bool) -> Document {
        let mut doc = if is_new_user {
            self.seed.clone()
        } else {
            Document::new()
        };

        for rule in &self.rules {
            if rule.unique && !is_new_user {
                continue;
            }

            // the key is stored exactly as it is looked up later, so a
            // multi-valued attribute contributes only its first value
            if rule.unique {
                match self.unique_value(entry) {
                    Some(key) => {
                        set_path(&mut doc, &rule.destination_path, Value::String(key.to_string()))
                    }
                    None => trace!(attribute = rule.source(), "Unique attribute absent from entry"),
                }
                continue;
            }

            let value = match rule.source() {
                "" => Value::String(String::new()),
                attr => match entry.value(attr) {
                    Some(value) => value,
                    None => {
                        trace!(attribute = attr, "Attribute absent from entry, rule skipped");
                        continue;
                    }
                },
            };
            set_path(&mut doc, &rule.destination_path, value);
        }

        doc
    }
}
