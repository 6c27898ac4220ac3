//! Configuration for Dirlink
//!
//! Loaded once at process start, validated, and then passed by reference to
//! every component. Nothing reads configuration mid-request.
//!
//! Example:
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8080
//!
//! [ldap]
//! url = "ldaps://dc.example.com:636"
//! base_dn = "dc=example,dc=com"
//! bind_dn = "cn=search,dc=example,dc=com"
//! bind_password = "secret"
//!
//! [ldap.user]
//! dn = "ou=people,dc=example,dc=com"
//! update_policy = "merge"
//! mappings = [
//!     { attr = "sAMAccountName", key = "username", unique = true },
//!     { attr = "mail", key = "profile.email" },
//! ]
//! ```

use crate::document::validate_field_path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirlinkConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory login. Absent means the feature is off.
    #[serde(default)]
    pub ldap: Option<LdapSettings>,
}

impl DirlinkConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("DIRLINK_BIND_ADDRESS") {
            config.server.bind_address = addr;
        }
        if let Ok(port) = std::env::var("DIRLINK_PORT") {
            match port.parse() {
                Ok(p) => config.server.port = p,
                Err(_) => warn!("Ignoring invalid DIRLINK_PORT: {}", port),
            }
        }
        if let Ok(url) = std::env::var("DIRLINK_DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(level) = std::env::var("DIRLINK_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("DIRLINK_LOG_FORMAT") {
            config.logging.format = format;
        }

        // The directory section only exists when a server URL is given
        if let Ok(url) = std::env::var("DIRLINK_LDAP_URL") {
            let mut ldap = LdapSettings {
                url,
                ..Default::default()
            };
            if let Ok(base_dn) = std::env::var("DIRLINK_LDAP_BASE_DN") {
                ldap.base_dn = base_dn;
            }
            if let Ok(bind_dn) = std::env::var("DIRLINK_LDAP_BIND_DN") {
                ldap.bind_dn = bind_dn;
            }
            if let Ok(password) = std::env::var("DIRLINK_LDAP_BIND_PASSWORD") {
                ldap.bind_password = password;
            }
            if let Ok(users_dn) = std::env::var("DIRLINK_LDAP_USERS_DN") {
                ldap.user.dn = Some(users_dn);
            }
            if env_flag("DIRLINK_LDAP_START_TLS") {
                ldap.tls.start_tls = true;
            }
            if env_flag("DIRLINK_LDAP_DEBUG") {
                ldap.debug = true;
            }
            config.ldap = Some(ldap);
        }

        config
    }

    /// Directory settings, if the feature is configured and enabled
    pub fn ldap_settings(&self) -> Option<&LdapSettings> {
        self.ldap.as_ref().filter(|l| l.enabled)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if let Some(ldap) = self.ldap_settings() {
            ldap.validate()?;
        }
        Ok(())
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "true").unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://dirlink.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Directory service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapSettings {
    /// Enable directory login
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Server URL (ldap:// or ldaps://)
    pub url: String,

    /// Base DN, used as the search base unless `user.dn` is set
    #[serde(default)]
    pub base_dn: String,

    /// Service account used for searches. Empty means anonymous search.
    #[serde(default, alias = "bind_cn")]
    pub bind_dn: String,

    /// Service account password
    #[serde(default)]
    pub bind_password: String,

    #[serde(default)]
    pub tls: LdapTlsOptions,

    /// Log every step of a login attempt
    #[serde(default)]
    pub debug: bool,

    /// Upper bound on each directory round-trip
    #[serde(default = "default_ldap_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub user: UserOptions,
}

fn default_true() -> bool {
    true
}

fn default_ldap_timeout() -> u64 {
    10
}

impl Default for LdapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "ldap://localhost:389".to_string(),
            base_dn: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            tls: LdapTlsOptions::default(),
            debug: false,
            timeout_seconds: default_ldap_timeout(),
            user: UserOptions::default(),
        }
    }
}

impl LdapSettings {
    /// Search base: the users subtree override, else the base DN
    pub fn search_base(&self) -> &str {
        self.user
            .dn
            .as_deref()
            .filter(|dn| !dn.is_empty())
            .unwrap_or(self.base_dn.as_str())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.url.is_empty() {
            return Err(crate::Error::Config("ldap.url is required".into()));
        }

        let url = url::Url::parse(&self.url)
            .map_err(|e| crate::Error::Config(format!("ldap.url is invalid: {}", e)))?;
        match url.scheme() {
            "ldap" => {}
            "ldaps" if self.tls.start_tls => {
                return Err(crate::Error::Config(
                    "ldap.tls.start_tls cannot be combined with an ldaps:// URL".into(),
                ));
            }
            "ldaps" => {}
            other => {
                return Err(crate::Error::Config(format!(
                    "ldap.url must start with ldap:// or ldaps://, got {}://",
                    other
                )));
            }
        }

        if self.base_dn.is_empty() {
            return Err(crate::Error::Config("ldap.base_dn is required".into()));
        }

        if self.timeout_seconds == 0 {
            return Err(crate::Error::Config(
                "ldap.timeout_seconds must be greater than zero".into(),
            ));
        }

        self.user.validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapTlsOptions {
    /// Upgrade a plain connection with STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Skip certificate verification (not recommended for production)
    #[serde(default)]
    pub skip_verify: bool,
}

/// How directory attributes become local user documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserOptions {
    /// Users subtree; overrides `base_dn` as the search base
    #[serde(default)]
    pub dn: Option<String>,

    /// Ordered mapping rules; at most one may be unique
    #[serde(default)]
    pub mappings: Vec<AttributeMapping>,

    /// What happens to an existing local user on login
    #[serde(default)]
    pub update_policy: UpdatePolicy,

    /// Fields seeded into new documents, keyed by dotted path
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,

    /// Site name seeded into new documents as `profile.site` and
    /// `profile.teams`
    #[serde(default)]
    pub site: Option<String>,
}

impl UserOptions {
    pub fn validate(&self) -> crate::Result<()> {
        let unique: Vec<&AttributeMapping> = self.mappings.iter().filter(|m| m.unique).collect();
        if unique.len() > 1 {
            return Err(crate::Error::Config(format!(
                "only one mapping may be unique, found {}",
                unique.len()
            )));
        }
        if let Some(mapping) = unique.first() {
            if mapping.source().is_empty() {
                return Err(crate::Error::Config(
                    "the unique mapping needs a source attribute".into(),
                ));
            }
        }

        for mapping in &self.mappings {
            validate_field_path(&mapping.destination_path)
                .map_err(|e| crate::Error::Config(format!("mapping key: {}", e)))?;
        }
        for path in self.defaults.keys() {
            validate_field_path(path)
                .map_err(|e| crate::Error::Config(format!("default field: {}", e)))?;
        }

        Ok(())
    }
}

/// Policy for local users that already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Patch the local record with mapped attributes on every login
    #[default]
    Merge,
    /// Leave existing records untouched after creation
    CreateOnly,
}

/// One mapping rule: copy a directory attribute into a document path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapping {
    /// Directory attribute; unset writes an empty string
    #[serde(rename = "attr", default)]
    pub source_attribute: Option<String>,

    /// Dotted destination path in the local document
    #[serde(rename = "key")]
    pub destination_path: String,

    /// Marks the stable key linking an entry to a local user
    #[serde(default)]
    pub unique: bool,
}

impl AttributeMapping {
    pub fn new(source_attribute: impl Into<String>, destination_path: impl Into<String>) -> Self {
        Self {
            source_attribute: Some(source_attribute.into()),
            destination_path: destination_path.into(),
            unique: false,
        }
    }

    pub fn unique_key(
        source_attribute: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Self {
            unique: true,
            ..Self::new(source_attribute, destination_path)
        }
    }

    /// Source attribute name, empty when unset
    pub fn source(&self) -> &str {
        self.source_attribute.as_deref().unwrap_or("")
    }
}
