//! Dirlink Core Library
//!
//! Configuration, error taxonomy, and shared types for the dirlink
//! directory-authentication bridge.

pub mod config;
pub mod document;
pub mod error;
pub mod types;

pub use config::DirlinkConfig;
pub use error::{Error, Result};

/// Dirlink version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Marker carried by login requests that should be handled by the directory
pub const LDAP_LOGIN_MARKER: &str = "ldap";

/// Attribute used as the unique key when no mapping is marked unique
pub const DEFAULT_UNIQUE_ATTRIBUTE: &str = "uid";
