//! Directory authentication for Dirlink
//!
//! Search-then-bind login against an LDAP or Active Directory server,
//! followed by reconciliation of the authenticated entry into the local
//! user store.

pub mod error;
pub mod filter;
pub mod ldap;
pub mod mapping;
pub mod orchestrator;
pub mod provider;
pub mod settle;

pub use error::{DirectoryError, DirectoryResult};
pub use filter::{equality_filter, sanitize};
pub use ldap::{DirectoryClient, LdapDirectory};
pub use mapping::{find_unique_mapping, MappingEngine};
pub use orchestrator::{AttemptState, Authenticator};
pub use provider::LdapAuthProvider;
