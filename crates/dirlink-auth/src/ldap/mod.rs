//! LDAP/Active Directory adapter
//!
//! Provides the two directory round-trips a login needs:
//! - find an entry by an equality filter under the configured search base
//! - bind as an entry's DN to verify a password
//!
//! Supports plain LDAP, LDAPS and STARTTLS connections.

mod client;

pub use client::{DirectoryClient, LdapDirectory};
