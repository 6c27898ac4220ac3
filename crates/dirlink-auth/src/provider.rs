//! LDAP authentication provider
//!
//! Long-lived entry point shared by every request. Holds the resolved
//! mapping rules and the user store; each attempt gets its own directory
//! adapter and state machine.

use dirlink_core::config::LdapSettings;
use dirlink_core::types::{AuthenticationRequest, DirectoryEntry, Verdict};
use dirlink_core::Result;
use dirlink_metadata::UserGateway;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::error::DirectoryResult;
use crate::filter::sanitize;
use crate::ldap::{DirectoryClient, LdapDirectory};
use crate::mapping::MappingEngine;
use crate::orchestrator::Authenticator;

pub struct LdapAuthProvider {
    settings: Arc<LdapSettings>,
    engine: Arc<MappingEngine>,
    gateway: Arc<dyn UserGateway>,
}

impl LdapAuthProvider {
    pub fn new(settings: LdapSettings, gateway: Arc<dyn UserGateway>) -> Self {
        let engine = MappingEngine::new(&settings.user);
        Self {
            settings: Arc::new(settings),
            engine: Arc::new(engine),
            gateway,
        }
    }

    pub fn settings(&self) -> &LdapSettings {
        &self.settings
    }

    pub fn engine(&self) -> &MappingEngine {
        &self.engine
    }

    /// Run one login attempt end to end
    pub async fn authenticate(&self, request: &AuthenticationRequest) -> Result<Verdict> {
        let started = Instant::now();
        let directory = LdapDirectory::new(Arc::clone(&self.settings));

        let verdict = Authenticator::new(&self.engine, &directory, self.gateway.as_ref())
            .run(request)
            .await?;

        let elapsed = started.elapsed();
        match &verdict {
            Verdict::Success { user_id, action } => info!(
                username = %request.username,
                user_id = %user_id,
                action = action.as_str(),
                elapsed = ?elapsed,
                "Directory login succeeded"
            ),
            Verdict::Failure(kind) if kind.is_directory_fault() => error!(
                username = %request.username,
                reason = kind.code(),
                detail = %kind,
                elapsed = ?elapsed,
                "Directory unavailable for login"
            ),
            Verdict::Failure(kind) => warn!(
                username = %request.username,
                reason = kind.code(),
                elapsed = ?elapsed,
                "Directory login denied"
            ),
        }

        Ok(verdict)
    }

    /// Check that the directory is reachable and the service account binds
    pub async fn probe(&self) -> DirectoryResult<()> {
        LdapDirectory::new(Arc::clone(&self.settings)).probe().await
    }

    /// Search for a user by the unique attribute without binding as them
    pub async fn lookup(&self, username: &str) -> DirectoryResult<Option<DirectoryEntry>> {
        LdapDirectory::new(Arc::clone(&self.settings))
            .find_entry(self.engine.unique().source(), &sanitize(username))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirlink_core::config::{AttributeMapping, UserOptions};
    use dirlink_core::types::FailureKind;
    use dirlink_metadata::MemoryUserStore;

    fn unreachable_settings() -> LdapSettings {
        LdapSettings {
            url: "ldap://127.0.0.1:1".to_string(),
            base_dn: "dc=example,dc=com".to_string(),
            timeout_seconds: 2,
            user: UserOptions {
                mappings: vec![AttributeMapping::new("mail", "email")],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_engine_resolved_from_settings() {
        let provider = LdapAuthProvider::new(
            unreachable_settings(),
            Arc::new(MemoryUserStore::new()),
        );
        assert_eq!(provider.engine().unique().source(), "uid");
        assert_eq!(provider.settings().base_dn, "dc=example,dc=com");
    }

    #[tokio::test]
    async fn test_unreachable_directory_denies_as_not_found() {
        let store = Arc::new(MemoryUserStore::new());
        let provider = LdapAuthProvider::new(unreachable_settings(), store.clone());

        let verdict = provider
            .authenticate(&AuthenticationRequest::new("jdoe", "secret"))
            .await
            .unwrap();

        let kind = verdict.failure().unwrap();
        assert!(matches!(kind, FailureKind::SearchError(_)));
        assert_eq!(kind.public_message(), "User not found");
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_probe_unreachable_directory() {
        let provider = LdapAuthProvider::new(
            unreachable_settings(),
            Arc::new(MemoryUserStore::new()),
        );
        assert!(provider.probe().await.is_err());
    }
}
