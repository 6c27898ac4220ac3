//! LDAP client implementation
//!
//! Each operation opens its own connection, so an adapter holds nothing but
//! configuration and can be created per attempt. Every round-trip settles
//! exactly once and is bounded by `ldap.timeout_seconds`.

use async_trait::async_trait;
use dirlink_core::config::LdapSettings;
use dirlink_core::types::DirectoryEntry;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::equality_filter;
use crate::settle::{settlement, Settlement};

/// Result codes meaning the server refused the credential, as opposed to
/// failing to process the request
const REJECTION_CODES: &[u32] = &[
    48, // inappropriateAuthentication
    49, // invalidCredentials
    50, // insufficientAccessRights
    53, // unwillingToPerform (disabled or locked accounts on AD)
];

/// The two directory operations a login needs
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Find the entry where `filter_attribute` equals the already sanitized
    /// username. `Ok(None)` means no such entry; `Err` means the directory
    /// could not be searched.
    async fn find_entry(
        &self,
        filter_attribute: &str,
        sanitized_username: &str,
    ) -> DirectoryResult<Option<DirectoryEntry>>;

    /// Bind as `dn` with `password`. `Ok(false)` is an explicit rejection.
    async fn bind_as(&self, dn: &str, password: &str) -> DirectoryResult<bool>;
}

/// Aborts the task when dropped, so an abandoned round-trip takes its
/// socket down with it
struct TaskGuard(JoinHandle<()>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// An open connection together with the task driving it
struct Session {
    ldap: Ldap,
    _driver: TaskGuard,
}

/// Directory adapter backed by `ldap3`
#[derive(Clone)]
pub struct LdapDirectory {
    settings: Arc<LdapSettings>,
}

impl LdapDirectory {
    pub fn new(settings: Arc<LdapSettings>) -> Self {
        Self { settings }
    }

    /// Connect and bind with the service account, then disconnect
    pub async fn probe(&self) -> DirectoryResult<()> {
        let (outcome, pending) = settlement();
        let this = self.clone();

        let _task = TaskGuard(tokio::spawn(async move {
            let result = this.service_session(outcome.clone()).await;
            outcome.settle(result);
        }));

        pending.wait(self.settings.timeout()).await?
    }

    fn conn_settings(&self) -> LdapConnSettings {
        LdapConnSettings::new()
            .set_conn_timeout(self.settings.timeout())
            .set_starttls(self.settings.tls.start_tls)
            .set_no_tls_verify(self.settings.tls.skip_verify)
    }

    /// Open a connection. A failure of the connection driver settles
    /// `outcome`, racing the operation that uses the connection.
    async fn connect<T: Send + 'static>(
        &self,
        outcome: Settlement<DirectoryResult<T>>,
    ) -> DirectoryResult<Session> {
        debug!("Connecting to directory: {}", self.settings.url);

        let (conn, ldap) = LdapConnAsync::with_settings(self.conn_settings(), &self.settings.url)
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))?;

        let driver = tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("Directory connection failed: {}", e);
                outcome.settle(Err(DirectoryError::Connect(e.to_string())));
            }
        });

        Ok(Session {
            ldap,
            _driver: TaskGuard(driver),
        })
    }

    async fn service_bind(&self, ldap: &mut Ldap) -> DirectoryResult<()> {
        if self.settings.bind_dn.is_empty() {
            return Ok(());
        }

        let result = ldap
            .with_timeout(self.settings.timeout())
            .simple_bind(&self.settings.bind_dn, &self.settings.bind_password)
            .await?;

        if result.rc != 0 {
            return Err(DirectoryError::ServiceBind(result.rc));
        }
        Ok(())
    }

    async fn service_session(&self, outcome: Settlement<DirectoryResult<()>>) -> DirectoryResult<()> {
        let mut session = self.connect(outcome).await?;
        let bound = self.service_bind(&mut session.ldap).await;
        let _ = session.ldap.unbind().await;
        bound
    }

    async fn search(
        &self,
        filter: &str,
        outcome: Settlement<DirectoryResult<Option<DirectoryEntry>>>,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let mut session = self.connect(outcome).await?;
        self.service_bind(&mut session.ldap).await?;

        let base = self.settings.search_base();
        debug!(base = %base, filter = %filter, "Searching directory");

        let result = session
            .ldap
            .with_timeout(self.settings.timeout())
            .search(base, Scope::Subtree, filter, vec!["*"])
            .await;
        let _ = session.ldap.unbind().await;

        let (entries, _res) = result?.success()?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn user_bind(
        &self,
        dn: &str,
        password: &str,
        outcome: Settlement<DirectoryResult<bool>>,
    ) -> DirectoryResult<bool> {
        let mut session = self.connect(outcome).await?;

        let result = session
            .ldap
            .with_timeout(self.settings.timeout())
            .simple_bind(dn, password)
            .await;
        let _ = session.ldap.unbind().await;
        let result = result?;

        match result.rc {
            0 => Ok(true),
            rc if REJECTION_CODES.contains(&rc) => {
                debug!(rc, "Directory rejected bind");
                Ok(false)
            }
            rc => Err(DirectoryError::Protocol(format!(
                "bind returned code {}: {}",
                rc, result.text
            ))),
        }
    }
}

/// Settle a search with its entries. Only the first entry can win; any
/// further entry for the same filter is a duplicate completion and dropped.
fn settle_entries(
    outcome: &Settlement<DirectoryResult<Option<DirectoryEntry>>>,
    entries: Vec<DirectoryEntry>,
) {
    if entries.is_empty() {
        outcome.settle(Ok(None));
        return;
    }

    if entries.len() > 1 {
        warn!(matches = entries.len(), "Search filter matched several entries, using the first");
    }

    for entry in entries {
        let dn = entry.dn.clone();
        if !outcome.settle(Ok(Some(entry))) {
            debug!(dn = %dn, "Discarding completion after the search settled");
        }
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    async fn find_entry(
        &self,
        filter_attribute: &str,
        sanitized_username: &str,
    ) -> DirectoryResult<Option<DirectoryEntry>> {
        let filter = equality_filter(filter_attribute, sanitized_username);
        let (outcome, pending) = settlement();
        let this = self.clone();

        let _task = TaskGuard(tokio::spawn(async move {
            match this.search(&filter, outcome.clone()).await {
                Ok(entries) => settle_entries(&outcome, entries),
                Err(e) => {
                    outcome.settle(Err(e));
                }
            }
        }));

        pending.wait(self.settings.timeout()).await?
    }

    async fn bind_as(&self, dn: &str, password: &str) -> DirectoryResult<bool> {
        let (outcome, pending) = settlement();
        let this = self.clone();
        let dn = dn.to_string();
        let password = password.to_string();

        let _task = TaskGuard(tokio::spawn(async move {
            let result = this.user_bind(&dn, &password, outcome.clone()).await;
            outcome.settle(result);
        }));

        pending.wait(self.settings.timeout()).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const LIMIT: Duration = Duration::from_secs(1);

    fn entry(dn: &str) -> DirectoryEntry {
        DirectoryEntry::new(dn).with_attribute("uid", ["jdoe"])
    }

    #[tokio::test]
    async fn test_first_entry_wins() {
        let (outcome, pending) = settlement();

        settle_entries(&outcome, vec![entry("uid=jdoe,ou=a"), entry("uid=jdoe,ou=b")]);

        let found = pending.wait(LIMIT).await.unwrap().unwrap().unwrap();
        assert_eq!(found.dn, "uid=jdoe,ou=a");
    }

    #[tokio::test]
    async fn test_no_entries_settles_not_found() {
        let (outcome, pending) = settlement();

        settle_entries(&outcome, Vec::new());

        assert_eq!(pending.wait(LIMIT).await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn test_driver_failure_after_result_is_discarded() {
        let (outcome, pending) = settlement();

        settle_entries(&outcome, vec![entry("uid=jdoe,ou=a")]);
        assert!(!outcome.settle(Err(DirectoryError::Connect("reset".to_string()))));

        assert!(pending.wait(LIMIT).await.unwrap().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_search_error() {
        let settings = LdapSettings {
            url: "ldap://127.0.0.1:1".to_string(),
            base_dn: "dc=example,dc=com".to_string(),
            timeout_seconds: 2,
            ..Default::default()
        };
        let directory = LdapDirectory::new(Arc::new(settings));

        let result = directory.find_entry("uid", "jdoe").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_timed_out_search_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // accept and swallow requests without ever answering
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(_) => continue,
                }
            }
        });

        let settings = LdapSettings {
            url: format!("ldap://{}", addr),
            base_dn: "dc=example,dc=com".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        };
        let directory = LdapDirectory::new(Arc::new(settings));

        assert!(directory.find_entry("uid", "jdoe").await.is_err());

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("connection left open after the search timed out")
            .unwrap();
    }

    #[test]
    fn test_invalid_credentials_is_a_rejection() {
        assert!(REJECTION_CODES.contains(&49));
        assert!(!REJECTION_CODES.contains(&0));
        assert!(!REJECTION_CODES.contains(&52));
    }
}
