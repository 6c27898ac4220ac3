//! Login attempt state machine
//!
//! One [`Authenticator`] runs one attempt:
//!
//! ```text
//! Start -> Sanitized -> Searched -> Authenticated -> Reconciled -> Done
//!    \________\____________\_____________\______________> Failed(kind)
//! ```
//!
//! Every step awaits the previous one; a bind needs the DN from the search
//! and reconciliation needs the authenticated entry.

use dirlink_core::config::UpdatePolicy;
use dirlink_core::types::{
    AuthenticationRequest, DirectoryEntry, FailureKind, ReconcileAction, Verdict,
};
use dirlink_core::Result;
use dirlink_metadata::UserGateway;
use tracing::{debug, error, warn};

use crate::filter::sanitize;
use crate::ldap::DirectoryClient;
use crate::mapping::MappingEngine;

/// Where an attempt currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Start,
    Sanitized { username: String },
    Searched { entry: DirectoryEntry },
    Authenticated { entry: DirectoryEntry },
    Reconciled { user_id: String, action: ReconcileAction },
    Done(Verdict),
    Failed(FailureKind),
}

impl AttemptState {
    pub fn name(&self) -> &'static str {
        match self {
            AttemptState::Start => "start",
            AttemptState::Sanitized { .. } => "sanitized",
            AttemptState::Searched { .. } => "searched",
            AttemptState::Authenticated { .. } => "authenticated",
            AttemptState::Reconciled { .. } => "reconciled",
            AttemptState::Done(_) => "done",
            AttemptState::Failed(_) => "failed",
        }
    }
}

/// Runs a single login attempt against a directory and a user store
pub struct Authenticator<'a, D: ?Sized, G: ?Sized> {
    engine: &'a MappingEngine,
    directory: &'a D,
    gateway: &'a G,
    state: AttemptState,
}

impl<'a, D, G> Authenticator<'a, D, G>
where
    D: DirectoryClient + ?Sized,
    G: UserGateway + ?Sized,
{
    pub fn new(engine: &'a MappingEngine, directory: &'a D, gateway: &'a G) -> Self {
        Self {
            engine,
            directory,
            gateway,
            state: AttemptState::Start,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    /// Drive the attempt to a verdict.
    ///
    /// Denials are `Ok(Verdict::Failure)`. `Err` is reserved for the user
    /// store failing, which is not the end user's doing.
    pub async fn run(mut self, request: &AuthenticationRequest) -> Result<Verdict> {
        loop {
            if let Some(verdict) = self.advance(request).await? {
                return Ok(verdict);
            }
        }
    }

    /// Perform one transition. Returns the verdict once a terminal state
    /// is reached.
    pub async fn advance(&mut self, request: &AuthenticationRequest) -> Result<Option<Verdict>> {
        let next = match std::mem::replace(&mut self.state, AttemptState::Start) {
            AttemptState::Start => AttemptState::Sanitized {
                username: sanitize(&request.username),
            },
            AttemptState::Sanitized { username } => self.search(&username).await,
            AttemptState::Searched { entry } => self.authenticate(entry, &request.password).await,
            AttemptState::Authenticated { entry } => self.reconcile(&entry).await?,
            AttemptState::Reconciled { user_id, action } => {
                AttemptState::Done(Verdict::Success { user_id, action })
            }
            AttemptState::Done(verdict) => {
                self.state = AttemptState::Done(verdict.clone());
                return Ok(Some(verdict));
            }
            AttemptState::Failed(kind) => {
                self.state = AttemptState::Failed(kind.clone());
                return Ok(Some(Verdict::Failure(kind)));
            }
        };

        debug!(state = next.name(), "Login attempt advanced");
        self.state = next;
        Ok(None)
    }

    async fn search(&self, username: &str) -> AttemptState {
        let attribute = self.engine.unique().source();
        debug!(attribute, username, "Find user");

        match self.directory.find_entry(attribute, username).await {
            Ok(Some(entry)) => {
                debug!(dn = %entry.dn, "Found user");
                AttemptState::Searched { entry }
            }
            Ok(None) => {
                warn!(username, "User not found");
                AttemptState::Failed(FailureKind::UserNotFound)
            }
            Err(e) => {
                error!(username, error = %e, "Directory search failed");
                AttemptState::Failed(FailureKind::SearchError(e.to_string()))
            }
        }
    }

    async fn authenticate(&self, entry: DirectoryEntry, password: &str) -> AttemptState {
        // Servers that allow unauthenticated binds accept any DN with an
        // empty password
        if password.is_empty() {
            warn!(dn = %entry.dn, "Empty password rejected");
            return AttemptState::Failed(FailureKind::InvalidCredentials);
        }

        debug!(dn = %entry.dn, "Authenticate");
        match self.directory.bind_as(&entry.dn, password).await {
            Ok(true) => {
                debug!(dn = %entry.dn, "Authenticated");
                AttemptState::Authenticated { entry }
            }
            Ok(false) => {
                warn!(dn = %entry.dn, "Authentication failed");
                AttemptState::Failed(FailureKind::InvalidCredentials)
            }
            Err(e) => {
                error!(dn = %entry.dn, error = %e, "Directory bind failed");
                AttemptState::Failed(FailureKind::BindError(e.to_string()))
            }
        }
    }

    async fn reconcile(&self, entry: &DirectoryEntry) -> Result<AttemptState> {
        let unique = self.engine.unique();
        let Some(value) = self.engine.unique_value(entry) else {
            warn!(dn = %entry.dn, attribute = unique.source(), "Missing matched unique mapping");
            return Ok(AttemptState::Failed(FailureKind::MissingUniqueAttribute));
        };

        let existing = self
            .gateway
            .find_one_by_field(&unique.destination_path, value)
            .await?;

        let state = match existing {
            Some(user) => {
                let action = match self.engine.update_policy() {
                    UpdatePolicy::CreateOnly => ReconcileAction::Unchanged,
                    UpdatePolicy::Merge => {
                        let patch = self.engine.reconcile_shape(entry, false);
                        if patch.is_empty() {
                            ReconcileAction::Unchanged
                        } else {
                            self.gateway.patch_user(&user.id, &patch).await?;
                            ReconcileAction::Updated
                        }
                    }
                };
                debug!(user_id = %user.id, action = action.as_str(), "Reconciled existing user");
                AttemptState::Reconciled {
                    user_id: user.id,
                    action,
                }
            }
            None => {
                let document = self.engine.reconcile_shape(entry, true);
                let user_id = self.gateway.create_user(&document).await?;
                debug!(user_id = %user_id, "Created user");
                AttemptState::Reconciled {
                    user_id,
                    action: ReconcileAction::Created,
                }
            }
        };

        Ok(state)
    }
}
