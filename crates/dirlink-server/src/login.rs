//! Login endpoint
//!
//! A request is offered to each registered [`LoginMethod`] in order. The
//! first method that claims it decides the outcome; methods decline
//! requests that do not carry their marker.

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use dirlink_auth::LdapAuthProvider;
use dirlink_core::types::{AuthenticationRequest, ReconcileAction, Verdict};
use dirlink_core::{Result, LDAP_LOGIN_MARKER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::server::AppState;

/// Body of `POST /api/v1/login`
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,

    #[serde(rename = "pass", default)]
    pub password: String,

    /// Remaining fields, used by methods to recognize their requests
    #[serde(flatten)]
    pub markers: HashMap<String, Value>,
}

impl LoginRequest {
    /// Whether `name` is present and set to `true`
    pub fn has_marker(&self, name: &str) -> bool {
        matches!(self.markers.get(name), Some(Value::Bool(true)))
    }

    pub fn credentials(&self) -> AuthenticationRequest {
        AuthenticationRequest::new(self.username.clone(), self.password.clone())
    }
}

/// A way of logging in that the server can offer requests to
#[async_trait]
pub trait LoginMethod: Send + Sync {
    /// Label used in logs and metrics
    fn name(&self) -> &'static str;

    /// Whether this method handles the request
    fn claims(&self, request: &LoginRequest) -> bool;

    async fn login(&self, request: &LoginRequest) -> Result<Verdict>;
}

/// Directory login, claimed by requests carrying `"ldap": true`
pub struct LdapLoginMethod {
    provider: Arc<LdapAuthProvider>,
}

impl LdapLoginMethod {
    pub fn new(provider: Arc<LdapAuthProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl LoginMethod for LdapLoginMethod {
    fn name(&self) -> &'static str {
        LDAP_LOGIN_MARKER
    }

    fn claims(&self, request: &LoginRequest) -> bool {
        request.has_marker(LDAP_LOGIN_MARKER)
    }

    async fn login(&self, request: &LoginRequest) -> Result<Verdict> {
        self.provider.authenticate(&request.credentials()).await
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub created: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// POST /api/v1/login
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    let Some(method) = state.methods.iter().find(|m| m.claims(&request)) else {
        debug!(username = %request.username, "No login method claimed the request");
        return error_response(StatusCode::BAD_REQUEST, "No login method accepts this request");
    };

    let started = Instant::now();
    let verdict = match method.login(&request).await {
        Ok(verdict) => verdict,
        Err(e) => {
            error!(method = method.name(), error = %e, "Login failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    state
        .metrics
        .record_login(method.name(), &verdict, started.elapsed().as_secs_f64());

    match verdict {
        Verdict::Success { user_id, action } => (
            StatusCode::OK,
            Json(LoginResponse {
                user_id,
                created: action == ReconcileAction::Created,
            }),
        )
            .into_response(),
        Verdict::Failure(kind) => error_response(StatusCode::FORBIDDEN, kind.public_message()),
    }
}
