//! HTTP API Server for Dirlink

pub mod health;
pub mod login;
pub mod metrics;
pub mod server;

pub use login::{LdapLoginMethod, LoginMethod, LoginRequest};
pub use metrics::MetricsRecorder;
pub use server::{build_router, login_methods, AppState, DirlinkServer};
