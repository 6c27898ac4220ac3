//! HTTP server

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use dirlink_auth::LdapAuthProvider;
use dirlink_core::{config::DirlinkConfig, Result};
use dirlink_metadata::{UserGateway, UserStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{info, warn};

use crate::health::health_check;
use crate::login::{login_handler, LdapLoginMethod, LoginMethod};
use crate::metrics::{metrics_handler, metrics_middleware, MetricsRecorder};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DirlinkConfig>,
    pub methods: Arc<Vec<Arc<dyn LoginMethod>>>,
    pub start_time: Instant,
    pub metrics: Arc<MetricsRecorder>,
}

impl FromRef<AppState> for Arc<MetricsRecorder> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Login methods enabled by `config`, in the order requests are offered
/// to them
pub fn login_methods(
    config: &DirlinkConfig,
    gateway: Arc<dyn UserGateway>,
) -> Vec<Arc<dyn LoginMethod>> {
    let mut methods: Vec<Arc<dyn LoginMethod>> = Vec::new();

    if let Some(settings) = config.ldap_settings() {
        let provider = LdapAuthProvider::new(settings.clone(), gateway);
        methods.push(Arc::new(LdapLoginMethod::new(Arc::new(provider))));
    }

    methods
}

/// Build the router serving the login API and metrics
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/login", post(login_handler))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics_middleware,
        ))
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Dirlink server
pub struct DirlinkServer {
    config: DirlinkConfig,
}

impl DirlinkServer {
    pub fn new(config: DirlinkConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let start_time = Instant::now();
        self.config.validate()?;

        let metrics = Arc::new(MetricsRecorder::install()?);
        info!("Prometheus metrics initialized");

        let store = UserStore::with_max_connections(
            &self.config.database.url,
            self.config.database.max_connections,
        )
        .await?;
        info!(users = store.count_users().await?, "Local user store opened");

        let methods = login_methods(&self.config, Arc::new(store));
        if methods.is_empty() {
            warn!("No login method is enabled; every login will be rejected");
        }
        for method in &methods {
            info!(method = method.name(), "Login method enabled");
        }

        let state = AppState {
            config: Arc::new(self.config.clone()),
            methods: Arc::new(methods),
            start_time,
            metrics,
        };

        let app = build_router(state);
        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        let listener = TcpListener::bind(&addr).await?;

        info!("Dirlink listening on http://{}", addr);
        info!("Login endpoint at http://{}/api/v1/login", addr);
        info!("Prometheus metrics at http://{}/metrics", addr);

        axum::serve(listener, app).await?;
        Ok(())
    }
}
