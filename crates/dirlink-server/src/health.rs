//! Health check endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::server::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub login_methods: Vec<String>,
    pub timestamp: String,
}

/// GET /api/v1/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "healthy".to_string(),
        version: dirlink_core::VERSION.to_string(),
        uptime: format_uptime(state.start_time.elapsed()),
        login_methods: state.methods.iter().map(|m| m.name().to_string()).collect(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Format uptime duration
fn format_uptime(duration: std::time::Duration) -> String {
    let total_secs = duration.as_secs();
    let days = total_secs / 86400;
    let hours = (total_secs % 86400) / 3600;
    let mins = (total_secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, mins)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0m");
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 120)), "3h 2m");
        assert_eq!(format_uptime(Duration::from_secs(2 * 86400 + 3600)), "2d 1h 0m");
    }
}
