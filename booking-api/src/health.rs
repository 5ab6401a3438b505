//! Health check handler

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::{envelope::Outcome, state::AppState};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    /// Version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Liveness probe
///
/// Always 200 while the process is serving; no dependency is checked.
pub async fn health(State(state): State<AppState>) -> Outcome {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    Outcome::success(&response)
}
