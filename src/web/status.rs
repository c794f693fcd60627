//! Health and status handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::trace;
use ts_rs::TS;

use crate::modules::Module;
use crate::state::{AppState, ServiceStatus};

#[derive(Serialize, TS)]
#[ts(export)]
pub struct ModuleInfo {
    name: Module,
    status: ServiceStatus,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    /// Seconds since startup.
    #[ts(type = "number")]
    uptime: u64,
    modules: BTreeMap<String, ModuleInfo>,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Status endpoint showing which modules have a spreadsheet behind them
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let modules: BTreeMap<String, ModuleInfo> = Module::ALL
        .into_iter()
        .map(|module| {
            (
                module.as_str().to_string(),
                ModuleInfo {
                    name: module,
                    status: state.module_status(module),
                },
            )
        })
        .collect();

    let overall_status = if modules
        .values()
        .any(|m| matches!(m.status, ServiceStatus::Active))
    {
        ServiceStatus::Active
    } else {
        ServiceStatus::Disabled
    };

    Json(StatusResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        uptime: state.started_at.elapsed().as_secs(),
        modules,
    })
}
