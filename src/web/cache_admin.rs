//! Cache introspection and invalidation.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::state::AppState;

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CacheStatsResponse {
    pub size: usize,
    #[ts(type = "number")]
    pub hit_count: u64,
    #[ts(type = "number")]
    pub miss_count: u64,
    pub hit_rate: f64,
    pub pending: usize,
    #[ts(type = "number")]
    pub producer_calls: u64,
    #[ts(type = "number")]
    pub joined_calls: u64,
    pub keys: Vec<String>,
    /// Seconds since startup.
    #[ts(type = "number")]
    pub uptime: u64,
    /// Resident set size in bytes, where the platform exposes it.
    #[ts(type = "number | null")]
    pub memory_usage: Option<u64>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateParams {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct InvalidateResponse {
    pub success: bool,
    pub invalidated: usize,
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ResetResponse {
    pub success: bool,
}

/// Resident memory from `/proc/self/status` (`VmRSS: 12345 kB`).
fn resident_memory() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}

/// `GET /api/cache/stats`
pub(super) async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let stats = state.sheet_cache.stats();
    Json(CacheStatsResponse {
        size: stats.cache.size,
        hit_count: stats.cache.hit_count,
        miss_count: stats.cache.miss_count,
        hit_rate: stats.cache.hit_rate(),
        pending: stats.pending,
        producer_calls: stats.producer_calls,
        joined_calls: stats.joined_calls,
        keys: state.sheet_cache.cache().keys(),
        uptime: state.started_at.elapsed().as_secs(),
        memory_usage: resident_memory(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `DELETE /api/cache/stats[?prefix=p]`, everything when no prefix is given.
pub(super) async fn invalidate_cache(
    State(state): State<AppState>,
    Query(params): Query<InvalidateParams>,
) -> Json<InvalidateResponse> {
    let prefix = params.prefix.filter(|p| !p.is_empty());
    let invalidated = match &prefix {
        Some(prefix) => state.sheet_cache.invalidate_by_prefix(prefix),
        None => state.sheet_cache.clear(),
    };
    info!(prefix = ?prefix, invalidated, "cache invalidated via admin endpoint");

    Json(InvalidateResponse {
        success: true,
        invalidated,
        prefix,
    })
}

/// `POST /api/cache/stats/reset`
pub(super) async fn reset_stats(State(state): State<AppState>) -> Json<ResetResponse> {
    state.sheet_cache.reset_stats();
    info!("cache counters reset");
    Json(ResetResponse { success: true })
}
