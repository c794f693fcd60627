//! Module data endpoints: cached reads of whole sheet ranges.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::modules::{self, Dataset, Module};
use crate::state::AppState;
use crate::web::error::{ApiError, OptionNotFoundExt};
use crate::web::routes::with_cache_control;

#[derive(Debug, Default, Deserialize)]
pub struct ReadParams {
    /// Drop the cached copy before reading.
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Serialize)]
pub struct DatasetResponse<'a> {
    pub values: &'a [Vec<String>],
    pub cached: bool,
    pub key: String,
}

/// Resolve `/{module}/{resource}` to a catalog entry.
pub(super) fn resolve_dataset(
    module: &str,
    resource: &str,
) -> Result<(Module, &'static Dataset), ApiError> {
    let module = Module::from_slug(module).or_not_found(|| format!("Unknown module '{module}'"))?;
    let dataset = modules::dataset(module, resource)
        .or_not_found(|| format!("Unknown resource '{resource}' in module '{module}'"))?;
    Ok((module, dataset))
}

/// The spreadsheet backing `module`, or a configuration error naming its variable.
pub(super) fn spreadsheet_id(state: &AppState, module: Module) -> Result<&str, ApiError> {
    state
        .config
        .spreadsheet_id(module)
        .ok_or_else(|| ApiError::missing_config(module.spreadsheet_env()))
}

/// `GET /api/{module}/{resource}`
#[instrument(skip_all)]
pub(super) async fn read_dataset(
    State(state): State<AppState>,
    Path((module, resource)): Path<(String, String)>,
    Query(params): Query<ReadParams>,
) -> Result<Response, ApiError> {
    let (module, dataset) = resolve_dataset(&module, &resource)?;
    let spreadsheet_id = spreadsheet_id(&state, module)?;
    let key = dataset.cache_key();

    if params.refresh {
        state.sheet_cache.invalidate(&key);
    }

    let (rows, cached) = state.load_dataset(dataset, spreadsheet_id).await?;
    debug!(key = %key, rows = rows.len(), cached, refresh = params.refresh, "dataset served");

    Ok(with_cache_control(
        DatasetResponse {
            values: &rows,
            cached,
            key,
        },
        dataset.cache_control,
    ))
}
