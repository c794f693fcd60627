//! Mutation endpoints: locate a row by business key and write one cell.
//!
//! The cached row set is dropped and reloaded before every write, since row
//! positions are the only identity the store offers. On success the whole
//! module's cache namespace is invalidated, also when the write failed or the
//! client disconnected mid-write.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{Instrument, error, info, instrument};
use ts_rs::TS;

use crate::modules::{self, Dataset, EditableSheet, Module};
use crate::sheets::{CellWriter, FieldInput, WriteError, WriteOutcome, WriteTarget, locate_row};
use crate::state::AppState;
use crate::web::datasets::{resolve_dataset, spreadsheet_id};
use crate::web::error::{ApiError, ApiErrorCode};
use crate::web::routes::{cache, with_cache_control};

/// `{ <key fields...>, "field", "value", "expected"? }`
#[derive(Debug, Deserialize)]
pub struct MutationBody {
    pub field: Option<String>,
    pub value: Option<Value>,
    /// Prior cell value the client saw; the write aborts if the cell changed.
    pub expected: Option<Value>,
    #[serde(flatten)]
    pub keys: HashMap<String, Value>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    pub cell: String,
}

/// A validated request.
#[derive(Debug)]
struct Mutation {
    /// Normalized, in the sheet's key order.
    key_values: Vec<String>,
    field: String,
    value: FieldInput,
    expected: Option<String>,
}

/// Strings and numbers as the sheet would display them.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn validate(sheet: &EditableSheet, body: MutationBody) -> Result<Mutation, ApiError> {
    let mut missing = Vec::new();

    let mut key_values = Vec::with_capacity(sheet.keys.len());
    for key in sheet.keys {
        match body.keys.get(key.name).and_then(scalar_text) {
            Some(text) if !text.trim().is_empty() => key_values.push(key.normalize(&text)),
            _ => missing.push(key.name),
        }
    }

    let field = body.field.filter(|field| !field.trim().is_empty());
    if field.is_none() {
        missing.push("field");
    }

    let value = match body.value {
        None | Some(Value::Null) => {
            missing.push("value");
            None
        }
        Some(Value::String(text)) => Some(FieldInput::Text(text)),
        Some(Value::Number(n)) => Some(FieldInput::Number(n.as_f64().ok_or_else(|| {
            ApiError::bad_request(format!("'value' is not a representable number: {n}"))
        })?)),
        Some(_) => return Err(ApiError::bad_request("'value' must be a string or a number")),
    };

    let expected = match body.expected {
        None | Some(Value::Null) => None,
        Some(other) => Some(scalar_text(&other).ok_or_else(|| {
            ApiError::bad_request("'expected' must be a string or a number")
        })?),
    };

    match (field, value) {
        (Some(field), Some(value)) if missing.is_empty() => Ok(Mutation {
            key_values,
            field,
            value,
            expected,
        }),
        _ => Err(ApiError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        ))),
    }
}

/// `unidade=UnitA, quarter=2`
fn describe_key(sheet: &EditableSheet, values: &[String]) -> String {
    sheet
        .keys
        .iter()
        .zip(values)
        .map(|(key, value)| format!("{}={value}", key.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reload, locate, write, then drop the module's cache namespace.
async fn apply(
    state: AppState,
    module: Module,
    dataset: &'static Dataset,
    sheet: &'static EditableSheet,
    mutation: Mutation,
    spreadsheet_id: String,
) -> Result<WriteOutcome, ApiError> {
    // Locate against a fresh snapshot, never a cached one.
    state.sheet_cache.invalidate(&dataset.cache_key());
    let (rows, _) = state.load_dataset(dataset, &spreadsheet_id).await?;

    let row = locate_row(
        &dataset.range,
        &rows,
        &sheet.key_columns(),
        &mutation.key_values,
    )
    .ok_or_else(|| {
        ApiError::not_found(format!(
            "No row in {} matches {}",
            dataset.range.sheet,
            describe_key(sheet, &mutation.key_values)
        ))
    })?;

    let writer = CellWriter::new(state.sheets.as_ref(), &sheet.fields);
    let target = WriteTarget {
        spreadsheet_id: &spreadsheet_id,
        range: &dataset.range,
        row_number: row.row_number,
    };
    let written = match &mutation.expected {
        Some(expected) => {
            writer
                .update_checked(&target, &mutation.field, &mutation.value, expected)
                .await
        }
        None => writer.update(&target, &mutation.field, &mutation.value).await,
    };

    // Anything past the conflict check may have reached the store.
    let invalidated = match &written {
        Err(WriteError::Conflict { .. }) => 0,
        _ => state
            .sheet_cache
            .invalidate_by_prefix(&module.cache_prefix()),
    };
    let outcome = written?;
    info!(
        cell = %outcome.cell,
        field = %mutation.field,
        invalidated,
        "mutation applied"
    );
    Ok(outcome)
}

/// `PUT|POST /api/{module}/{resource}`
#[instrument(skip_all)]
pub(super) async fn update_cell(
    State(state): State<AppState>,
    Path((module, resource)): Path<(String, String)>,
    body: Result<Json<MutationBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (module, dataset) = resolve_dataset(&module, &resource)?;
    let sheet = modules::editable_sheet(module, &resource).ok_or_else(|| {
        ApiError::method_not_allowed(format!("{} is read-only", dataset.cache_key()))
    })?;

    let Json(body) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let mutation = validate(sheet, body)?;

    CellWriter::new(state.sheets.as_ref(), &sheet.fields)
        .encode(&mutation.field, &mutation.value)?;
    let spreadsheet_id = spreadsheet_id(&state, module)?.to_owned();
    let message = format!(
        "Updated {} for {}",
        mutation.field,
        describe_key(sheet, &mutation.key_values)
    );

    // Detached so the invalidation follows the write even if the client goes away.
    let outcome = tokio::spawn(
        apply(state, module, dataset, sheet, mutation, spreadsheet_id).in_current_span(),
    )
    .await
    .map_err(|err| {
        error!(error = %err, "mutation task failed");
        ApiError::new(ApiErrorCode::UpstreamError, "Mutation did not complete")
    })??;

    Ok(with_cache_control(
        MutationResponse {
            success: true,
            message,
            cell: outcome.cell,
        },
        cache::MUTATION,
    ))
}
