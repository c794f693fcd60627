//! Shared fixtures for router-level tests: an in-memory spreadsheet store and
//! request helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use central::config::Config;
use central::sheets::{SheetsApi, SheetsError, column_index};
use central::state::AppState;
use central::web::create_router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Sheets keyed by name, each a list of rows starting at sheet row 1.
#[derive(Default)]
pub struct FakeSheets {
    sheets: Mutex<HashMap<String, Vec<Vec<String>>>>,
    reads: Mutex<Vec<(String, String)>>,
    writes: Mutex<Vec<(String, String, String)>>,
    fail_reads: AtomicBool,
    read_delay: Mutex<Option<Duration>>,
    write_delay: Mutex<Option<Duration>>,
}

pub fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

/// `'ANALISE MERCADO'!A3:M` → (`ANALISE MERCADO`, `A3:M`)
fn split_range(range: &str) -> (String, String) {
    let (sheet, cells) = range.rsplit_once('!').unwrap_or((range, ""));
    let sheet = sheet
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.replace("''", "'"))
        .unwrap_or_else(|| sheet.to_string());
    (sheet, cells.to_string())
}

/// `E7` → (4, 7); ranges like `A:Z` are not single cells.
fn single_cell(cells: &str) -> Option<(usize, usize)> {
    if cells.contains(':') {
        return None;
    }
    let letters: String = cells.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let row: usize = cells[letters.len()..].parse().ok()?;
    Some((column_index(&letters)?, row))
}

/// First sheet row of `A3:M`-style ranges.
fn start_row(cells: &str) -> usize {
    let start = cells.split(':').next().unwrap_or("");
    start
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .unwrap_or(1)
}

impl FakeSheets {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, sheet: &str, data: Vec<Vec<String>>) {
        self.sheets.lock().unwrap().insert(sheet.to_string(), data);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn delay_reads(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    /// Writes are applied and recorded at once, then the call waits `delay`.
    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Overwrite a cell as if edited out of band.
    pub fn edit(&self, sheet: &str, row: usize, column: usize, value: &str) {
        let mut sheets = self.sheets.lock().unwrap();
        let rows = sheets.entry(sheet.to_string()).or_default();
        if rows.len() < row {
            rows.resize(row, Vec::new());
        }
        let cells = &mut rows[row - 1];
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.to_string();
    }

    pub fn cell(&self, sheet: &str, row: usize, column: usize) -> Option<String> {
        self.sheets
            .lock()
            .unwrap()
            .get(sheet)?
            .get(row - 1)?
            .get(column)
            .cloned()
    }

    /// Full-range reads, excluding single-cell reads.
    pub fn range_reads(&self) -> usize {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, range)| single_cell(&split_range(range).1).is_none())
            .count()
    }

    pub fn reads(&self) -> Vec<(String, String)> {
        self.reads.lock().unwrap().clone()
    }

    /// (spreadsheet id, range, value)
    pub fn writes(&self) -> Vec<(String, String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        self.reads
            .lock()
            .unwrap()
            .push((spreadsheet_id.to_string(), range.to_string()));

        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SheetsError::Status {
                status: 429,
                message: "Quota exceeded for quota metric 'Read requests'".into(),
            });
        }

        let (sheet, cells) = split_range(range);
        if let Some((column, row)) = single_cell(&cells) {
            return Ok(self
                .cell(&sheet, row, column)
                .map(|value| vec![vec![value]])
                .unwrap_or_default());
        }

        let sheets = self.sheets.lock().unwrap();
        let rows = sheets.get(&sheet).ok_or_else(|| SheetsError::Status {
            status: 400,
            message: format!("Unable to parse range: {range}"),
        })?;
        Ok(rows.iter().skip(start_row(&cells) - 1).cloned().collect())
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let (sheet, cells) = split_range(range);
        let (column, row) = single_cell(&cells).ok_or_else(|| SheetsError::Status {
            status: 400,
            message: format!("Expected a single cell, got {range}"),
        })?;
        let value = rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or_default();

        self.edit(&sheet, row, column, &value);
        self.writes
            .lock()
            .unwrap()
            .push((spreadsheet_id.to_string(), range.to_string(), value));

        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

/// Every module configured, with a bearer token.
pub fn config() -> Config {
    Config {
        google_access_token: Some("test-token".into()),
        pex_spreadsheet_id: Some("sheet-pex".into()),
        vendas_spreadsheet_id: Some("sheet-vendas".into()),
        okrs_spreadsheet_id: Some("sheet-okrs".into()),
        kpis_spreadsheet_id: Some("sheet-kpis".into()),
        gestao_rede_spreadsheet_id: Some("sheet-rede".into()),
        carteira_spreadsheet_id: Some("sheet-carteira".into()),
        branches_spreadsheet_id: Some("sheet-branches".into()),
        mercado_spreadsheet_id: Some("sheet-mercado".into()),
        ..Config::default()
    }
}

pub fn app(sheets: Arc<FakeSheets>, config: Config) -> (Router, AppState) {
    let state = AppState::new(config, sheets);
    (create_router(state.clone()), state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    send_request(router, request.body(body).unwrap()).await
}

pub async fn send_request(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Method::GET, uri, None).await
}

pub async fn put(router: &Router, uri: &str, body: Value) -> TestResponse {
    send(router, Method::PUT, uri, Some(body)).await
}
