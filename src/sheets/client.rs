//! HTTP client for the spreadsheet values API.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

use super::errors::SheetsError;
use super::json::parse_json_with_context;
use crate::utils::log_if_slow;

/// Read and single-range write access to a remote tabular store.
///
/// Handlers and the cell writer depend on this seam rather than on HTTP.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Read `range` (e.g. `BONUS!A:F`) as rows of cell strings.
    ///
    /// Trailing empty cells and rows may be absent.
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Write `rows` into `range` as user-entered input, so the store applies
    /// its own parsing and autoformatting.
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError>;
}

/// How requests are authorized.
#[derive(Debug, Clone, Default)]
pub struct SheetsCredentials {
    pub access_token: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

const SLOW_REQUEST: Duration = Duration::from_secs(2);

pub struct SheetsClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: SheetsCredentials,
    limiter: DefaultDirectRateLimiter,
}

impl SheetsClient {
    pub fn new(
        base_url: &str,
        credentials: SheetsCredentials,
        requests_per_minute: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("central/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = Url::parse(base_url)?;
        let quota =
            Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            http,
            base_url,
            credentials,
            limiter: RateLimiter::direct(quota),
        })
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}` with each part encoded as a path segment.
    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        write: bool,
    ) -> Result<reqwest::RequestBuilder, SheetsError> {
        match (&self.credentials.access_token, &self.credentials.api_key) {
            (Some(token), _) => Ok(request.bearer_auth(token)),
            (None, Some(key)) if !write => Ok(request.query(&[("key", key)])),
            _ if write => Err(SheetsError::MissingCredentials("GOOGLE_ACCESS_TOKEN")),
            _ => Err(SheetsError::MissingCredentials("GOOGLE_ACCESS_TOKEN or GOOGLE_API_KEY")),
        }
    }

    /// Send under the outgoing quota, returning status, final URL and body on success.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String, String), SheetsError> {
        self.limiter.until_ready().await;

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;
        log_if_slow(start, SLOW_REQUEST, "spreadsheet request");

        if !status.is_success() {
            let message = parse_json_with_context::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            warn!(
                status = status.as_u16(),
                url = %url,
                message = %message,
                "spreadsheet request rejected"
            );
            return Err(SheetsError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok((status, url, body))
    }
}

/// Flatten a JSON cell to the string the sheet displays.
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    #[instrument(skip(self), fields(rows = tracing::field::Empty))]
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(spreadsheet_id, range)?;
        let request = self.authorize(self.http.get(url), false)?;
        let (status, url, body) = self.send(request).await?;

        let parsed: ValueRange =
            parse_json_with_context(&body).map_err(|source| SheetsError::ParseFailed {
                status: status.as_u16(),
                url,
                source,
            })?;

        let rows: Vec<Vec<String>> = parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        tracing::Span::current().record("rows", rows.len());
        debug!(rows = rows.len(), "fetched spreadsheet values");
        Ok(rows)
    }

    #[instrument(skip(self, rows))]
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let url = self.values_url(spreadsheet_id, range)?;
        let body = UpdateBody {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let request = self
            .authorize(self.http.request(Method::PUT, url), true)?
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body);
        self.send(request).await?;
        debug!("updated spreadsheet values");
        Ok(())
    }
}
