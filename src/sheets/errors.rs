//! Error types for the spreadsheet values client.

use std::sync::Arc;

use crate::cache::LoadAborted;

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    /// Neither a bearer token nor (for reads) an API key is configured.
    #[error("{0} is not configured")]
    MissingCredentials(&'static str),
    #[error("Invalid spreadsheet request URL: {0}")]
    InvalidUrl(String),
    #[error("Spreadsheet store returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Failed to parse spreadsheet response")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Spreadsheet request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Aborted(#[from] LoadAborted),
}

impl From<LoadAborted> for Arc<SheetsError> {
    fn from(err: LoadAborted) -> Self {
        Arc::new(err.into())
    }
}

impl SheetsError {
    /// Whether the failure is a local configuration problem rather than an upstream one.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredentials(_))
    }
}
