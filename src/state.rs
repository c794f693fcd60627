//! Application state shared across request handlers.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use ts_rs::TS;

use crate::cache::DedupingLoader;
use crate::config::Config;
use crate::modules::{Dataset, Module};
use crate::sheets::{SheetsApi, SheetsError};

/// Rows of one fetched range, header first.
pub type SheetRows = Arc<Vec<Vec<String>>>;

/// The process-wide sheet cache. Errors are shared so every waiter on a
/// collapsed load receives the same failure.
pub type SheetCache = DedupingLoader<SheetRows, Arc<SheetsError>>;

/// Availability of a dashboard module.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ServiceStatus {
    Active,
    Disabled,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sheets: Arc<dyn SheetsApi>,
    pub sheet_cache: SheetCache,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, sheets: Arc<dyn SheetsApi>) -> Self {
        Self {
            config: Arc::new(config),
            sheets,
            sheet_cache: SheetCache::new(),
            started_at: Instant::now(),
        }
    }

    /// Modules with a spreadsheet configured are active.
    pub fn module_status(&self, module: Module) -> ServiceStatus {
        if self.config.spreadsheet_id(module).is_some() {
            ServiceStatus::Active
        } else {
            ServiceStatus::Disabled
        }
    }

    /// Read `dataset` through the cache, returning the rows and whether they
    /// were served without a fetch.
    pub async fn load_dataset(
        &self,
        dataset: &'static Dataset,
        spreadsheet_id: &str,
    ) -> Result<(SheetRows, bool), Arc<SheetsError>> {
        let ttl = self.config.cache_ttl.unwrap_or(dataset.ttl);
        let sheets = Arc::clone(&self.sheets);
        let spreadsheet_id = spreadsheet_id.to_owned();
        let range = dataset.range.to_string();

        self.sheet_cache
            .load(&dataset.cache_key(), ttl, move || async move {
                sheets
                    .get_values(&spreadsheet_id, &range)
                    .await
                    .map(Arc::new)
                    .map_err(Arc::new)
            })
            .await
    }
}
