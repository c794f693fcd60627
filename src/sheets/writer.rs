//! Single-cell writes into a located row.
//!
//! The writer has no cache awareness; callers invalidate after a successful write.

use tracing::{info, warn};

use super::a1::{CellAddress, SheetRange};
use super::client::SheetsApi;
use super::errors::SheetsError;
use super::fields::{FieldColumnMap, FieldInput, FieldSpec};
use super::locale::LocaleError;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Unknown field '{field}' (expected one of: {})", .allowed.join(", "))]
    InvalidField {
        field: String,
        allowed: Vec<&'static str>,
    },
    #[error("Invalid value for '{field}': {source}")]
    InvalidValue {
        field: &'static str,
        #[source]
        source: LocaleError,
    },
    #[error("{cell} changed since it was read: expected '{expected}', found '{actual}'")]
    Conflict {
        cell: String,
        expected: String,
        actual: String,
    },
    #[error("Write to {cell} failed: {source}")]
    WriteFailed {
        cell: String,
        #[source]
        source: SheetsError,
    },
}

/// Where a write lands: spreadsheet, the range the row was located in, and the row.
#[derive(Debug, Clone, Copy)]
pub struct WriteTarget<'a> {
    pub spreadsheet_id: &'a str,
    pub range: &'a SheetRange,
    pub row_number: u32,
}

/// A completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub cell: String,
    pub written: String,
}

pub struct CellWriter<'a> {
    api: &'a dyn SheetsApi,
    fields: &'a FieldColumnMap,
}

impl<'a> CellWriter<'a> {
    pub fn new(api: &'a dyn SheetsApi, fields: &'a FieldColumnMap) -> Self {
        Self { api, fields }
    }

    fn resolve(&self, field: &str) -> Result<&'static FieldSpec, WriteError> {
        self.fields
            .resolve(field)
            .ok_or_else(|| WriteError::InvalidField {
                field: field.to_string(),
                allowed: self.fields.names(),
            })
    }

    /// Resolve `field` and render `value` for it, without touching the store.
    pub fn encode(
        &self,
        field: &str,
        value: &FieldInput,
    ) -> Result<(&'static FieldSpec, String), WriteError> {
        let spec = self.resolve(field)?;
        let encoded = spec
            .format
            .encode(value)
            .map_err(|source| WriteError::InvalidValue {
                field: spec.name,
                source,
            })?;
        Ok((spec, encoded))
    }

    /// [`encode`](Self::encode), plus the address of the cell it would land in.
    pub fn prepare(
        &self,
        target: &WriteTarget<'_>,
        field: &str,
        value: &FieldInput,
    ) -> Result<(CellAddress, String), WriteError> {
        let (spec, encoded) = self.encode(field, value)?;
        Ok((target.range.cell(spec.column, target.row_number), encoded))
    }

    /// Write `value` into `field` of the target row as user-entered input.
    pub async fn update(
        &self,
        target: &WriteTarget<'_>,
        field: &str,
        value: &FieldInput,
    ) -> Result<WriteOutcome, WriteError> {
        let (cell, encoded) = self.prepare(target, field, value)?;
        self.write(target, cell, encoded).await
    }

    /// Like [`update`](Self::update), but first re-reads the target cell and
    /// aborts if it no longer holds `expected`. Numeric fields compare by value.
    ///
    /// This narrows the window for lost updates; it cannot close it, since the
    /// store offers no compare-and-set.
    pub async fn update_checked(
        &self,
        target: &WriteTarget<'_>,
        field: &str,
        value: &FieldInput,
        expected: &str,
    ) -> Result<WriteOutcome, WriteError> {
        let (spec, encoded) = self.encode(field, value)?;
        let cell = target.range.cell(spec.column, target.row_number);
        let address = cell.to_string();

        let current = self
            .api
            .get_values(target.spreadsheet_id, &address)
            .await
            .map_err(|source| WriteError::WriteFailed {
                cell: address.clone(),
                source,
            })?;
        let actual = current
            .first()
            .and_then(|row| row.first())
            .map(|cell| cell.trim().to_string())
            .unwrap_or_default();
        if !spec.format.matches(expected, &actual) {
            warn!(cell = %address, expected, actual = %actual, "write rejected, cell changed");
            return Err(WriteError::Conflict {
                cell: address,
                expected: expected.to_string(),
                actual,
            });
        }

        self.write(target, cell, encoded).await
    }

    async fn write(
        &self,
        target: &WriteTarget<'_>,
        cell: CellAddress,
        encoded: String,
    ) -> Result<WriteOutcome, WriteError> {
        let address = cell.to_string();
        self.api
            .update_values(target.spreadsheet_id, &address, vec![vec![encoded.clone()]])
            .await
            .map_err(|source| {
                warn!(cell = %address, error = %source, "cell write failed");
                WriteError::WriteFailed {
                    cell: address.clone(),
                    source,
                }
            })?;

        info!(cell = %address, value = %encoded, "cell written");
        Ok(WriteOutcome {
            cell: address,
            written: encoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::fields::FieldSpec;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records writes and serves a fixed value for single-cell reads.
    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<(String, String, Vec<Vec<String>>)>>,
        current: Option<String>,
        fail_writes: bool,
    }

    #[async_trait]
    impl SheetsApi for Recorder {
        async fn get_values(
            &self,
            _spreadsheet_id: &str,
            _range: &str,
        ) -> Result<Vec<Vec<String>>, SheetsError> {
            Ok(self
                .current
                .iter()
                .map(|value| vec![value.clone()])
                .collect())
        }

        async fn update_values(
            &self,
            spreadsheet_id: &str,
            range: &str,
            rows: Vec<Vec<String>>,
        ) -> Result<(), SheetsError> {
            if self.fail_writes {
                return Err(SheetsError::Status {
                    status: 403,
                    message: "The caller does not have permission".into(),
                });
            }
            self.writes
                .lock()
                .unwrap()
                .push((spreadsheet_id.into(), range.into(), rows));
            Ok(())
        }
    }

    const FIELDS: FieldColumnMap = FieldColumnMap::new(&[
        FieldSpec::text("status", 4),
        FieldSpec::decimal("peso_q1", 1),
        FieldSpec::text("far", 30),
    ]);
    const RANGE: SheetRange = SheetRange::new("PARAMETROS", "A:H");

    fn target() -> WriteTarget<'static> {
        WriteTarget {
            spreadsheet_id: "sheet-1",
            range: &RANGE,
            row_number: 4,
        }
    }

    #[tokio::test]
    async fn writes_one_formatted_cell() {
        let api = Recorder::default();
        let writer = CellWriter::new(&api, &FIELDS);

        let outcome = writer
            .update(&target(), "peso_q1", &FieldInput::Number(2.5))
            .await
            .unwrap();

        assert_eq!(outcome.cell, "PARAMETROS!B4");
        assert_eq!(outcome.written, "2,5");
        let writes = api.writes.lock().unwrap();
        assert_eq!(
            *writes,
            vec![(
                "sheet-1".to_string(),
                "PARAMETROS!B4".to_string(),
                vec![vec!["2,5".to_string()]]
            )]
        );
    }

    #[tokio::test]
    async fn columns_beyond_z_use_two_letters() {
        let api = Recorder::default();
        let writer = CellWriter::new(&api, &FIELDS);
        let outcome = writer
            .update(&target(), "far", &FieldInput::Text("ok".into()))
            .await
            .unwrap();
        assert_eq!(outcome.cell, "PARAMETROS!AE4");
    }

    #[tokio::test]
    async fn unknown_field_is_rejected_before_io() {
        let api = Recorder::default();
        let writer = CellWriter::new(&api, &FIELDS);
        let err = writer
            .update(&target(), "peso_q9", &FieldInput::Number(1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::InvalidField { .. }));
        assert!(err.to_string().contains("status, peso_q1, far"));
        assert!(api.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_numbers_are_rejected() {
        let api = Recorder::default();
        let writer = CellWriter::new(&api, &FIELDS);
        let err = writer
            .update(&target(), "peso_q1", &FieldInput::Text("muito".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::InvalidValue { field: "peso_q1", .. }));
    }

    #[tokio::test]
    async fn upstream_failure_is_wrapped() {
        let api = Recorder {
            fail_writes: true,
            ..Default::default()
        };
        let writer = CellWriter::new(&api, &FIELDS);
        let err = writer
            .update(&target(), "status", &FieldInput::Text("Aprovado".into()))
            .await
            .unwrap_err();
        match err {
            WriteError::WriteFailed { cell, source } => {
                assert_eq!(cell, "PARAMETROS!E4");
                assert!(source.to_string().contains("permission"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn checked_write_aborts_on_changed_cell() {
        let api = Recorder {
            current: Some("Em análise".into()),
            ..Default::default()
        };
        let writer = CellWriter::new(&api, &FIELDS);

        let err = writer
            .update_checked(&target(), "status", &FieldInput::Text("Aprovado".into()), "Pendente")
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Conflict { ref actual, .. } if actual == "Em análise"));
        assert!(api.writes.lock().unwrap().is_empty());

        writer
            .update_checked(&target(), "status", &FieldInput::Text("Aprovado".into()), "Em análise")
            .await
            .unwrap();
        assert_eq!(api.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn checked_write_compares_decimals_by_value() {
        let api = Recorder {
            current: Some("0,3".into()),
            ..Default::default()
        };
        let writer = CellWriter::new(&api, &FIELDS);

        let outcome = writer
            .update_checked(&target(), "peso_q1", &FieldInput::Number(0.4), "0.3")
            .await
            .unwrap();
        assert_eq!(outcome.written, "0,4");

        let err = writer
            .update_checked(&target(), "peso_q1", &FieldInput::Number(0.5), "0.35")
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Conflict { .. }));
    }
}
