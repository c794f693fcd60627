//! Spreadsheet store access: reads, row lookup and single-cell writes.

pub mod a1;
pub mod client;
pub mod errors;
pub mod fields;
pub mod json;
pub mod locale;
pub mod locate;
pub mod writer;

pub use a1::{CellAddress, SheetRange, column_index, column_letter};
pub use client::{SheetsApi, SheetsClient, SheetsCredentials};
pub use errors::SheetsError;
pub use fields::{FieldColumnMap, FieldFormat, FieldInput, FieldSpec};
pub use locate::{SheetRowRef, locate, locate_row};
pub use writer::{CellWriter, WriteError, WriteOutcome, WriteTarget};
