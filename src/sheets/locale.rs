//! pt-BR number formatting at the spreadsheet boundary.
//!
//! The backing spreadsheets use the Brazilian locale, so values are submitted
//! the way a user would type them there: `12,5` and `R$ 1.234,56`. Parsing
//! accepts both that form and plain `12.5` from JSON clients.

use num_format::{Locale, ToFormattedString};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocaleError {
    #[error("empty number")]
    Empty,
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

/// Render with one decimal place and a comma separator: `12.5 → "12,5"`.
pub fn format_decimal(value: f64) -> String {
    format!("{value:.1}").replace('.', ",")
}

/// Render as Brazilian currency with thousands grouping: `1234.5 → "R$ 1.234,50"`.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_formatted_string(&Locale::pt);
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {units},{:02}", cents % 100)
}

/// Parse a number written either pt-BR style (`1.234,5`) or plain (`1234.5`).
///
/// When a comma is present it is the decimal separator and dots are grouping.
/// Without a comma a single dot is a decimal point; several dots are grouping.
pub fn parse_decimal(input: &str) -> Result<f64, LocaleError> {
    let trimmed = input.trim();
    // Negative currency renders as `-R$ 45,68`.
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest.trim_start()),
        None => ("", trimmed),
    };
    let cleaned: String = sign
        .chars()
        .chain(unsigned.trim_start_matches("R$").chars())
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if cleaned.is_empty() {
        return Err(LocaleError::Empty);
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.matches('.').count() > 1 {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LocaleError::NotANumber(input.trim().to_string()))
}
