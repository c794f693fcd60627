//! Static logical-field → column tables for editable sheets.

use super::a1::column_letter;
use super::locale::{self, LocaleError};

/// How a field's value is rendered before being written as user-entered input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Written verbatim.
    Text,
    /// One decimal place, comma separator.
    Decimal,
    /// `R$` with thousands grouping and two decimal places.
    Currency,
}

/// A value as received from a client, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text(String),
    Number(f64),
}

impl FieldFormat {
    /// Render `input` the way a user would type it into the sheet.
    pub fn encode(self, input: &FieldInput) -> Result<String, LocaleError> {
        match (self, input) {
            (Self::Text, FieldInput::Text(text)) => Ok(text.clone()),
            (Self::Text, FieldInput::Number(n)) => Ok(n.to_string()),
            (Self::Decimal, FieldInput::Number(n)) => Ok(locale::format_decimal(*n)),
            (Self::Decimal, FieldInput::Text(text)) => {
                locale::parse_decimal(text).map(locale::format_decimal)
            }
            (Self::Currency, FieldInput::Number(n)) => Ok(locale::format_currency(*n)),
            (Self::Currency, FieldInput::Text(text)) => {
                locale::parse_decimal(text).map(locale::format_currency)
            }
        }
    }

    /// Whether a cell displaying `actual` still holds what a client saw as
    /// `expected`. Numeric fields compare by value, so `0.3` matches `0,3`.
    pub fn matches(self, expected: &str, actual: &str) -> bool {
        let (expected, actual) = (expected.trim(), actual.trim());
        if expected == actual {
            return true;
        }
        match self {
            Self::Text => false,
            Self::Decimal | Self::Currency => {
                match (locale::parse_decimal(expected), locale::parse_decimal(actual)) {
                    (Ok(expected), Ok(actual)) => (expected - actual).abs() < 1e-9,
                    _ => false,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Zero-based column index.
    pub column: usize,
    pub format: FieldFormat,
}

impl FieldSpec {
    pub const fn text(name: &'static str, column: usize) -> Self {
        Self {
            name,
            column,
            format: FieldFormat::Text,
        }
    }

    pub const fn decimal(name: &'static str, column: usize) -> Self {
        Self {
            name,
            column,
            format: FieldFormat::Decimal,
        }
    }

    pub const fn currency(name: &'static str, column: usize) -> Self {
        Self {
            name,
            column,
            format: FieldFormat::Currency,
        }
    }

    pub fn column_letter(&self) -> String {
        column_letter(self.column)
    }
}

/// Immutable per-sheet mapping, defined at compile time.
#[derive(Debug, Clone, Copy)]
pub struct FieldColumnMap {
    fields: &'static [FieldSpec],
}

impl FieldColumnMap {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    pub fn resolve(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|spec| spec.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: FieldColumnMap = FieldColumnMap::new(&[
        FieldSpec::text("status", 4),
        FieldSpec::decimal("peso_q1", 1),
        FieldSpec::currency("meta_vendas", 2),
    ]);

    #[test]
    fn resolves_known_fields() {
        let spec = MAP.resolve("status").unwrap();
        assert_eq!(spec.column, 4);
        assert_eq!(spec.column_letter(), "E");
        assert!(MAP.resolve("Status").is_none());
        assert_eq!(MAP.names(), vec!["status", "peso_q1", "meta_vendas"]);
    }

    #[test]
    fn numeric_fields_match_by_value() {
        assert!(FieldFormat::Decimal.matches("0.3", "0,3"));
        assert!(FieldFormat::Decimal.matches("7", "7,0"));
        assert!(!FieldFormat::Decimal.matches("0.3", "0,4"));
        assert!(FieldFormat::Currency.matches("1500.5", "R$ 1.500,50"));
        assert!(!FieldFormat::Currency.matches("", "R$ 0,00"));

        assert!(FieldFormat::Text.matches(" Pendente ", "Pendente"));
        assert!(!FieldFormat::Text.matches("3", "3,0"));
    }

    #[test]
    fn encodes_per_format() {
        let text = FieldFormat::Text;
        assert_eq!(
            text.encode(&FieldInput::Text("Aprovado".into())).unwrap(),
            "Aprovado"
        );
        assert_eq!(text.encode(&FieldInput::Number(3.0)).unwrap(), "3");

        let decimal = FieldFormat::Decimal;
        assert_eq!(decimal.encode(&FieldInput::Number(0.35)).unwrap(), "0,3");
        assert_eq!(decimal.encode(&FieldInput::Text("7,26".into())).unwrap(), "7,3");
        assert_eq!(decimal.encode(&FieldInput::Text("40".into())).unwrap(), "40,0");
        assert!(decimal.encode(&FieldInput::Text("alto".into())).is_err());

        let currency = FieldFormat::Currency;
        assert_eq!(
            currency.encode(&FieldInput::Number(15000.0)).unwrap(),
            "R$ 15.000,00"
        );
        assert_eq!(
            currency.encode(&FieldInput::Text("1.500,5".into())).unwrap(),
            "R$ 1.500,50"
        );
    }
}
