use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

use crate::columns::ColumnMapping;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}: invalid amount '{value}'")]
    InvalidAmount { row: usize, value: String },
    #[error("No data rows")]
    NoDataRows,
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// One bank-statement line, parsed from a spreadsheet row. Immutable once
/// built; `source_row` is the 1-based spreadsheet row (header = row 1).
#[derive(Debug, Clone, Serialize)]
pub struct ImportedTransaction {
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: String,
    pub reference: Option<String>,
    pub source_row: usize,
}

/// Parse one data row through the detected column mapping. Fails fast with
/// the row number attached; the pipeline aborts the batch on the first
/// malformed row.
pub fn parse_row(
    record: &csv::StringRecord,
    mapping: &ColumnMapping,
    source_row: usize,
) -> Result<ImportedTransaction, ImportError> {
    let date_field = record.get(mapping.date.index).unwrap_or_default();
    let date = parse_date(date_field).ok_or_else(|| ImportError::InvalidDate {
        row: source_row,
        value: date_field.to_string(),
    })?;

    let amount_field = record.get(mapping.amount.index).unwrap_or_default();
    let amount_cents = parse_amount(amount_field).ok_or_else(|| ImportError::InvalidAmount {
        row: source_row,
        value: amount_field.to_string(),
    })?;

    let description = record
        .get(mapping.description.index)
        .unwrap_or_default()
        .trim()
        .to_string();

    let reference = mapping
        .reference
        .as_ref()
        .and_then(|col| record.get(col.index))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(ImportedTransaction {
        date,
        amount_cents,
        description,
        reference,
        source_row,
    })
}

/// Lenient date parsing across the formats banks actually export.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%d %b %Y",
    ];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a money string to integer cents. Accepts currency symbols,
/// thousands separators and accounting-style parentheses for negatives.
pub fn parse_amount(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned = s.replace([',', '$', '£', '€', ' '], "");
    if cleaned.is_empty() {
        return None;
    }

    let mut dec = Decimal::from_str(&cleaned).ok()?;
    if negative {
        dec = -dec;
    }
    (dec * Decimal::from(100)).round().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::detect_columns;

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn amount_plain_decimal() {
        assert_eq!(parse_amount("1200.00"), Some(120000));
    }

    #[test]
    fn amount_with_symbol_and_commas() {
        assert_eq!(parse_amount("$1,234.56"), Some(123456));
    }

    #[test]
    fn amount_negative_and_parens() {
        assert_eq!(parse_amount("-50.00"), Some(-5000));
        assert_eq!(parse_amount("(75.25)"), Some(-7525));
    }

    #[test]
    fn amount_whole_number() {
        assert_eq!(parse_amount("505"), Some(50500));
    }

    #[test]
    fn amount_garbage_is_none() {
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("()"), None);
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn date_iso() {
        assert_eq!(
            parse_date("2025-03-10"),
            NaiveDate::from_ymd_opt(2025, 3, 10)
        );
    }

    #[test]
    fn date_us_slash() {
        assert_eq!(
            parse_date("03/10/2025"),
            NaiveDate::from_ymd_opt(2025, 3, 10)
        );
    }

    #[test]
    fn date_day_month_name() {
        assert_eq!(
            parse_date("10 Mar 2025"),
            NaiveDate::from_ymd_opt(2025, 3, 10)
        );
    }

    #[test]
    fn date_garbage_is_none() {
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date(""), None);
    }

    // ── parse_row ─────────────────────────────────────────────────────────────

    fn mapping() -> ColumnMapping {
        let headers: Vec<String> = ["Date", "Amount", "Description", "Reference"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        detect_columns(&headers)
    }

    #[test]
    fn parse_row_complete() {
        let record = csv::StringRecord::from(vec!["2025-03-10", "1200.00", "Smith rent", "R-99"]);
        let tx = parse_row(&record, &mapping(), 2).unwrap();
        assert_eq!(tx.amount_cents, 120000);
        assert_eq!(tx.description, "Smith rent");
        assert_eq!(tx.reference.as_deref(), Some("R-99"));
        assert_eq!(tx.source_row, 2);
    }

    #[test]
    fn parse_row_blank_reference_is_none() {
        let record = csv::StringRecord::from(vec!["2025-03-10", "1200.00", "Smith rent", "  "]);
        let tx = parse_row(&record, &mapping(), 2).unwrap();
        assert_eq!(tx.reference, None);
    }

    #[test]
    fn parse_row_bad_date_names_row() {
        let record = csv::StringRecord::from(vec!["tomorrow", "1200.00", "x", ""]);
        let err = parse_row(&record, &mapping(), 7).unwrap_err();
        assert!(matches!(err, ImportError::InvalidDate { row: 7, .. }));
    }

    #[test]
    fn parse_row_bad_amount_names_row() {
        let record = csv::StringRecord::from(vec!["2025-03-10", "lots", "x", ""]);
        let err = parse_row(&record, &mapping(), 4).unwrap_err();
        assert!(matches!(err, ImportError::InvalidAmount { row: 4, .. }));
    }
}
