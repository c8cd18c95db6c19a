use serde::Serialize;

use crate::util::similarity;

/// Minimum similarity a header must reach against a synonym before it is
/// accepted for a canonical field.
pub const HEADER_MATCH_THRESHOLD: f32 = 0.6;

const DATE_SYNONYMS: &[&str] = &[
    "date",
    "transaction date",
    "posted date",
    "post date",
    "payment date",
    "value date",
];

const AMOUNT_SYNONYMS: &[&str] = &[
    "amount",
    "transaction amount",
    "value",
    "credit amount",
    "debit amount",
    "money in",
];

const DESCRIPTION_SYNONYMS: &[&str] = &[
    "description",
    "memo",
    "details",
    "narrative",
    "payee",
    "transaction details",
];

const REFERENCE_SYNONYMS: &[&str] = &[
    "reference",
    "ref",
    "reference number",
    "transaction id",
    "cheque number",
    "check number",
    "receipt number",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnRef {
    pub index: usize,
    pub header: String,
}

/// Which spreadsheet column feeds each canonical field. Derived once per
/// import batch from the header row and applied to every data row.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMapping {
    pub date: ColumnRef,
    pub amount: ColumnRef,
    pub description: ColumnRef,
    pub reference: Option<ColumnRef>,
}

/// Map a header row to canonical fields by fuzzy-matching each header
/// against a synonym dictionary. Best-effort by design: headers that clear
/// nothing fall back to position (date, amount, description = columns
/// 0, 1, 2) so an oddly exported sheet still imports, just with weaker
/// matching. `reference` has no positional fallback.
pub fn detect_columns(headers: &[String]) -> ColumnMapping {
    let mut claimed: Vec<usize> = Vec::new();

    let mut take = |synonyms: &[&str], field: &'static str| -> Option<ColumnRef> {
        let found = best_header(headers, synonyms, &claimed);
        match &found {
            Some(col) => claimed.push(col.index),
            None => tracing::warn!(field, "no header cleared the match threshold"),
        }
        found
    };

    let date = take(DATE_SYNONYMS, "date");
    let amount = take(AMOUNT_SYNONYMS, "amount");
    let description = take(DESCRIPTION_SYNONYMS, "description");
    let reference = take(REFERENCE_SYNONYMS, "reference");

    // A fallback must not alias a column some other field already claimed
    // by name, so it takes the first unclaimed index at or after the
    // preferred one, and claims it in turn.
    let mut positional = |preferred: usize| -> ColumnRef {
        let index = (preferred..)
            .find(|i| !claimed.contains(i))
            .unwrap_or(preferred);
        claimed.push(index);
        ColumnRef {
            index,
            header: headers.get(index).cloned().unwrap_or_default(),
        }
    };

    ColumnMapping {
        date: date.unwrap_or_else(|| positional(0)),
        amount: amount.unwrap_or_else(|| positional(1)),
        description: description.unwrap_or_else(|| positional(2)),
        reference,
    }
}

/// Best-scoring unclaimed header for a synonym set, if it clears the
/// threshold. Strictly-greater comparison keeps the earliest header on
/// ties, so repeated runs over the same row are deterministic.
fn best_header(headers: &[String], synonyms: &[&str], claimed: &[usize]) -> Option<ColumnRef> {
    let mut best: Option<(usize, f32)> = None;

    for (index, header) in headers.iter().enumerate() {
        if claimed.contains(&index) {
            continue;
        }
        let score = synonyms
            .iter()
            .map(|s| similarity(header, s))
            .fold(0.0f32, f32::max);
        if score > HEADER_MATCH_THRESHOLD && best.map_or(true, |(_, b)| score > b) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| ColumnRef {
        index,
        header: headers.get(index).cloned().unwrap_or_default(),
    })
}
