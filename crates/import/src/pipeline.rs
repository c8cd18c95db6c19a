use std::io::Read;

use ledgerlink_core::MatchOrigin;
use serde::Serialize;

use crate::columns::detect_columns;
use crate::match_engine::{MatchCandidate, MatchEngine, PaymentLookup};
use crate::row::{parse_row, ImportError, ImportedTransaction};

/// Batch metadata recorded when an import starts.
#[derive(Debug, Clone)]
pub struct BatchMeta {
    pub file_name: String,
    pub imported_by: Option<String>,
}

/// Final batch counters, written once when the batch completes.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchStats {
    pub total: u32,
    pub matched: u32,
    pub unmatched: u32,
}

/// Link recorded alongside a transaction when the auto-link rule fires.
/// Manual review links go through storage directly with
/// `MatchOrigin::Manual`.
#[derive(Debug, Clone)]
pub struct TransactionLink<'a> {
    pub payment_id: i64,
    pub confidence: f32,
    pub origin: MatchOrigin,
    pub linked_by: Option<&'a str>,
}

/// Write surface the pipeline needs from storage.
#[allow(async_fn_in_trait)]
pub trait ImportStore {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create_import_batch(&self, meta: &BatchMeta) -> Result<i64, Self::Error>;

    /// Persist one transaction and, when present, its link. The pair must
    /// commit atomically: on failure neither the transaction row nor the
    /// link may remain.
    async fn record_transaction(
        &self,
        batch_id: i64,
        tx: &ImportedTransaction,
        link: Option<&TransactionLink<'_>>,
    ) -> Result<i64, Self::Error>;

    async fn update_import_batch(
        &self,
        batch_id: i64,
        stats: &BatchStats,
    ) -> Result<(), Self::Error>;
}

/// Per-transaction import outcome, returned to the caller for review UIs.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionOutcome {
    pub transaction_id: i64,
    pub source_row: usize,
    pub description: String,
    pub amount_cents: i64,
    pub candidates: Vec<MatchCandidate>,
    /// Payment id this transaction was auto-linked to, if the rule fired.
    pub auto_linked: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub batch_id: i64,
    pub total: u32,
    pub matched: u32,
    pub unmatched: u32,
    pub transactions: Vec<TransactionOutcome>,
}

/// Import a bank CSV end to end: detect columns from the header row, parse
/// every data row, then save + match + auto-link each transaction and close
/// the batch with its counters.
///
/// One malformed row aborts the whole batch before anything is persisted;
/// parsing happens up front so a partial batch never reaches storage.
pub async fn run_import<S>(
    data: impl Read,
    store: &S,
    engine: &MatchEngine,
    meta: &BatchMeta,
) -> Result<ImportSummary, ImportError>
where
    S: ImportStore + PaymentLookup,
{
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(data);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mapping = detect_columns(&headers);

    // Header occupies spreadsheet row 1; data starts at row 2.
    let mut parsed: Vec<ImportedTransaction> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        parsed.push(parse_row(&record, &mapping, idx + 2)?);
    }
    if parsed.is_empty() {
        return Err(ImportError::NoDataRows);
    }

    let batch_id = store
        .create_import_batch(meta)
        .await
        .map_err(store_err)?;
    tracing::info!(batch_id, file = %meta.file_name, rows = parsed.len(), "import batch started");

    let mut stats = BatchStats::default();
    let mut transactions = Vec::with_capacity(parsed.len());

    for tx in &parsed {
        let candidates = engine.find_matches(tx, store).await.map_err(store_err)?;

        let best = engine.auto_link_candidate(&candidates);
        let link = best.map(|b| TransactionLink {
            payment_id: b.payment_id,
            confidence: b.confidence,
            origin: MatchOrigin::Auto,
            linked_by: meta.imported_by.as_deref(),
        });
        let transaction_id = store
            .record_transaction(batch_id, tx, link.as_ref())
            .await
            .map_err(store_err)?;

        let auto_linked = best.map(|b| {
            tracing::info!(
                transaction_id,
                payment_id = b.payment_id,
                confidence = b.confidence,
                "auto-linked transaction"
            );
            b.payment_id
        });

        stats.total += 1;
        if auto_linked.is_some() {
            stats.matched += 1;
        } else {
            stats.unmatched += 1;
        }

        transactions.push(TransactionOutcome {
            transaction_id,
            source_row: tx.source_row,
            description: tx.description.clone(),
            amount_cents: tx.amount_cents,
            candidates,
            auto_linked,
        });
    }

    store
        .update_import_batch(batch_id, &stats)
        .await
        .map_err(store_err)?;
    tracing::info!(
        batch_id,
        total = stats.total,
        matched = stats.matched,
        "import batch complete"
    );

    Ok(ImportSummary {
        batch_id,
        total: stats.total,
        matched: stats.matched,
        unmatched: stats.unmatched,
        transactions,
    })
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> ImportError {
    ImportError::Storage(Box::new(e))
}
