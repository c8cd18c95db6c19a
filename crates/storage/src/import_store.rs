use chrono::NaiveDate;
use ledgerlink_core::{MatchOrigin, Money, PaymentId, RentalPayment, Tenant, TenantId};
use ledgerlink_import::{
    BatchMeta, BatchStats, ImportStore, ImportedTransaction, PaymentCandidate, PaymentLookup,
    TransactionLink,
};
use serde::Serialize;

use crate::db::Database;

#[derive(Debug, Clone, Serialize)]
pub struct ImportBatchRecord {
    pub id: i64,
    pub public_id: String,
    pub file_name: String,
    pub imported_by: Option<String>,
    pub total: i64,
    pub matched: i64,
    pub unmatched: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankTransactionRecord {
    pub id: i64,
    pub batch_id: i64,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: String,
    pub reference: Option<String>,
    pub source_row: i64,
}

impl PaymentLookup for Database {
    type Error = sqlx::Error;

    async fn find_by_amount_and_date_window(
        &self,
        amount_cents: i64,
        date: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<PaymentCandidate>, sqlx::Error> {
        let start = date - chrono::Duration::days(window_days);
        let end = date + chrono::Duration::days(window_days);

        let rows = sqlx::query_as::<_, (i64, String, i64, NaiveDate)>(
            "SELECT p.id, t.name, p.amount_cents, p.paid_on
             FROM rental_payments p
             JOIN tenants t ON t.id = p.tenant_id
             WHERE p.amount_cents = ?
               AND p.paid_on BETWEEN ? AND ?
               AND NOT EXISTS (SELECT 1 FROM transaction_links l WHERE l.payment_id = p.id)
             ORDER BY p.id",
        )
        .bind(amount_cents)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(candidate_from_row).collect())
    }

    async fn find_by_fuzzy_amount(
        &self,
        amount_cents: i64,
        tolerance_cents: i64,
    ) -> Result<Vec<PaymentCandidate>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (i64, String, i64, NaiveDate)>(
            "SELECT p.id, t.name, p.amount_cents, p.paid_on
             FROM rental_payments p
             JOIN tenants t ON t.id = p.tenant_id
             WHERE ABS(p.amount_cents - ?) <= ?
               AND NOT EXISTS (SELECT 1 FROM transaction_links l WHERE l.payment_id = p.id)
             ORDER BY p.id",
        )
        .bind(amount_cents)
        .bind(tolerance_cents)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(candidate_from_row).collect())
    }
}

fn candidate_from_row(row: (i64, String, i64, NaiveDate)) -> PaymentCandidate {
    PaymentCandidate {
        payment_id: row.0,
        tenant_name: row.1,
        amount_cents: row.2,
        paid_on: row.3,
    }
}

impl ImportStore for Database {
    type Error = sqlx::Error;

    async fn create_import_batch(&self, meta: &BatchMeta) -> Result<i64, sqlx::Error> {
        let public_id = uuid::Uuid::new_v4().to_string();
        let result = sqlx::query(
            "INSERT INTO import_batches (public_id, file_name, imported_by) VALUES (?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&meta.file_name)
        .bind(meta.imported_by.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Save + link run inside one SQL transaction, so a failed link rolls
    /// the bank-transaction row back out as well.
    async fn record_transaction(
        &self,
        batch_id: i64,
        tx: &ImportedTransaction,
        link: Option<&TransactionLink<'_>>,
    ) -> Result<i64, sqlx::Error> {
        let mut dbtx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO bank_transactions
             (batch_id, date, amount_cents, description, reference, source_row)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(batch_id)
        .bind(tx.date)
        .bind(tx.amount_cents)
        .bind(&tx.description)
        .bind(tx.reference.as_deref())
        .bind(tx.source_row as i64)
        .execute(&mut *dbtx)
        .await?;
        let transaction_id = result.last_insert_rowid();

        if let Some(link) = link {
            sqlx::query(
                "INSERT INTO transaction_links
                 (transaction_id, payment_id, confidence, origin, linked_by)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(transaction_id)
            .bind(link.payment_id)
            .bind(link.confidence as f64)
            .bind(link.origin.to_string())
            .bind(link.linked_by)
            .execute(&mut *dbtx)
            .await?;
        }

        dbtx.commit().await?;
        Ok(transaction_id)
    }

    async fn update_import_batch(
        &self,
        batch_id: i64,
        stats: &BatchStats,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE import_batches SET total = ?, matched = ?, unmatched = ? WHERE id = ?")
            .bind(stats.total as i64)
            .bind(stats.matched as i64)
            .bind(stats.unmatched as i64)
            .bind(batch_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Manual-review link. Auto links ride along with `record_transaction`;
/// this is the path review tooling takes afterwards.
pub async fn link_transaction(
    db: &Database,
    transaction_id: i64,
    payment_id: i64,
    confidence: f32,
    linked_by: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO transaction_links
         (transaction_id, payment_id, confidence, origin, linked_by)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(transaction_id)
    .bind(payment_id)
    .bind(confidence as f64)
    .bind(MatchOrigin::Manual.to_string())
    .bind(linked_by)
    .execute(&db.pool)
    .await?;
    Ok(())
}

pub async fn get_batch(db: &Database, batch_id: i64) -> Result<Option<ImportBatchRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, String, String, Option<String>, i64, i64, i64)>(
        "SELECT id, public_id, file_name, imported_by, total, matched, unmatched
         FROM import_batches WHERE id = ?",
    )
    .bind(batch_id)
    .fetch_optional(&db.pool)
    .await?;

    Ok(row.map(|r| ImportBatchRecord {
        id: r.0,
        public_id: r.1,
        file_name: r.2,
        imported_by: r.3,
        total: r.4,
        matched: r.5,
        unmatched: r.6,
    }))
}

/// Transactions in a batch that have no link yet — the manual-review queue.
pub async fn get_unmatched_transactions(
    db: &Database,
    batch_id: i64,
) -> Result<Vec<BankTransactionRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, i64, NaiveDate, i64, String, Option<String>, i64)>(
        "SELECT b.id, b.batch_id, b.date, b.amount_cents, b.description, b.reference, b.source_row
         FROM bank_transactions b
         WHERE b.batch_id = ?
           AND NOT EXISTS (SELECT 1 FROM transaction_links l WHERE l.transaction_id = b.id)
         ORDER BY b.source_row",
    )
    .bind(batch_id)
    .fetch_all(&db.pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| BankTransactionRecord {
            id: r.0,
            batch_id: r.1,
            date: r.2,
            amount_cents: r.3,
            description: r.4,
            reference: r.5,
            source_row: r.6,
        })
        .collect())
}

pub async fn insert_tenant(db: &Database, tenant: &Tenant) -> Result<TenantId, sqlx::Error> {
    let result = sqlx::query("INSERT INTO tenants (name, email, unit) VALUES (?, ?, ?)")
        .bind(&tenant.name)
        .bind(tenant.email.as_deref())
        .bind(tenant.unit.as_deref())
        .execute(&db.pool)
        .await?;
    Ok(TenantId(result.last_insert_rowid()))
}

pub async fn insert_rental_payment(
    db: &Database,
    payment: &RentalPayment,
) -> Result<PaymentId, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO rental_payments (tenant_id, amount_cents, paid_on, memo) VALUES (?, ?, ?, ?)",
    )
    .bind(payment.tenant_id.0)
    .bind(payment.amount.to_cents())
    .bind(payment.paid_on)
    .bind(payment.memo.as_deref())
    .execute(&db.pool)
    .await?;
    Ok(PaymentId(result.last_insert_rowid()))
}

pub async fn get_rental_payment(
    db: &Database,
    id: PaymentId,
) -> Result<Option<RentalPayment>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, i64, String, i64, NaiveDate, Option<String>)>(
        "SELECT p.id, p.tenant_id, t.name, p.amount_cents, p.paid_on, p.memo
         FROM rental_payments p
         JOIN tenants t ON t.id = p.tenant_id
         WHERE p.id = ?",
    )
    .bind(id.0)
    .fetch_optional(&db.pool)
    .await?;

    Ok(row.map(|r| RentalPayment {
        id: Some(PaymentId(r.0)),
        tenant_id: TenantId(r.1),
        tenant_name: r.2,
        amount: Money::from_cents(r.3),
        paid_on: r.4,
        memo: r.5,
    }))
}
