use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

/// Handle to the SQLite database. A thin wrapper over the pool; the import
/// traits are implemented on this type (see `import_store`).
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: Pool<Sqlite>,
}

pub async fn create_db(path: &Path) -> Result<Database, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

/// In-memory database with the full schema; used by tests and nothing else.
/// Must stay at one connection — each SQLite `:memory:` connection is its
/// own database.
pub async fn create_memory_db() -> Result<Database, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT,
            unit TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rental_payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            amount_cents INTEGER NOT NULL,
            paid_on TEXT NOT NULL,
            memo TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (tenant_id) REFERENCES tenants(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gauges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            gauge_id TEXT NOT NULL UNIQUE,
            serial_number TEXT UNIQUE,
            description TEXT,
            calibration_due TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT UNIQUE,
            display_name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            public_id TEXT NOT NULL UNIQUE,
            file_name TEXT NOT NULL,
            imported_by TEXT,
            total INTEGER NOT NULL DEFAULT 0,
            matched INTEGER NOT NULL DEFAULT 0,
            unmatched INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bank_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            description TEXT NOT NULL,
            reference TEXT,
            source_row INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (batch_id) REFERENCES import_batches(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transaction_links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER NOT NULL UNIQUE,
            payment_id INTEGER NOT NULL,
            confidence REAL NOT NULL,
            origin TEXT NOT NULL,
            linked_by TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (transaction_id) REFERENCES bank_transactions(id) ON DELETE CASCADE,
            FOREIGN KEY (payment_id) REFERENCES rental_payments(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

const DEMO_TENANTS: &[(&str, &str, &str)] = &[
    ("John Smith", "john.smith@example.com", "1A"),
    ("Jane Doe", "jane.doe@example.com", "2B"),
    ("Mei Chan", "mei.chan@example.com", "3C"),
];

const DEMO_GAUGES: &[(&str, &str, &str)] = &[
    ("AC0002", "SN-10042", "Pressure gauge, line A"),
    ("TRQ0015B", "SN-10388", "Torque wrench, bay 2"),
];

/// First-run fixtures for the demo binary: a few tenants, one open rent
/// payment each, and a couple of gauges. No-op when tenants already exist.
pub async fn seed_demo_data(db: &Database) -> Result<(), sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants")
        .fetch_one(&db.pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    for (name, email, unit) in DEMO_TENANTS {
        let result = sqlx::query("INSERT INTO tenants (name, email, unit) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(unit)
            .execute(&db.pool)
            .await?;
        sqlx::query(
            "INSERT INTO rental_payments (tenant_id, amount_cents, paid_on, memo)
             VALUES (?, ?, date('now'), 'monthly rent')",
        )
        .bind(result.last_insert_rowid())
        .bind(120000i64)
        .execute(&db.pool)
        .await?;
    }

    for (gauge_id, serial, description) in DEMO_GAUGES {
        sqlx::query(
            "INSERT OR IGNORE INTO gauges (gauge_id, serial_number, description) VALUES (?, ?, ?)",
        )
        .bind(gauge_id)
        .bind(serial)
        .bind(description)
        .execute(&db.pool)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = create_memory_db().await.unwrap();
        run_migrations(&db.pool).await.unwrap();
    }

    #[tokio::test]
    async fn seed_runs_once() {
        let db = create_memory_db().await.unwrap();
        seed_demo_data(&db).await.unwrap();
        seed_demo_data(&db).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn create_db_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = create_db(&dir.path().join("test.db")).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM import_batches")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
