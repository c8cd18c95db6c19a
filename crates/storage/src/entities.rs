use ledgerlink_resolve::{EntityConfig, EntityConfigSet, Resolvable, RoutingDecision};
use serde::Serialize;
use thiserror::Error;

use crate::db::Database;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("entity '{entity}' does not implement lookup method '{method}'")]
    UnknownTargetMethod { entity: &'static str, method: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct GaugeRecord {
    pub id: i64,
    pub gauge_id: String,
    pub serial_number: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Gauge lookups addressable by arbitrary identifier: primary key, gauge
/// tag, or serial number. The router picks the query; unrouted method names
/// come back as errors instead of silently missing.
pub struct GaugeRepo<'a> {
    db: &'a Database,
    config: &'a EntityConfig,
}

impl<'a> GaugeRepo<'a> {
    pub fn new(db: &'a Database, registry: &'a EntityConfigSet) -> Self {
        Self {
            db,
            config: registry.config_for("gauge"),
        }
    }
}

impl Resolvable for GaugeRepo<'_> {
    type Entity = GaugeRecord;
    type Error = StorageError;

    fn config(&self) -> &EntityConfig {
        self.config
    }

    async fn dispatch(
        &self,
        decision: &RoutingDecision,
    ) -> Result<Option<GaugeRecord>, StorageError> {
        match decision.target_method.as_str() {
            "find_by_primary_key" => match decision.input.parse::<i64>() {
                Ok(id) => gauge_where(self.db, "id = ?", &id.to_string()).await,
                // Non-numeric input cannot name a primary key.
                Err(_) => Ok(None),
            },
            "find_by_gauge_id" => gauge_where(self.db, "gauge_id = ?", &decision.input).await,
            "find_by_serial" => gauge_where(self.db, "serial_number = ?", &decision.input).await,
            "find_by_business_id" => {
                // Catch-all: walk the configured business-id columns in order.
                for column in &self.config.business_id_columns {
                    let clause = match column.as_str() {
                        "gauge_id" => "gauge_id = ?",
                        "serial_number" => "serial_number = ?",
                        other => {
                            tracing::warn!(column = other, "unknown gauge business-id column");
                            continue;
                        }
                    };
                    if let Some(hit) = gauge_where(self.db, clause, &decision.input).await? {
                        return Ok(Some(hit));
                    }
                }
                Ok(None)
            }
            other => Err(StorageError::UnknownTargetMethod {
                entity: "gauge",
                method: other.to_string(),
            }),
        }
    }
}

async fn gauge_where(
    db: &Database,
    clause: &str,
    value: &str,
) -> Result<Option<GaugeRecord>, StorageError> {
    // `clause` is one of the fixed literals above, never caller input.
    let sql = format!(
        "SELECT id, gauge_id, serial_number, description FROM gauges WHERE {clause}"
    );
    let row = sqlx::query_as::<_, (i64, String, Option<String>, Option<String>)>(&sql)
        .bind(value)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row.map(|r| GaugeRecord {
        id: r.0,
        gauge_id: r.1,
        serial_number: r.2,
        description: r.3,
    }))
}

/// User lookups addressable by primary key, email, or username.
pub struct UserRepo<'a> {
    db: &'a Database,
    config: &'a EntityConfig,
}

impl<'a> UserRepo<'a> {
    pub fn new(db: &'a Database, registry: &'a EntityConfigSet) -> Self {
        Self {
            db,
            config: registry.config_for("user"),
        }
    }
}

impl Resolvable for UserRepo<'_> {
    type Entity = UserRecord;
    type Error = StorageError;

    fn config(&self) -> &EntityConfig {
        self.config
    }

    async fn dispatch(
        &self,
        decision: &RoutingDecision,
    ) -> Result<Option<UserRecord>, StorageError> {
        match decision.target_method.as_str() {
            "find_by_primary_key" => match decision.input.parse::<i64>() {
                Ok(id) => user_where(self.db, "id = ?", &id.to_string()).await,
                Err(_) => Ok(None),
            },
            "find_by_email" => user_where(self.db, "email = ?", &decision.input).await,
            "find_by_username" | "find_by_business_id" => {
                user_where(self.db, "username = ?", &decision.input).await
            }
            other => Err(StorageError::UnknownTargetMethod {
                entity: "user",
                method: other.to_string(),
            }),
        }
    }
}

async fn user_where(
    db: &Database,
    clause: &str,
    value: &str,
) -> Result<Option<UserRecord>, StorageError> {
    let sql = format!("SELECT id, username, email, display_name FROM users WHERE {clause}");
    let row = sqlx::query_as::<_, (i64, String, Option<String>, Option<String>)>(&sql)
        .bind(value)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row.map(|r| UserRecord {
        id: r.0,
        username: r.1,
        email: r.2,
        display_name: r.3,
    }))
}
