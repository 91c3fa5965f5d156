//! PostgreSQL substrate for production use.
//!
//! All records live in one table keyed by `(namespace, collection, key)` with
//! the field map stored as JSONB. List appends and removals are single
//! `INSERT .. ON CONFLICT` / `UPDATE` statements, so PostgreSQL's row lock
//! gives the per-record atomicity the graph engine relies on.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Row;
use std::time::Duration;

use crate::types::{Fields, Value};
use super::{KvSubstrate, RecordKey, SubstrateError};

/// DDL for the record table. Run once before first use
/// (see [`PostgresSubstrate::ensure_schema`]).
pub const KV_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_records (
    namespace   TEXT  NOT NULL,
    collection  TEXT  NOT NULL,
    key         TEXT  NOT NULL,
    fields      JSONB NOT NULL DEFAULT '{}'::jsonb,
    PRIMARY KEY (namespace, collection, key)
)
"#;

/// Pool settings for [`PostgresSubstrate`].
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Connection string.
    pub database_url: String,
    /// Pool size cap (default: 10).
    pub max_connections: u32,
    /// Connections kept open while idle (default: 2).
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection (default: 10).
    pub connect_timeout_secs: u64,
    /// Seconds before an idle connection is closed (default: 300).
    pub idle_timeout_secs: u64,
    /// Seconds before any connection is recycled (default: 1800).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Read the `DATABASE_URL` and `DB_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unparseable numbers keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |name: &str, default: u64| {
            lookup(name).and_then(|s| s.parse().ok()).unwrap_or(default)
        };
        let count = |name: &str, default: u32| {
            lookup(name).and_then(|s| s.parse().ok()).unwrap_or(default)
        };
        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgresql://localhost/graphkv".to_string()),
            max_connections: count("DB_MAX_CONNECTIONS", 10),
            min_connections: count("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: number("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: number("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: number("DB_MAX_LIFETIME_SECS", 1800),
        }
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .test_before_acquire(true)
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Key-value substrate over a single `kv_records` table.
pub struct PostgresSubstrate {
    pool: PgPool,
}

impl PostgresSubstrate {
    /// Connect a pool and wrap it.
    pub async fn new(config: PostgresConfig) -> Result<Self, SubstrateError> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            "Connecting substrate pool"
        );
        let pool = config
            .pool_options()
            .connect(&config.database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self { pool })
    }

    /// Connect using [`PostgresConfig::from_env`].
    pub async fn from_env() -> Result<Self, SubstrateError> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Create the record table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), SubstrateError> {
        sqlx::query(KV_TABLE_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// Connectivity problems become `Unavailable`; everything else is `Backend`.
fn map_sqlx_error(e: sqlx::Error) -> SubstrateError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => SubstrateError::Unavailable(e.to_string()),
        other => SubstrateError::Backend(other.to_string()),
    }
}

#[async_trait]
impl KvSubstrate for PostgresSubstrate {
    async fn get(&self, key: &RecordKey) -> Result<Fields, SubstrateError> {
        let row = sqlx::query(
            r#"
            SELECT fields
            FROM kv_records
            WHERE namespace = $1 AND collection = $2 AND key = $3
            "#,
        )
        .bind(&key.namespace)
        .bind(&key.collection)
        .bind(&key.key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(r) => {
                let Json(fields): Json<Fields> = r.try_get("fields").map_err(map_sqlx_error)?;
                Ok(fields)
            }
            None => Err(SubstrateError::NotFound(key.clone())),
        }
    }

    async fn put(&self, key: &RecordKey, fields: Fields) -> Result<(), SubstrateError> {
        sqlx::query(
            r#"
            INSERT INTO kv_records (namespace, collection, key, fields)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (namespace, collection, key)
            DO UPDATE SET fields = EXCLUDED.fields
            "#,
        )
        .bind(&key.namespace)
        .bind(&key.collection)
        .bind(&key.key)
        .bind(Json(&fields))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, SubstrateError> {
        let result = sqlx::query(
            r#"
            DELETE FROM kv_records
            WHERE namespace = $1 AND collection = $2 AND key = $3
            "#,
        )
        .bind(&key.namespace)
        .bind(&key.collection)
        .bind(&key.key)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_to_list(
        &self,
        key: &RecordKey,
        field: &str,
        value: Value,
    ) -> Result<(), SubstrateError> {
        // A scalar under `field` would be silently wrapped by `||`, so refuse it.
        let row = sqlx::query(
            r#"
            INSERT INTO kv_records (namespace, collection, key, fields)
            VALUES ($1, $2, $3, jsonb_build_object($4::text, jsonb_build_array($5::jsonb)))
            ON CONFLICT (namespace, collection, key)
            DO UPDATE SET fields = jsonb_set(
                kv_records.fields,
                ARRAY[$4::text],
                COALESCE(kv_records.fields -> $4::text, '[]'::jsonb) || jsonb_build_array($5::jsonb)
            )
            WHERE kv_records.fields -> $4::text IS NULL
               OR jsonb_typeof(kv_records.fields -> $4::text) = 'array'
            RETURNING 1 AS applied
            "#,
        )
        .bind(&key.namespace)
        .bind(&key.collection)
        .bind(&key.key)
        .bind(field)
        .bind(Json(&value))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(_) => Ok(()),
            None => Err(SubstrateError::TypeMismatch {
                key: key.clone(),
                field: field.to_string(),
            }),
        }
    }

    async fn remove_from_list(
        &self,
        key: &RecordKey,
        field: &str,
        value: &Value,
    ) -> Result<(), SubstrateError> {
        sqlx::query(
            r#"
            UPDATE kv_records
            SET fields = jsonb_set(
                fields,
                ARRAY[$4::text],
                COALESCE(
                    (SELECT jsonb_agg(elem ORDER BY ord)
                     FROM jsonb_array_elements(fields -> $4::text) WITH ORDINALITY AS t(elem, ord)
                     WHERE elem <> $5::jsonb),
                    '[]'::jsonb
                )
            )
            WHERE namespace = $1 AND collection = $2 AND key = $3
              AND jsonb_typeof(fields -> $4::text) = 'array'
            "#,
        )
        .bind(&key.namespace)
        .bind(&key.collection)
        .bind(&key.key)
        .bind(field)
        .bind(Json(value))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn scan_prefix(
        &self,
        namespace: &str,
        collection: &str,
        prefix: &str,
    ) -> Result<Vec<(String, Fields)>, SubstrateError> {
        let rows = sqlx::query(
            r#"
            SELECT key, fields
            FROM kv_records
            WHERE namespace = $1 AND collection = $2 AND starts_with(key, $3)
            ORDER BY key COLLATE "C"
            "#,
        )
        .bind(namespace)
        .bind(collection)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let key: String = row.try_get("key")?;
                let Json(fields): Json<Fields> = row.try_get("fields")?;
                Ok((key, fields))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(map_sqlx_error)
    }
}
