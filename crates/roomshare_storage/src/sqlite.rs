use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::backend::{validate_key, BackendError, BlobBackend, VersionedBlob};

const SCHEMA_SQL: &str = include_str!("sql/schema.sql");

#[derive(Debug, Clone)]
pub struct SqliteBlobBackend {
    pool: SqlitePool,
    uri: String,
}

impl SqliteBlobBackend {
    pub async fn connect(sqlite_path: &str) -> Result<Self> {
        let uri = normalize_sqlite_uri(sqlite_path);
        let options = SqliteConnectOptions::from_str(&uri)
            .with_context(|| format!("invalid sqlite URI: {}", uri))?
            .create_if_missing(true);

        // every connection to an in-memory database gets its own database
        let max_connections = if uri.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("failed to connect sqlite pool")?;

        let backend = Self { pool, uri };
        backend.migrate().await?;
        Ok(backend)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA_SQL.split(';') {
            let sql = statement.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("migration failed for statement: {sql}"))?;
        }
        info!(uri = %self.uri, "roomshare sqlite schema ready");
        Ok(())
    }
}

#[async_trait]
impl BlobBackend for SqliteBlobBackend {
    async fn read(&self, key: &str) -> Result<Option<VersionedBlob>, BackendError> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT contents, version FROM blobs WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(contents, version)| VersionedBlob {
            contents,
            version: version as u64,
        }))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        contents: String,
    ) -> Result<u64, BackendError> {
        validate_key(key)?;
        let now = Utc::now().to_rfc3339();

        let (result, next_version) = match expected {
            None => {
                let result = sqlx::query(
                    "INSERT INTO blobs(key, contents, version, updated_at) VALUES (?, ?, 1, ?) ON CONFLICT(key) DO NOTHING",
                )
                .bind(key)
                .bind(&contents)
                .bind(&now)
                .execute(&self.pool)
                .await?;
                (result, 1)
            }
            Some(version) => {
                let result = sqlx::query(
                    "UPDATE blobs SET contents = ?, version = version + 1, updated_at = ? WHERE key = ? AND version = ?",
                )
                .bind(&contents)
                .bind(&now)
                .bind(key)
                .bind(version as i64)
                .execute(&self.pool)
                .await?;
                (result, version + 1)
            }
        };

        if result.rows_affected() == 0 {
            return Err(BackendError::Conflict {
                key: key.to_string(),
                expected,
            });
        }
        Ok(next_version)
    }

    fn describe(&self) -> String {
        self.uri.clone()
    }
}

fn normalize_sqlite_uri(raw: &str) -> String {
    if raw.starts_with("sqlite:") {
        raw.to_string()
    } else {
        format!("sqlite://{raw}")
    }
}
