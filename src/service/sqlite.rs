//! SQLite-backed database service where each store is a table.

use super::{DatabaseService, HealthStatus, RepairResult};
use crate::error::DbError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// A store the application expects to exist, with the DDL that creates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDefinition {
    pub name: String,
    pub ddl: String,
}

impl StoreDefinition {
    pub fn new(name: impl Into<String>, ddl: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ddl: ddl.into(),
        }
    }

    /// Key/value table keyed by text. The name is quoted in the DDL.
    pub fn key_value(name: impl Into<String>) -> Self {
        let name = name.into();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
            quote_identifier(&name)
        );
        Self { name, ddl }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct SqliteDatabaseService {
    db_path: String,
    stores: Vec<StoreDefinition>,
    init_timeout: Duration,
    pool: OnceCell<SqlitePool>,
}

impl SqliteDatabaseService {
    pub fn new(db_path: impl Into<String>, stores: Vec<StoreDefinition>, init_timeout: Duration) -> Self {
        Self {
            db_path: db_path.into(),
            stores,
            init_timeout,
            pool: OnceCell::new(),
        }
    }

    /// Connection pool, opened on first use.
    pub async fn pool(&self) -> Result<&SqlitePool, DbError> {
        self.pool
            .get_or_try_init(|| open_pool(&self.db_path))
            .await
            .map_err(DbError::from)
    }

    async fn missing_stores(&self, pool: &SqlitePool) -> Result<Vec<&StoreDefinition>, DbError> {
        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table'")
                .fetch_all(pool)
                .await?;
        let present: HashSet<String> = tables.into_iter().map(|(name,)| name).collect();

        Ok(self
            .stores
            .iter()
            .filter(|store| !present.contains(&store.name))
            .collect())
    }

    async fn create_stores(&self, pool: &SqlitePool, stores: &[&StoreDefinition]) -> Result<(), DbError> {
        for store in stores {
            info!("Creating store {}", store.name);
            sqlx::query(&store.ddl).execute(pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseService for SqliteDatabaseService {
    async fn wait_for_initialization(&self) -> Result<(), DbError> {
        let init = async {
            let pool = self.pool().await?;
            let missing = self.missing_stores(pool).await?;
            self.create_stores(pool, &missing).await
        };

        tokio::time::timeout(self.init_timeout, init)
            .await
            .map_err(|_| DbError::Timeout(self.init_timeout))?
    }

    async fn get_health_status(&self) -> Result<HealthStatus, DbError> {
        let pool = self.pool().await?;
        let missing = self
            .missing_stores(pool)
            .await?
            .into_iter()
            .map(|store| store.name.clone())
            .collect();
        Ok(HealthStatus::missing(missing))
    }

    async fn repair_database(&self) -> Result<(), DbError> {
        let pool = self.pool().await?;
        let missing = self.missing_stores(pool).await?;
        if missing.is_empty() {
            return Ok(());
        }
        warn!("Repairing database: {} store(s) missing", missing.len());
        self.create_stores(pool, &missing).await
    }

    async fn check_and_repair_database(&self) -> Result<RepairResult, DbError> {
        let before = self.get_health_status().await?;
        if before.healthy {
            return Ok(RepairResult {
                healthy: true,
                repaired: false,
                message: "database is healthy".to_string(),
            });
        }

        self.repair_database().await?;
        let after = self.get_health_status().await?;

        let message = if after.healthy {
            format!("recreated stores: {}", before.missing_stores.join(", "))
        } else {
            format!("stores still missing: {}", after.missing_stores.join(", "))
        };
        Ok(RepairResult {
            healthy: after.healthy,
            repaired: after.healthy,
            message,
        })
    }
}

const CONNECTION_PRAGMAS: [&str; 4] = [
    "PRAGMA foreign_keys = ON",
    "PRAGMA journal_mode = WAL",
    "PRAGMA busy_timeout = 5000",
    "PRAGMA synchronous = NORMAL",
];

/// Open the pool lazily; a missing parent directory is created if possible.
async fn open_pool(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    let parent = Path::new(db_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(
                path = %parent.display(),
                error = %e,
                "Could not create database directory, opening anyway"
            );
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { apply_pragmas(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    info!("Database opened at {}", db_path);
    Ok(pool)
}

async fn apply_pragmas(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for pragma in CONNECTION_PRAGMAS {
        // journal_mode answers with a row, so every pragma is fetched
        sqlx::query(pragma).fetch_optional(&mut *conn).await?;
    }
    Ok(())
}
