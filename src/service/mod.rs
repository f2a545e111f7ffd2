//! Database service abstraction consumed by the readiness coordinator.

use crate::error::DbError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod mock;
pub mod sqlite;

pub use mock::{MockDatabaseService, ServiceCall};
pub use sqlite::{SqliteDatabaseService, StoreDefinition};

/// Storage engine operations the coordinator relies on.
///
/// Implementations own opening, schema management and repair; the
/// coordinator only sequences these calls.
#[async_trait]
pub trait DatabaseService: Send + Sync + fmt::Debug {
    /// Resolve once the engine has finished initializing.
    ///
    /// Fails on initialization error or timeout.
    async fn wait_for_initialization(&self) -> Result<(), DbError>;

    /// Report which expected stores are missing.
    async fn get_health_status(&self) -> Result<HealthStatus, DbError>;

    /// Recreate whatever structure is missing.
    async fn repair_database(&self) -> Result<(), DbError>;

    /// Check health, repair if needed, and report the outcome.
    async fn check_and_repair_database(&self) -> Result<RepairResult, DbError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub missing_stores: Vec<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            missing_stores: Vec::new(),
        }
    }

    pub fn missing(stores: Vec<String>) -> Self {
        Self {
            healthy: stores.is_empty(),
            missing_stores: stores,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairResult {
    pub healthy: bool,
    pub repaired: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_missing_empty_is_healthy() {
        assert_eq!(HealthStatus::missing(vec![]), HealthStatus::healthy());
    }

    #[test]
    fn test_health_status_missing_stores() {
        let status = HealthStatus::missing(vec!["notes".to_string()]);
        assert!(!status.healthy);
        assert_eq!(status.missing_stores, vec!["notes"]);
    }

    #[test]
    fn test_repair_result_serializes() {
        let result = RepairResult {
            healthy: true,
            repaired: true,
            message: "recreated stores: notes".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["healthy"], true);
        assert_eq!(json["repaired"], true);
        assert_eq!(json["message"], "recreated stores: notes");
    }
}
