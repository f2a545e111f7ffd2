//! Scripted database service for testing without a real engine.

use super::{DatabaseService, HealthStatus, RepairResult};
use crate::error::DbError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One recorded call against [`MockDatabaseService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCall {
    WaitForInitialization,
    GetHealthStatus,
    RepairDatabase,
    CheckAndRepairDatabase,
}

/// Mock service that replays queued results and records every call.
///
/// When a queue runs dry the operation succeeds: initialization completes,
/// health is reported healthy, and repair reports a healthy database that
/// needed no work. Calls resolve immediately unless a latency is set.
#[derive(Debug, Default)]
pub struct MockDatabaseService {
    init_results: Mutex<VecDeque<Result<(), DbError>>>,
    health_results: Mutex<VecDeque<Result<HealthStatus, DbError>>>,
    repair_results: Mutex<VecDeque<Result<(), DbError>>>,
    check_results: Mutex<VecDeque<Result<RepairResult, DbError>>>,
    calls: Mutex<Vec<ServiceCall>>,
    latency: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockDatabaseService {
    /// Create a mock whose every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next `wait_for_initialization` call.
    pub fn with_init_result(self, result: Result<(), DbError>) -> Self {
        lock(&self.init_results).push_back(result);
        self
    }

    /// Queue `count` initialization failures carrying `message`.
    pub fn with_init_failures(self, count: usize, message: &str) -> Self {
        {
            let mut queue = lock(&self.init_results);
            for _ in 0..count {
                queue.push_back(Err(DbError::Other(message.to_string())));
            }
        }
        self
    }

    /// Queue a result for the next `get_health_status` call.
    pub fn with_health_result(self, result: Result<HealthStatus, DbError>) -> Self {
        lock(&self.health_results).push_back(result);
        self
    }

    /// Queue a result for the next `repair_database` call.
    pub fn with_repair_result(self, result: Result<(), DbError>) -> Self {
        lock(&self.repair_results).push_back(result);
        self
    }

    /// Queue a result for the next `check_and_repair_database` call.
    pub fn with_check_result(self, result: Result<RepairResult, DbError>) -> Self {
        lock(&self.check_results).push_back(result);
        self
    }

    /// Queue a `check_and_repair_database` report.
    pub fn with_check_report(self, healthy: bool, repaired: bool, message: &str) -> Self {
        self.with_check_result(Ok(RepairResult {
            healthy,
            repaired,
            message: message.to_string(),
        }))
    }

    /// Sleep for `latency` inside every call, after recording it.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<ServiceCall> {
        lock(&self.calls).clone()
    }

    /// Number of times `call` was made.
    pub fn call_count(&self, call: ServiceCall) -> usize {
        lock(&self.calls).iter().filter(|c| **c == call).count()
    }

    async fn record(&self, call: ServiceCall) {
        lock(&self.calls).push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DatabaseService for MockDatabaseService {
    async fn wait_for_initialization(&self) -> Result<(), DbError> {
        self.record(ServiceCall::WaitForInitialization).await;
        lock(&self.init_results).pop_front().unwrap_or(Ok(()))
    }

    async fn get_health_status(&self) -> Result<HealthStatus, DbError> {
        self.record(ServiceCall::GetHealthStatus).await;
        lock(&self.health_results)
            .pop_front()
            .unwrap_or_else(|| Ok(HealthStatus::healthy()))
    }

    async fn repair_database(&self) -> Result<(), DbError> {
        self.record(ServiceCall::RepairDatabase).await;
        lock(&self.repair_results).pop_front().unwrap_or(Ok(()))
    }

    async fn check_and_repair_database(&self) -> Result<RepairResult, DbError> {
        self.record(ServiceCall::CheckAndRepairDatabase).await;
        lock(&self.check_results).pop_front().unwrap_or_else(|| {
            Ok(RepairResult {
                healthy: true,
                repaired: false,
                message: "database is healthy".to_string(),
            })
        })
    }
}
