use super::policy::ReadinessConfig;
use super::state::{Guarded, Readiness, ReadinessState};
use crate::error::DbError;
use crate::service::DatabaseService;
use backoff::future::retry_notify;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const INIT_FAILED: &str = "database initialization failed";
const OPERATION_FAILED: &str = "database operation failed";

/// Tracks whether the database is safe to query and brings it up on demand.
///
/// One coordinator is created per application and shared through `Arc`.
/// Calls are not serialized against each other: concurrent callers each run
/// their own retry and repair sequence and the last write to the state wins.
#[derive(Debug)]
pub struct ReadinessCoordinator {
    service: Arc<dyn DatabaseService>,
    config: ReadinessConfig,
    state: watch::Sender<ReadinessState>,
}

/// Holds `loading` up for the lifetime of a call, including early drops.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<ReadinessState>,
}

impl<'a> LoadingGuard<'a> {
    fn enter(state: &'a watch::Sender<ReadinessState>) -> Self {
        state.send_modify(ReadinessState::enter);
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(ReadinessState::exit);
    }
}

fn describe(err: &DbError, fallback: &str) -> String {
    let message = err.to_string();
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

impl ReadinessCoordinator {
    pub fn new(service: Arc<dyn DatabaseService>, config: ReadinessConfig) -> Self {
        let (state, _) = watch::channel(ReadinessState::default());
        Self {
            service,
            config,
            state,
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ReadinessState {
        self.state.borrow().clone()
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<ReadinessState> {
        self.state.subscribe()
    }

    /// Whether the database has been marked ready.
    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready()
    }

    /// Message of the most recent recorded failure.
    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error().map(str::to_string)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading()
    }

    /// Forget the recorded failure; readiness and loading are unchanged.
    pub fn clear_error(&self) {
        self.state.send_modify(ReadinessState::clear_error);
    }

    fn mark_ready(&self) {
        self.state.send_modify(ReadinessState::mark_ready);
    }

    fn set_error(&self, message: String) {
        self.state.send_modify(|s| s.set_error(message));
    }

    /// Wait for the database, retrying and finally repairing it.
    ///
    /// Returns immediately without touching the service once the database
    /// has been marked ready. Never fails; an unusable database is reported
    /// as [`Readiness::Unavailable`] and recorded in `last_error`.
    pub async fn ensure_ready(&self) -> Readiness {
        if self.is_ready() {
            return Readiness::Ready;
        }

        let _loading = LoadingGuard::enter(&self.state);
        self.clear_error();

        let service = self.service.as_ref();
        let max_attempts = self.config.max_attempts;
        let mut failures = 0u32;
        let result = retry_notify(
            self.config.backoff(),
            || async move {
                service
                    .wait_for_initialization()
                    .await
                    .map_err(backoff::Error::transient)
            },
            |err: DbError, delay: Duration| {
                failures += 1;
                warn!(
                    attempt = failures,
                    max_attempts,
                    error = %err,
                    "Database initialization attempt failed, retrying in {:?}",
                    delay
                );
            },
        )
        .await;

        let message = match result {
            Ok(()) => {
                self.mark_ready();
                info!("Database initialized");
                return Readiness::Ready;
            }
            Err(err) => describe(&err, INIT_FAILED),
        };

        self.set_error(message.clone());
        error!(
            max_attempts,
            error = %message,
            "Database initialization failed on every attempt, attempting repair"
        );

        match self.service.check_and_repair_database().await {
            Ok(report) if report.healthy => {
                self.mark_ready();
                info!(message = %report.message, "Database repaired");
                Readiness::Repaired
            }
            Ok(report) => {
                error!(message = %report.message, "Database repair did not restore health");
                Readiness::Unavailable { error: message }
            }
            Err(err) => {
                error!(error = %err, "Database repair failed");
                Readiness::Unavailable { error: message }
            }
        }
    }

    /// Run `operation` once the database is ready.
    ///
    /// A schema mismatch triggers one repair and, if the database comes back
    /// healthy, one more attempt. Every other failure is recorded in
    /// `last_error` and answered with `fallback`.
    pub async fn guarded_operation<T, E, F, Fut>(
        &self,
        mut operation: F,
        fallback: Option<T>,
    ) -> Guarded<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<DbError>,
    {
        if let Readiness::Unavailable { error } = self.ensure_ready().await {
            warn!("Database not ready, skipping operation");
            return Guarded::Fallback {
                value: fallback,
                error,
            };
        }

        match self.run_with_repair(&mut operation).await {
            Ok(value) => Guarded::Completed(value),
            Err(err) => {
                let message = describe(&err, OPERATION_FAILED);
                error!(error = %message, "Database operation failed");
                self.set_error(message.clone());
                Guarded::Fallback {
                    value: fallback,
                    error: message,
                }
            }
        }
    }

    async fn run_with_repair<T, E, F, Fut>(&self, operation: &mut F) -> Result<T, DbError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<DbError>,
    {
        let err: DbError = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err.into(),
        };

        if !err.is_schema_mismatch() {
            return Err(err);
        }

        warn!(error = %err, "Schema mismatch detected, attempting repair");
        let report = self.service.check_and_repair_database().await?;
        if !report.healthy {
            return Err(err);
        }

        info!(message = %report.message, "Database repaired, retrying operation");
        operation().await.map_err(Into::into)
    }

    /// Startup hook: check health, repair, and bring the database up.
    ///
    /// Intended to run once before any `ensure_ready` call; calling it again
    /// repeats the sequence.
    pub async fn initialize_once(&self) -> Readiness {
        let _loading = LoadingGuard::enter(&self.state);

        let err = match self.bring_up().await {
            Ok(()) => {
                self.mark_ready();
                info!("Database state initialized");
                return Readiness::Ready;
            }
            Err(err) => err,
        };

        let message = describe(&err, INIT_FAILED);
        self.set_error(message.clone());
        error!(error = %message, "Database state initialization failed, attempting repair");

        match self.fallback_repair().await {
            Ok(true) => {
                self.mark_ready();
                info!("Database repaired and initialized");
                Readiness::Repaired
            }
            Ok(false) => Readiness::Unavailable { error: message },
            Err(err) => {
                error!(error = %err, "Database repair failed");
                Readiness::Unavailable { error: message }
            }
        }
    }

    async fn bring_up(&self) -> Result<(), DbError> {
        let health = self.service.get_health_status().await?;
        if !health.healthy {
            warn!(
                missing_stores = ?health.missing_stores,
                "Database health check failed, repairing"
            );
            if let Err(err) = self.service.repair_database().await {
                warn!(error = %err, "Database repair failed, continuing with initialization");
            }
        }

        self.service.wait_for_initialization().await
    }

    /// Returns whether the database was repaired and then initialized.
    async fn fallback_repair(&self) -> Result<bool, DbError> {
        let report = self.service.check_and_repair_database().await?;
        if !report.repaired {
            warn!(message = %report.message, "Database was not repaired");
            return Ok(false);
        }

        self.service.wait_for_initialization().await?;
        Ok(true)
    }
}
