pub mod config;
pub mod error;
pub mod readiness;
pub mod service;

pub use config::Config;
pub use error::DbError;
pub use readiness::{Guarded, Readiness, ReadinessConfig, ReadinessCoordinator, ReadinessState};
pub use service::{
    DatabaseService, HealthStatus, MockDatabaseService, RepairResult, SqliteDatabaseService,
    StoreDefinition,
};
