//! Readiness orchestration for the local database.
//!
//! This module provides:
//! - The shared readiness state and its change notifications
//! - Bounded initialization retries with a flat delay
//! - Repair-and-retry guarding for individual operations

pub mod coordinator;
pub mod policy;
pub mod state;

pub use coordinator::ReadinessCoordinator;
pub use policy::{FixedRetry, ReadinessConfig};
pub use state::{Guarded, Readiness, ReadinessState};
