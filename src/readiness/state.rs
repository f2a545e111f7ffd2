use serde::Serialize;

/// Observable readiness of the database, as published by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadinessState {
    ready: bool,
    last_error: Option<String>,
    loading: bool,
    #[serde(skip)]
    in_flight: usize,
}

impl ReadinessState {
    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True while any `ensure_ready` or `initialize_once` call is running.
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn mark_ready(&mut self) {
        self.ready = true;
        self.last_error = None;
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn enter(&mut self) {
        self.in_flight += 1;
        self.loading = true;
    }

    pub(crate) fn exit(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = self.in_flight > 0;
    }
}

/// Outcome of `ensure_ready` and `initialize_once`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Initialization failed but a repair brought the database back.
    Repaired,
    Unavailable { error: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        !matches!(self, Readiness::Unavailable { .. })
    }
}

/// Outcome of a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    Completed(T),
    /// The operation did not produce a value; carries the caller's fallback
    /// and the error that was recorded.
    Fallback { value: Option<T>, error: String },
}

impl<T> Guarded<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Guarded::Completed(_))
    }

    /// The operation's value, or the fallback.
    pub fn into_value(self) -> Option<T> {
        match self {
            Guarded::Completed(value) => Some(value),
            Guarded::Fallback { value, .. } => value,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Guarded::Completed(_) => None,
            Guarded::Fallback { error, .. } => Some(error),
        }
    }
}
