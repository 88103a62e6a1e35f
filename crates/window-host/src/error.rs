use thiserror::Error;

/// Failures surfaced by a window host.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// The operation is not valid for the window's current state.
    ///
    /// Transient: the host expects the same call to succeed once the
    /// window (or the OS session driving it) finishes its own
    /// transition. Callers retry with backoff instead of surfacing it.
    #[error("operation invalid in current window state")]
    InvalidState,

    /// The native handle has not been assigned yet.
    #[error("window handle not ready")]
    HandleNotReady,

    /// The window has been torn down.
    #[error("window gone")]
    Gone,
}

impl HostError {
    /// Whether this is the transient rejection class that alignment
    /// retry loops absorb. Everything else ends the attempt.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::InvalidState)
    }
}

/// Result alias for host operations.
pub type Result<T> = std::result::Result<T, HostError>;
