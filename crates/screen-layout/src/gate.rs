//! One-shot signal used for the load gate, the readiness flag, and
//! in-flight attempt completion.

use tokio::sync::watch;

/// Single-assignment flag observable by any number of waiters.
///
/// `set` succeeds exactly once; later calls are no-ops. `wait` may be
/// called any number of times, before or after the flag is set, and
/// always yields the same value. There is no reset.
#[derive(Clone, Debug)]
pub(crate) struct OnceFlag<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> OnceFlag<T> {
    /// Create an unset flag.
    pub(crate) fn new() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }

    /// Set the flag if it has not been set yet. Returns whether this
    /// call was the one that set it.
    pub(crate) fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                false
            } else {
                *slot = Some(value);
                true
            }
        })
    }

    /// Whether the flag has been set.
    #[cfg(test)]
    pub(crate) fn is_set(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Wait until the flag is set and return its value.
    pub(crate) async fn wait(&self) -> T {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(value) = rx.borrow_and_update().clone() {
                return value;
            }
            // `self` keeps a sender alive for the whole wait, so the
            // channel cannot close underneath us.
            if rx.changed().await.is_err() {
                unreachable!("watch sender dropped while a clone is alive");
            }
        }
    }
}
