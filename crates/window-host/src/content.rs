//! Content-layout handle: the piece of UI hosted inside the window.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::broadcast;

/// Load lifecycle notifications for attached content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentEvent {
    /// The content finished its load sequence.
    Loaded,
    /// The content was detached from the visual tree.
    Unloaded,
}

/// Handle to a content layout. Cloning shares the handle.
#[derive(Clone, Debug)]
pub struct LayoutContent {
    inner: Arc<ContentState>,
}

#[derive(Debug)]
struct ContentState {
    events: broadcast::Sender<ContentEvent>,
    measure_invalidations: AtomicUsize,
}

impl LayoutContent {
    /// New, not-yet-loaded content handle.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(ContentState {
                events,
                measure_invalidations: AtomicUsize::new(0),
            }),
        }
    }

    /// Subscribe to load/unload notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.inner.events.subscribe()
    }

    /// Host side: the content finished loading.
    pub fn notify_loaded(&self) {
        let _ = self.inner.events.send(ContentEvent::Loaded);
    }

    /// Host side: the content was detached.
    pub fn notify_unloaded(&self) {
        let _ = self.inner.events.send(ContentEvent::Unloaded);
    }

    /// Force a re-measure of the content.
    pub fn invalidate_measure(&self) {
        self.inner
            .measure_invalidations
            .fetch_add(1, Ordering::SeqCst);
    }

    /// How many times a re-measure was forced (test observability).
    #[must_use]
    pub fn measure_invalidations(&self) -> usize {
        self.inner.measure_invalidations.load(Ordering::SeqCst)
    }
}

impl Default for LayoutContent {
    fn default() -> Self {
        Self::new()
    }
}
