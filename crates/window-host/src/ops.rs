//! Window host abstraction and its scriptable test double.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::{HostError, Rect, Result, Size};

/// Notifications raised by a window host for one window.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// Initial load finished; the window is eligible for alignment.
    Loaded,
    /// The window's content tree was torn down.
    Unloaded,
    /// The native handle was assigned.
    HandleReady,
    /// The native handle was released.
    HandleClosed,
    /// The effective DPI changed.
    DpiChanged {
        /// Previous pixels-per-inch value.
        old: f64,
        /// New pixels-per-inch value.
        new: f64,
    },
    /// OS-level settings broadcast, optionally naming the changed setting.
    SettingChanged(Option<String>),
    /// Session switch notification.
    SessionSwitch(SessionSwitchReason),
}

/// Session switch classes a host forwards. Only connect/unlock reasons
/// make a window realign; the rest are delivered so consumers can filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionSwitchReason {
    /// Session attached to the local console.
    ConsoleConnect,
    /// Session detached from the local console.
    ConsoleDisconnect,
    /// Session attached to a remote connection.
    RemoteConnect,
    /// Session detached from a remote connection.
    RemoteDisconnect,
    /// Session locked.
    SessionLock,
    /// Session unlocked.
    SessionUnlock,
}

/// Trait abstraction over one window's host operations.
///
/// `show`/`hide`/`set_bounds` may be rejected with
/// [`HostError::InvalidState`] while the window is mid-transition; such
/// rejections are transient and safe to retry.
pub trait WindowHost: Send + Sync {
    /// Make the window visible.
    fn show(&self) -> Result<()>;
    /// Hide the window.
    fn hide(&self) -> Result<()>;
    /// Current visibility.
    fn is_visible(&self) -> bool;
    /// Current opacity in `[0.0, 1.0]`.
    fn opacity(&self) -> f64;
    /// Set the window opacity. Never rejected.
    fn set_opacity(&self, value: f64);
    /// Move and resize the window to `bounds`, in logical units.
    fn set_bounds(&self, bounds: Rect) -> Result<()>;
    /// Size the window actually renders at, in logical units.
    fn render_size(&self) -> Size;
    /// Force a re-measure of the window.
    fn invalidate_measure(&self);
    /// Subscribe to this window's host notifications.
    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;
}

/// In-memory host used by the engine's tests. Cloning shares state.
#[derive(Clone)]
pub struct MockWindowHost {
    inner: Arc<MockState>,
}

struct MockState {
    calls: Mutex<Vec<String>>,
    visible: Mutex<bool>,
    opacity: Mutex<f64>,
    opacity_history: Mutex<Vec<f64>>,
    bounds: Mutex<Option<Rect>>,
    /// Every accepted `set_bounds`, with the (tokio) instant it landed.
    bounds_history: Mutex<Vec<(Rect, tokio::time::Instant)>>,
    render_size: Mutex<Size>,
    /// When set, `render_size` stops following the applied bounds.
    pinned_render_size: Mutex<Option<Size>>,
    fail_show: AtomicUsize,
    fail_hide: AtomicUsize,
    fail_set_bounds: AtomicUsize,
    fail_set_bounds_gone: AtomicUsize,
    set_bounds_calls: AtomicUsize,
    measure_invalidations: AtomicUsize,
    events: broadcast::Sender<HostEvent>,
}

impl MockWindowHost {
    /// New hidden window with opacity 1.0 and no bounds applied.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(MockState {
                calls: Mutex::new(Vec::new()),
                visible: Mutex::new(false),
                opacity: Mutex::new(1.0),
                opacity_history: Mutex::new(Vec::new()),
                bounds: Mutex::new(None),
                bounds_history: Mutex::new(Vec::new()),
                render_size: Mutex::new(Size::default()),
                pinned_render_size: Mutex::new(None),
                fail_show: AtomicUsize::new(0),
                fail_hide: AtomicUsize::new(0),
                fail_set_bounds: AtomicUsize::new(0),
                fail_set_bounds_gone: AtomicUsize::new(0),
                set_bounds_calls: AtomicUsize::new(0),
                measure_invalidations: AtomicUsize::new(0),
                events,
            }),
        }
    }

    /// Raise a host notification.
    pub fn emit(&self, event: HostEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Reject the next `times` calls to `show` with `InvalidState`.
    pub fn set_fail_show(&self, times: usize) {
        self.inner.fail_show.store(times, Ordering::SeqCst);
    }

    /// Reject the next `times` calls to `hide` with `InvalidState`.
    pub fn set_fail_hide(&self, times: usize) {
        self.inner.fail_hide.store(times, Ordering::SeqCst);
    }

    /// Reject the next `times` calls to `set_bounds` with `InvalidState`.
    pub fn set_fail_set_bounds(&self, times: usize) {
        self.inner.fail_set_bounds.store(times, Ordering::SeqCst);
    }

    /// Reject the next `times` calls to `set_bounds` with the
    /// non-transient `Gone` failure.
    pub fn set_fail_set_bounds_gone(&self, times: usize) {
        self.inner.fail_set_bounds_gone.store(times, Ordering::SeqCst);
    }

    /// Pin the reported render size instead of following applied bounds.
    pub fn pin_render_size(&self, size: Option<Size>) {
        *self.inner.pinned_render_size.lock() = size;
    }

    /// Seed the current visibility without going through `show`/`hide`.
    pub fn seed_visible(&self, visible: bool) {
        *self.inner.visible.lock() = visible;
    }

    /// Bounds last applied through `set_bounds`, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        *self.inner.bounds.lock()
    }

    /// Every accepted `set_bounds` call with its timestamp.
    #[must_use]
    pub fn bounds_history(&self) -> Vec<(Rect, tokio::time::Instant)> {
        self.inner.bounds_history.lock().clone()
    }

    /// Total `set_bounds` calls, accepted or rejected.
    #[must_use]
    pub fn set_bounds_calls(&self) -> usize {
        self.inner.set_bounds_calls.load(Ordering::SeqCst)
    }

    /// Every value passed to `set_opacity`, in order.
    #[must_use]
    pub fn opacity_history(&self) -> Vec<f64> {
        self.inner.opacity_history.lock().clone()
    }

    /// How many times the window was asked to re-measure.
    #[must_use]
    pub fn measure_invalidations(&self) -> usize {
        self.inner.measure_invalidations.load(Ordering::SeqCst)
    }

    /// Whether the named operation was invoked at least once.
    #[must_use]
    pub fn calls_contain(&self, name: &str) -> bool {
        self.inner.calls.lock().iter().any(|c| c == name)
    }

    fn note(&self, name: &str) {
        self.inner.calls.lock().push(name.to_string());
    }
}

impl Default for MockWindowHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Consume one scripted failure if any remain.
fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl WindowHost for MockWindowHost {
    fn show(&self) -> Result<()> {
        self.note("show");
        if take_failure(&self.inner.fail_show) {
            return Err(HostError::InvalidState);
        }
        *self.inner.visible.lock() = true;
        Ok(())
    }

    fn hide(&self) -> Result<()> {
        self.note("hide");
        if take_failure(&self.inner.fail_hide) {
            return Err(HostError::InvalidState);
        }
        *self.inner.visible.lock() = false;
        Ok(())
    }

    fn is_visible(&self) -> bool {
        *self.inner.visible.lock()
    }

    fn opacity(&self) -> f64 {
        *self.inner.opacity.lock()
    }

    fn set_opacity(&self, value: f64) {
        self.inner.opacity_history.lock().push(value);
        *self.inner.opacity.lock() = value;
    }

    fn set_bounds(&self, bounds: Rect) -> Result<()> {
        self.note("set_bounds");
        self.inner.set_bounds_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.inner.fail_set_bounds_gone) {
            return Err(HostError::Gone);
        }
        if take_failure(&self.inner.fail_set_bounds) {
            return Err(HostError::InvalidState);
        }
        *self.inner.bounds.lock() = Some(bounds);
        self.inner
            .bounds_history
            .lock()
            .push((bounds, tokio::time::Instant::now()));
        if self.inner.pinned_render_size.lock().is_none() {
            *self.inner.render_size.lock() = bounds.size();
        }
        Ok(())
    }

    fn render_size(&self) -> Size {
        self.inner
            .pinned_render_size
            .lock()
            .unwrap_or(*self.inner.render_size.lock())
    }

    fn invalidate_measure(&self) {
        self.inner
            .measure_invalidations
            .fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.inner.events.subscribe()
    }
}
