//! Shared screen descriptor handle observed by the alignment engine.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::{Rect, Transform};

/// Property-change notifications for a [`Screen`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenChange {
    /// The usable work-area rectangle changed.
    WorkArea,
    /// The device-to-logical transform changed.
    Transform,
    /// The active flag flipped.
    Active,
}

/// Description of one display: work area, scale transform, active flag.
///
/// Cloning shares the descriptor; consumers bind by reference identity
/// ([`Screen::ptr_eq`]) and never mutate a screen they are bound to. The
/// provider side mutates through the `set_*` methods, which notify
/// subscribers.
#[derive(Clone, Debug)]
pub struct Screen {
    inner: Arc<ScreenState>,
}

#[derive(Debug)]
struct ScreenState {
    name: String,
    props: Mutex<Props>,
    changes: broadcast::Sender<ScreenChange>,
}

#[derive(Clone, Copy, Debug)]
struct Props {
    work_area: Rect,
    transform: Transform,
    active: bool,
}

impl Screen {
    /// New active screen with an identity transform.
    #[must_use]
    pub fn new(name: impl Into<String>, work_area: Rect) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(ScreenState {
                name: name.into(),
                props: Mutex::new(Props {
                    work_area,
                    transform: Transform::IDENTITY,
                    active: true,
                }),
                changes,
            }),
        }
    }

    /// Display name, for diagnostics only.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Rectangle a window should occupy to fill this screen, device units.
    #[must_use]
    pub fn work_area(&self) -> Rect {
        self.inner.props.lock().work_area
    }

    /// Device-to-logical transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.inner.props.lock().transform
    }

    /// Whether the display is currently part of the desktop.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.props.lock().active
    }

    /// Provider side: update the work area and notify subscribers.
    pub fn set_work_area(&self, work_area: Rect) {
        self.inner.props.lock().work_area = work_area;
        let _ = self.inner.changes.send(ScreenChange::WorkArea);
    }

    /// Provider side: update the transform and notify subscribers.
    pub fn set_transform(&self, transform: Transform) {
        self.inner.props.lock().transform = transform;
        let _ = self.inner.changes.send(ScreenChange::Transform);
    }

    /// Provider side: flip the active flag and notify subscribers.
    pub fn set_active(&self, active: bool) {
        self.inner.props.lock().active = active;
        let _ = self.inner.changes.send(ScreenChange::Active);
    }

    /// Subscribe to property-change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ScreenChange> {
        self.inner.changes.subscribe()
    }

    /// Reference identity: two handles to the same descriptor.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{Screen, ScreenChange};
    use crate::Rect;

    #[test]
    fn identity_is_by_handle_not_value() {
        let area = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        let a = Screen::new("one", area);
        let b = Screen::new("one", area);
        assert!(Screen::ptr_eq(&a, &a.clone()));
        assert!(!Screen::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn setters_notify_subscribers() {
        let screen = Screen::new("primary", Rect::new(0.0, 0.0, 800.0, 600.0));
        let mut rx = screen.subscribe();
        screen.set_work_area(Rect::new(0.0, 0.0, 1024.0, 768.0));
        screen.set_active(false);
        assert_eq!(rx.recv().await.unwrap(), ScreenChange::WorkArea);
        assert_eq!(rx.recv().await.unwrap(), ScreenChange::Active);
        assert!(!screen.is_active());
    }
}
