//! screen-layout: keeps one application window aligned to its assigned
//! screen while the environment changes underneath it.
//!
//! Triggers (screen reassignment, work-area or transform changes, DPI
//! changes, settings broadcasts, session unlocks) arrive in bursts and
//! the host may reject operations transiently mid-transition, so the
//! engine debounces every trigger behind a quiet period, runs at most
//! one alignment attempt at a time, retries a bounded number of times
//! with backoff, and exposes a one-shot readiness signal for "the
//! window is positioned and its content is present".
//!
//! Construction follows the spawn-and-handle pattern: [`ScreenLayout::spawn`]
//! starts the owner task for one window and returns a cheap clonable
//! [`LayoutHandle`]. State across windows is fully independent.

mod align;
mod engine;
mod gate;

use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, oneshot, watch};
use window_host::{LayoutContent, Screen, WindowHost};

use crate::{engine::Command, gate::OnceFlag};

/// Tuning knobs for the alignment engine.
#[derive(Clone, Copy, Debug)]
pub struct LayoutCfg {
    /// How long a burst of triggers must stay quiet before an attempt
    /// starts. Timed from the last trigger.
    pub quiet_period: Duration,
    /// Backoff between retry iterations inside one attempt.
    pub retry_backoff: Duration,
    /// Maximum iterations per attempt before giving up silently.
    pub max_attempts: u32,
    /// Maximum per-axis difference between rendered and target size for
    /// an attempt to count as converged, in logical units.
    pub tolerance: f64,
}

impl Default for LayoutCfg {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(500),
            retry_backoff: Duration::from_millis(400),
            max_attempts: 8,
            tolerance: 10.0,
        }
    }
}

/// Engine constructor. Spawns the owner task and returns a handle.
pub struct ScreenLayout;

impl ScreenLayout {
    /// Spawn the alignment engine for one window.
    ///
    /// `assignment` is the view-model side of the binding: it carries
    /// the currently assigned screen and updates whenever the
    /// assignment changes. Host notifications are consumed from
    /// [`WindowHost::subscribe`]; the subscription is taken here so
    /// events emitted after `spawn` returns are never missed.
    pub fn spawn(
        host: Arc<dyn WindowHost>,
        assignment: watch::Receiver<Option<Screen>>,
        cfg: LayoutCfg,
    ) -> LayoutHandle {
        let host_events = host.subscribe();
        let engine = engine::Engine::new(host, cfg);
        let ready = engine.ready_flag();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Arc::clone(&engine).run(rx, assignment, host_events));
        LayoutHandle { tx, ready }
    }
}

/// Cheap clonable handle to a spawned alignment engine.
#[derive(Clone)]
pub struct LayoutHandle {
    tx: mpsc::UnboundedSender<Command>,
    ready: OnceFlag<bool>,
}

impl LayoutHandle {
    /// Assign the screen this window should track; `None` withdraws the
    /// assignment. Re-assigning the same descriptor is a no-op.
    pub fn set_assigned_screen(&self, screen: Option<Screen>) {
        let _ = self.tx.send(Command::SetScreen { screen });
    }

    /// Explicitly request a (debounced) alignment.
    pub fn request_alignment(&self, reason: &'static str) {
        let _ = self.tx.send(Command::Align { reason });
    }

    /// Attach a content layout.
    ///
    /// The returned channel resolves `Ok(true)` the first time the
    /// content finishes loading after the window has been positioned,
    /// and closes (`Err`) if the content unloads before that.
    pub fn attach_layout(&self, content: &LayoutContent) -> oneshot::Receiver<bool> {
        let (done, done_rx) = oneshot::channel();
        let _ = self.tx.send(Command::AttachLayout {
            content: content.clone(),
            done,
        });
        done_rx
    }

    /// Resolves once the window has been aligned to its screen with a
    /// content layout attached. One-shot; safe to await repeatedly.
    pub async fn ready(&self) -> bool {
        self.ready.wait().await
    }

    /// Show the window, absorbing the host's transient rejection.
    /// Returns `false` when the handle is not ready or the host said
    /// "not now".
    pub async fn try_show(&self) -> bool {
        self.set_visibility(true).await
    }

    /// Hide the window, absorbing the host's transient rejection.
    pub async fn try_hide(&self) -> bool {
        self.set_visibility(false).await
    }

    /// Whether the native handle is currently assigned.
    pub async fn is_handle_ready(&self) -> bool {
        let (respond, rx) = oneshot::channel();
        let _ = self.tx.send(Command::IsHandleReady { respond });
        rx.await.unwrap_or(false)
    }

    async fn set_visibility(&self, show: bool) -> bool {
        let (respond, rx) = oneshot::channel();
        let _ = self.tx.send(Command::SetVisibility { show, respond });
        rx.await.unwrap_or(false)
    }
}
