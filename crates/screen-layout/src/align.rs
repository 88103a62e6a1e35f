//! The bounded-retry alignment attempt.
//!
//! Each iteration shows the window fully transparent if it was hidden
//! (so it can be moved without flicker), applies the screen's work area,
//! restores visibility and opacity, then checks that the rendered size
//! converged onto the target. Transient host rejections and inactive
//! screens are retried with a fixed backoff; the host tends to sort
//! itself out within a few hundred milliseconds after session unlocks
//! and DPI changes. Exhaustion is silent: the next external trigger
//! schedules a fresh attempt.

use std::sync::{Arc, atomic::Ordering};

use tokio::time::sleep;
use tracing::{debug, warn};
use window_host::{HostError, within_tolerance};

use crate::engine::Engine;

/// Terminal states of one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Window converged onto the target geometry.
    Converged,
    /// No screen bound or handle not ready; nothing to do.
    Abandoned,
    /// Every retry iteration failed.
    Exhausted,
    /// The host reported a non-transient failure.
    Failed,
}

/// What one iteration decided.
enum Step {
    Converged,
    Retry(&'static str),
    Abandon,
    Fatal(HostError),
}

pub(crate) async fn run(engine: &Arc<Engine>) -> Outcome {
    let host = &engine.host;
    let original_visible = host.is_visible();
    // Let whatever triggered us finish dispatching before we touch the
    // window.
    tokio::task::yield_now().await;

    let mut outcome = Outcome::Exhausted;
    for attempt in 0..engine.cfg.max_attempts {
        let original_opacity = host.opacity();
        let step = run_iteration(engine, attempt, original_visible).await;
        host.set_opacity(original_opacity);
        match step {
            Step::Converged => {
                outcome = Outcome::Converged;
                break;
            }
            Step::Abandon => {
                outcome = Outcome::Abandoned;
                break;
            }
            Step::Fatal(err) => {
                warn!(%err, attempt, "alignment aborted on host failure");
                outcome = Outcome::Failed;
                break;
            }
            Step::Retry(why) => {
                debug!(attempt, why, "alignment retry");
                sleep(engine.cfg.retry_backoff).await;
            }
        }
    }
    if outcome == Outcome::Exhausted {
        debug!(
            attempts = engine.cfg.max_attempts,
            "alignment gave up; waiting for the next trigger"
        );
    }
    // The window must not stay shown (or hidden) contrary to how the
    // attempt found it. The host may still reject this; tolerate it.
    if host.is_visible() != original_visible {
        let restore = if original_visible {
            host.show()
        } else {
            host.hide()
        };
        if let Err(err) = restore {
            debug!(%err, "failed to restore window visibility");
        }
    }
    outcome
}

async fn run_iteration(engine: &Arc<Engine>, attempt: u32, original_visible: bool) -> Step {
    let host = &engine.host;
    let Some(screen) = engine.screen.lock().clone() else {
        return Step::Abandon;
    };
    if !engine.is_handle_ready() {
        return Step::Abandon;
    }

    // Flicker suppression: a hidden window is shown fully transparent
    // while it is being moved.
    if !host.is_visible() {
        host.set_opacity(0.0);
        match host.show() {
            Ok(()) => {}
            Err(err) if err.is_transient() => return Step::Retry("show rejected"),
            Err(err) => return Step::Fatal(err),
        }
    }

    let target = screen.transform().to_logical(screen.work_area());
    debug!(attempt, screen = screen.name(), ?target, "applying work area");
    if !screen.is_active() {
        return Step::Retry("screen inactive");
    }
    match host.set_bounds(target) {
        Ok(()) => {}
        Err(err) if err.is_transient() => return Step::Retry("set_bounds rejected"),
        Err(err) => return Step::Fatal(err),
    }

    // Put visibility back the way the attempt found it: a window that
    // was hidden stays hidden once positioned.
    let restore = if original_visible {
        host.show()
    } else {
        host.hide()
    };
    match restore {
        Ok(()) => {}
        Err(err) if err.is_transient() => return Step::Retry("visibility restore rejected"),
        Err(err) => return Step::Fatal(err),
    }

    let rendered = host.render_size();
    if within_tolerance(rendered.width, target.w, engine.cfg.tolerance)
        && within_tolerance(rendered.height, target.h, engine.cfg.tolerance)
    {
        engine.positioned.store(true, Ordering::Release);
        host.invalidate_measure();
        let layout = engine.layout.lock().clone();
        if let Some(layout) = &layout {
            layout.invalidate_measure();
        }
        if layout.is_some() {
            tokio::task::yield_now().await;
            engine.ready.set(true);
        }
        debug!(attempt, ?rendered, "alignment converged");
        return Step::Converged;
    }
    Step::Retry("render size not converged")
}
