//! Owner task for one window: screen binding, host event routing, and
//! the idle debounce scheduler that feeds the alignment attempt.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};
use window_host::{
    ContentEvent, HostEvent, LayoutContent, Screen, ScreenChange, SessionSwitchReason, WindowHost,
};

use crate::{LayoutCfg, align, gate::OnceFlag};

/// Native handle lifecycle, observed through host events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HandleState {
    Uninitialized,
    Ready,
    Closed,
}

/// Requests sent from [`crate::LayoutHandle`] to the owner task.
pub(crate) enum Command {
    /// Bind (or withdraw) the tracked screen.
    SetScreen {
        /// New assignment; `None` withdraws it.
        screen: Option<Screen>,
    },
    /// Explicit debounced alignment request.
    Align {
        /// Trigger description, for diagnostics only.
        reason: &'static str,
    },
    /// Attach a content layout and wire its readiness signal.
    AttachLayout {
        /// The content being attached.
        content: LayoutContent,
        /// Resolves `true` on the first load after positioning; dropped
        /// if the content unloads first.
        done: oneshot::Sender<bool>,
    },
    /// Defensive show/hide.
    SetVisibility {
        /// `true` to show, `false` to hide.
        show: bool,
        /// Whether the host accepted the change.
        respond: oneshot::Sender<bool>,
    },
    /// Query the native handle state.
    IsHandleReady {
        /// `true` once the handle is assigned and not yet closed.
        respond: oneshot::Sender<bool>,
    },
}

/// Shared engine state. The owner task mutates the binding and handle
/// state; spawned debounce waiters and attempts read through the `Arc`.
pub(crate) struct Engine {
    pub(crate) host: Arc<dyn WindowHost>,
    pub(crate) cfg: LayoutCfg,
    /// Latest debounce token. A waiter holding an older value was
    /// superseded and abandons on wake-up.
    token: AtomicU64,
    /// Completion flag of the attempt currently running, if any. Token
    /// bump/capture and the check-then-start handshake both hold this
    /// lock, which is what makes single-flight hold on a multithreaded
    /// runtime.
    in_flight: Mutex<Option<OnceFlag<()>>>,
    /// First `Loaded` host event. Never resets.
    load_gate: OnceFlag<()>,
    /// Window currently loaded; flips off again on `Unloaded`.
    loaded: AtomicBool,
    handle_state: Mutex<HandleState>,
    pub(crate) screen: Mutex<Option<Screen>>,
    pub(crate) layout: Mutex<Option<LayoutContent>>,
    /// First successful alignment happened. Never cleared.
    pub(crate) positioned: AtomicBool,
    /// Positioned with content present. One-shot.
    pub(crate) ready: OnceFlag<bool>,
}

impl Engine {
    pub(crate) fn new(host: Arc<dyn WindowHost>, cfg: LayoutCfg) -> Arc<Self> {
        Arc::new(Self {
            host,
            cfg,
            token: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            load_gate: OnceFlag::new(),
            loaded: AtomicBool::new(false),
            handle_state: Mutex::new(HandleState::Uninitialized),
            screen: Mutex::new(None),
            layout: Mutex::new(None),
            positioned: AtomicBool::new(false),
            ready: OnceFlag::new(),
        })
    }

    pub(crate) fn ready_flag(&self) -> OnceFlag<bool> {
        self.ready.clone()
    }

    pub(crate) fn is_handle_ready(&self) -> bool {
        *self.handle_state.lock() == HandleState::Ready
    }

    /// Owner loop. Exits when every handle is dropped or the host event
    /// stream closes.
    pub(crate) async fn run(
        self: Arc<Self>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut assignment: watch::Receiver<Option<Screen>>,
        mut host_events: broadcast::Receiver<HostEvent>,
    ) {
        // Single active subscription slot for the bound screen's
        // property changes; rebinding replaces it wholesale.
        let mut screen_changes: Option<broadcast::Receiver<ScreenChange>> = None;
        let mut assignment_live = true;

        // Pick up an assignment made before the engine was spawned.
        let initial = assignment.borrow_and_update().clone();
        if initial.is_some() {
            self.bind_screen(&mut screen_changes, initial);
        }

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.on_command(&mut screen_changes, cmd),
                    None => break,
                },
                event = host_events.recv() => match event {
                    Ok(event) => self.on_host_event(&mut screen_changes, &assignment, event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!(missed, "host event stream lagged; realigning");
                        self.request_alignment("host-events-lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = assignment.changed(), if assignment_live => match changed {
                    Ok(()) => {
                        let screen = assignment.borrow_and_update().clone();
                        self.bind_screen(&mut screen_changes, screen);
                    }
                    // Assignment source dropped; keep the last binding.
                    Err(_) => assignment_live = false,
                },
                watched = next_screen_change(&mut screen_changes) => match watched {
                    ScreenWatch::Changed(ScreenChange::WorkArea) => {
                        self.request_alignment("screen-work-area");
                    }
                    ScreenWatch::Changed(ScreenChange::Transform) => {
                        self.request_alignment("screen-transform");
                    }
                    ScreenWatch::Changed(ScreenChange::Active) => {}
                    ScreenWatch::Lagged => self.request_alignment("screen-changes-lagged"),
                    ScreenWatch::Closed => screen_changes = None,
                },
            }
        }
    }

    fn on_command(
        self: &Arc<Self>,
        screen_changes: &mut Option<broadcast::Receiver<ScreenChange>>,
        cmd: Command,
    ) {
        match cmd {
            Command::SetScreen { screen } => self.bind_screen(screen_changes, screen),
            Command::Align { reason } => self.request_alignment(reason),
            Command::AttachLayout { content, done } => self.attach_layout(content, done),
            Command::SetVisibility { show, respond } => {
                let _ = respond.send(self.set_visibility(show));
            }
            Command::IsHandleReady { respond } => {
                let _ = respond.send(self.is_handle_ready());
            }
        }
    }

    fn on_host_event(
        self: &Arc<Self>,
        screen_changes: &mut Option<broadcast::Receiver<ScreenChange>>,
        assignment: &watch::Receiver<Option<Screen>>,
        event: HostEvent,
    ) {
        match event {
            HostEvent::HandleReady => {
                {
                    let mut state = self.handle_state.lock();
                    if *state == HandleState::Closed {
                        return;
                    }
                    *state = HandleState::Ready;
                }
                self.bind_screen(screen_changes, assignment.borrow().clone());
                self.request_alignment("handle-ready");
            }
            HostEvent::HandleClosed => {
                // Idempotent teardown.
                *self.handle_state.lock() = HandleState::Closed;
            }
            HostEvent::Loaded => {
                self.loaded.store(true, Ordering::Release);
                self.request_alignment("loaded");
                self.load_gate.set(());
            }
            HostEvent::Unloaded => self.loaded.store(false, Ordering::Release),
            HostEvent::DpiChanged { old, new } => {
                debug!(old, new, "dpi changed");
                self.request_alignment("dpi-changed");
            }
            HostEvent::SettingChanged(setting) => {
                debug!(setting = setting.as_deref().unwrap_or(""), "settings broadcast");
                self.request_alignment("setting-changed");
            }
            HostEvent::SessionSwitch(reason) => match reason {
                SessionSwitchReason::ConsoleConnect
                | SessionSwitchReason::RemoteConnect
                | SessionSwitchReason::SessionUnlock => {
                    self.request_alignment("session-switch");
                }
                _ => {}
            },
        }
    }

    /// Rebind the tracked screen. No-op when the assignment is the same
    /// descriptor (reference identity). The previous subscription is
    /// dropped before the new screen is observed, so at most one is
    /// alive at any time and stale descriptors cannot trigger anything.
    fn bind_screen(
        self: &Arc<Self>,
        screen_changes: &mut Option<broadcast::Receiver<ScreenChange>>,
        screen: Option<Screen>,
    ) {
        let same = {
            let current = self.screen.lock();
            match (current.as_ref(), screen.as_ref()) {
                (Some(a), Some(b)) => Screen::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        };
        if same {
            return;
        }
        *screen_changes = None;
        match screen {
            Some(screen) => {
                debug!(screen = screen.name(), "screen assigned");
                *screen_changes = Some(screen.subscribe());
                *self.screen.lock() = Some(screen);
                self.request_alignment("screen-assigned");
            }
            None => {
                debug!("screen assignment withdrawn");
                *self.screen.lock() = None;
            }
        }
    }

    /// Fire-and-forget debounced alignment request.
    ///
    /// Coalescing: every request supersedes all pending waiters; the one
    /// that finally acts is the latest, timed from the last request. A
    /// running attempt is folded into the wait rather than interrupted.
    pub(crate) fn request_alignment(self: &Arc<Self>, reason: &'static str) {
        let (token, running) = {
            let in_flight = self.in_flight.lock();
            let token = self.token.fetch_add(1, Ordering::AcqRel) + 1;
            (token, in_flight.clone())
        };
        debug!(reason, token, "alignment requested");
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let quiet = tokio::time::sleep(engine.cfg.quiet_period);
            let loaded = engine.load_gate.wait();
            match running {
                Some(flag) => {
                    let _ = tokio::join!(quiet, loaded, flag.wait());
                }
                None => {
                    let _ = tokio::join!(quiet, loaded);
                }
            }
            let done = OnceFlag::new();
            {
                let mut in_flight = engine.in_flight.lock();
                if engine.token.load(Ordering::Acquire) != token {
                    // Superseded by a newer request; abandon silently.
                    return;
                }
                if !engine.loaded.load(Ordering::Acquire) {
                    debug!(reason, "alignment skipped; window no longer loaded");
                    return;
                }
                *in_flight = Some(done.clone());
            }
            debug!(reason, token, "alignment starting");
            let outcome = align::run(&engine).await;
            debug!(reason, token, ?outcome, "alignment finished");
            *engine.in_flight.lock() = None;
            done.set(());
        });
    }

    /// Attach content and wire the per-attachment readiness signal: it
    /// resolves `true` on the first content load that happens after the
    /// window has been positioned, and is dropped (cancelled) if the
    /// content unloads before that.
    fn attach_layout(self: &Arc<Self>, content: LayoutContent, done: oneshot::Sender<bool>) {
        *self.layout.lock() = Some(content.clone());
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut events = content.subscribe();
            loop {
                match events.recv().await {
                    Ok(ContentEvent::Loaded) => {
                        if engine.positioned.load(Ordering::Acquire) {
                            engine.ready.set(true);
                            let _ = done.send(true);
                            return;
                        }
                    }
                    // Dropping `done` resolves the attachment as cancelled.
                    Ok(ContentEvent::Unloaded) => return,
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
    }

    /// Show or hide, absorbing the host's transient rejection. Show/hide
    /// can race OS-driven visibility transitions, so `false` here means
    /// "not now", not "never".
    fn set_visibility(&self, show: bool) -> bool {
        if !self.is_handle_ready() {
            return false;
        }
        let result = if show {
            self.host.show()
        } else {
            self.host.hide()
        };
        match result {
            Ok(()) => true,
            Err(err) if err.is_transient() => false,
            Err(err) => {
                warn!(%err, show, "visibility change failed");
                false
            }
        }
    }
}

/// Outcome of polling the bound screen's change stream.
enum ScreenWatch {
    /// A property change was delivered.
    Changed(ScreenChange),
    /// Notifications were dropped; treat as a change of unknown kind.
    Lagged,
    /// The screen descriptor was dropped by its provider.
    Closed,
}

/// Poll the current screen subscription, or park when none is bound.
async fn next_screen_change(
    slot: &mut Option<broadcast::Receiver<ScreenChange>>,
) -> ScreenWatch {
    match slot {
        Some(rx) => match rx.recv().await {
            Ok(change) => ScreenWatch::Changed(change),
            Err(broadcast::error::RecvError::Lagged(_)) => ScreenWatch::Lagged,
            Err(broadcast::error::RecvError::Closed) => ScreenWatch::Closed,
        },
        None => std::future::pending().await,
    }
}
