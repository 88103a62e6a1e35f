//! Screen binding: rebinding cleanup, assignment-source wiring, and
//! trigger filtering.

use std::{sync::Arc, time::Duration};

use screen_layout::{LayoutCfg, LayoutHandle, ScreenLayout};
use tokio::sync::watch;
use window_host::{
    HostEvent, MockWindowHost, Rect, Screen, SessionSwitchReason, Transform,
};

fn spawn_layout(
    host: &MockWindowHost,
    screen: Option<Screen>,
) -> (LayoutHandle, watch::Sender<Option<Screen>>) {
    let (tx, rx) = watch::channel(screen);
    let handle = ScreenLayout::spawn(Arc::new(host.clone()), rx, LayoutCfg::default());
    (handle, tx)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test(start_paused = true)]
async fn rebinding_unsubscribes_the_old_screen() {
    let host = MockWindowHost::new();
    let a = Screen::new("a", Rect::new(0.0, 0.0, 1000.0, 1000.0));
    let b = Screen::new("b", Rect::new(1000.0, 0.0, 800.0, 600.0));
    let (handle, _assign) = spawn_layout(&host, Some(a.clone()));
    host.emit(HostEvent::HandleReady);
    host.emit(HostEvent::Loaded);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.bounds(), Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));

    handle.set_assigned_screen(Some(b.clone()));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.bounds(), Some(Rect::new(1000.0, 0.0, 800.0, 600.0)));

    // The stale descriptor must be inert after rebinding.
    let calls_before = host.set_bounds_calls();
    a.set_work_area(Rect::new(0.0, 0.0, 1.0, 1.0));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(host.set_bounds_calls(), calls_before);

    // The bound descriptor still triggers.
    b.set_work_area(Rect::new(1000.0, 0.0, 640.0, 480.0));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.bounds(), Some(Rect::new(1000.0, 0.0, 640.0, 480.0)));
}

#[tokio::test(start_paused = true)]
async fn reassigning_the_same_descriptor_is_a_noop() {
    let host = MockWindowHost::new();
    let screen = Screen::new("primary", Rect::new(0.0, 0.0, 1920.0, 1080.0));
    let (handle, _assign) = spawn_layout(&host, Some(screen.clone()));
    host.emit(HostEvent::HandleReady);
    host.emit(HostEvent::Loaded);
    tokio::time::sleep(Duration::from_secs(2)).await;
    let calls = host.set_bounds_calls();

    handle.set_assigned_screen(Some(screen));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.set_bounds_calls(), calls, "same binding, no realign");
}

#[tokio::test(start_paused = true)]
async fn assignment_source_changes_rebind() {
    let host = MockWindowHost::new();
    let (_handle, assign) = spawn_layout(&host, None);
    host.emit(HostEvent::HandleReady);
    host.emit(HostEvent::Loaded);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.set_bounds_calls(), 0, "no screen, nothing to do");

    let screen = Screen::new("primary", Rect::new(0.0, 0.0, 1920.0, 1080.0));
    assign.send(Some(screen.clone())).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.bounds(), Some(Rect::new(0.0, 0.0, 1920.0, 1080.0)));

    // Withdrawing the assignment makes later changes on it inert.
    let calls = host.set_bounds_calls();
    assign.send(None).unwrap();
    settle().await;
    screen.set_work_area(Rect::new(0.0, 0.0, 5.0, 5.0));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(host.set_bounds_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn transform_scales_the_applied_work_area() {
    let host = MockWindowHost::new();
    let screen = Screen::new("hidpi", Rect::new(0.0, 0.0, 1920.0, 1080.0));
    screen.set_transform(Transform {
        scale_x: 0.5,
        scale_y: 0.5,
    });
    let (_handle, _assign) = spawn_layout(&host, Some(screen.clone()));
    host.emit(HostEvent::HandleReady);
    host.emit(HostEvent::Loaded);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.bounds(), Some(Rect::new(0.0, 0.0, 960.0, 540.0)));

    // A transform change on the bound screen re-aligns.
    screen.set_transform(Transform::IDENTITY);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.bounds(), Some(Rect::new(0.0, 0.0, 1920.0, 1080.0)));
}

#[tokio::test(start_paused = true)]
async fn system_triggers_are_filtered_by_class() {
    let host = MockWindowHost::new();
    let screen = Screen::new("primary", Rect::new(0.0, 0.0, 1920.0, 1080.0));
    let (_handle, _assign) = spawn_layout(&host, Some(screen));
    host.emit(HostEvent::HandleReady);
    host.emit(HostEvent::Loaded);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.set_bounds_calls(), 1);

    // Locking is not a realign trigger.
    host.emit(HostEvent::SessionSwitch(SessionSwitchReason::SessionLock));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.set_bounds_calls(), 1);

    host.emit(HostEvent::SessionSwitch(SessionSwitchReason::SessionUnlock));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.set_bounds_calls(), 2);

    host.emit(HostEvent::DpiChanged {
        old: 96.0,
        new: 144.0,
    });
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.set_bounds_calls(), 3);

    host.emit(HostEvent::SettingChanged(Some("WindowMetrics".into())));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.set_bounds_calls(), 4);
}
