/*!
 * Control Session Tests
 * Numeric command dispatch, errno results and session lifecycle
 */

use deferred_work::device::{TIMER_ALLOC, TIMER_CANCEL, TIMER_MON, TIMER_SET};
use deferred_work::{Device, DeviceConfig, DeviceError, ProcessTable, TimerMode};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn load() -> (Device, Arc<ProcessTable>) {
    let table = Arc::new(ProcessTable::new());
    let device = Device::load(DeviceConfig::default(), table.clone());
    (device, table)
}

#[tokio::test(start_paused = true)]
async fn test_timer_set_and_cancel() {
    let (device, _table) = load();
    let session = device.open();

    session.ioctl(TIMER_SET, 2).await.unwrap();
    assert_eq!(session.controller().mode(), TimerMode::OneShot);
    assert!(session.controller().is_timer_pending());

    session.ioctl(TIMER_CANCEL, 0).await.unwrap();
    assert!(!session.controller().is_timer_pending());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(session.controller().firings(), 0);

    session.ioctl(TIMER_SET, 1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(session.controller().firings(), 1);

    session.release();
    device.unload().await;
}

#[tokio::test(start_paused = true)]
async fn test_unknown_command() {
    let (device, _table) = load();
    let session = device.open();

    let err = session.ioctl(0xdead_beef, 0).await.unwrap_err();
    assert_eq!(err, DeviceError::InvalidCommand(0xdead_beef));
    assert_eq!(err.errno(), -25);
    assert_eq!(session.controller().mode(), TimerMode::None);

    session.release();
    device.unload().await;
}

#[tokio::test(start_paused = true)]
async fn test_monitor_command() {
    let (device, table) = load();
    let session = device.open();
    let pid = table.spawn("watched");

    session.ioctl(TIMER_MON, u64::from(pid)).await.unwrap();
    assert_eq!(session.controller().monitored_pids(), vec![pid]);

    let err = session.ioctl(TIMER_MON, 99_999).await.unwrap_err();
    assert_eq!(err.errno(), -3);

    let err = session.ioctl(TIMER_MON, u64::MAX).await.unwrap_err();
    assert!(matches!(err, DeviceError::InvalidArgument(_)));
    assert_eq!(err.errno(), -22);

    // The configured period drives the scan
    table.exit(pid);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(session.controller().monitored_len(), 0);

    session.release();
    let report = device.unload().await;
    assert!(report.timer_was_pending);
    assert_eq!(table.outstanding(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alloc_command_runs_blocking_work() {
    let table = Arc::new(ProcessTable::new());
    let device = Device::load(DeviceConfig::fast(), table);
    let session = device.open();

    session.ioctl(TIMER_ALLOC, 0).await.unwrap();
    assert_eq!(session.controller().mode(), TimerMode::DeferredBlocking);

    let deadline = Instant::now() + Duration::from_secs(5);
    while session.controller().stats().executor.submitted == 0 {
        assert!(Instant::now() < deadline, "deferred work never queued");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let controller = Arc::clone(device.controller());
    session.release();
    device.unload().await;

    // Unload waited for the sleeping procedure
    assert!(!controller.is_work_pending());
    assert_eq!(controller.stats().executor.completed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sessions_share_state() {
    let (device, table) = load();
    let pid = table.spawn("shared");

    let first = device.open();
    let first_id = first.id();
    first.ioctl(TIMER_MON, u64::from(pid)).await.unwrap();
    first.release();

    // Open/close never resets controller state
    let second = device.open();
    assert_eq!(second.controller().monitored_pids(), vec![pid]);
    assert_eq!(second.controller().mode(), TimerMode::ProcessMonitor);
    assert_ne!(second.id(), first_id);

    second.release();
    device.unload().await;
}

#[tokio::test(start_paused = true)]
async fn test_session_count() {
    let (device, _table) = load();
    assert_eq!(device.open_sessions(), 0);

    let a = device.open();
    let b = device.open();
    assert_eq!(device.open_sessions(), 2);

    a.release();
    assert_eq!(device.open_sessions(), 1);
    drop(b);
    assert_eq!(device.open_sessions(), 0);

    device.unload().await;
}

#[tokio::test(start_paused = true)]
async fn test_session_outliving_unload() {
    let (device, table) = load();
    let session = device.open();
    let pid = table.spawn("orphan");

    device.unload().await;

    let err = session.ioctl(TIMER_MON, u64::from(pid)).await.unwrap_err();
    assert_eq!(err, DeviceError::Unloaded);
    session.ioctl(TIMER_SET, 1).await.unwrap();

    assert_eq!(session.controller().mode(), TimerMode::None);
    assert_eq!(session.controller().monitored_len(), 0);
    assert!(!session.controller().is_timer_pending());
    assert_eq!(table.outstanding(), 0);
}
