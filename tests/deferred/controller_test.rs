/*!
 * Deferred Controller Tests
 * Timer arming, cancellation, deferred blocking work and monitor setup
 */

use crate::support::{wait_until, GatedWork};
use deferred_work::{DeferredController, DeviceConfig, DeviceError, ProcessTable, TimerMode};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn controller() -> (DeferredController, Arc<ProcessTable>) {
    let table = Arc::new(ProcessTable::new());
    let controller = DeferredController::new(&DeviceConfig::default(), table.clone());
    (controller, table)
}

#[tokio::test(start_paused = true)]
async fn test_arm_fires_once() {
    let (controller, _table) = controller();

    controller.arm(Duration::from_secs(1));
    assert_eq!(controller.mode(), TimerMode::OneShot);
    assert!(controller.is_timer_pending());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(controller.firings(), 1);
    assert!(!controller.is_timer_pending());

    // One-shot never re-arms
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.firings(), 1);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_deadline() {
    let (controller, _table) = controller();

    controller.arm(Duration::from_secs(5));
    assert!(controller.cancel().await);
    assert!(!controller.is_timer_pending());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(controller.firings(), 0);

    // Cancel leaves the mode alone
    assert_eq!(controller.mode(), TimerMode::OneShot);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_cancel_idle_is_noop() {
    let (controller, _table) = controller();

    assert!(!controller.cancel().await);
    assert!(!controller.cancel().await);
    assert_eq!(controller.mode(), TimerMode::None);
    assert_eq!(controller.firings(), 0);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_deadline() {
    let (controller, _table) = controller();

    controller.arm(Duration::from_secs(1));
    controller.arm(Duration::from_secs(3));

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(controller.firings(), 0);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(controller.firings(), 1);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_monitor_prunes_exited_task() {
    let (controller, table) = controller();
    let pid = table.spawn_with_pid(1234, "worker").unwrap();

    controller.monitor(pid, Duration::from_secs(1)).unwrap();
    assert_eq!(controller.mode(), TimerMode::ProcessMonitor);
    assert_eq!(controller.monitored_pids(), vec![1234]);
    assert_eq!(table.usage(pid), Some(1));

    assert!(table.exit(pid));
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(controller.monitored_len(), 0);
    let stats = controller.stats();
    assert_eq!(stats.pruned_total, 1);
    assert_eq!(table.outstanding(), 0);

    // The monitor keeps running with an empty list
    assert!(controller.is_timer_pending());

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_monitor_missing_pid() {
    let (controller, table) = controller();

    let err = controller
        .monitor(99_999, Duration::from_secs(1))
        .unwrap_err();
    assert_eq!(err, DeviceError::NotFound(99_999));
    assert_eq!(err.errno(), -3);

    assert_eq!(controller.monitored_len(), 0);
    assert_eq!(controller.mode(), TimerMode::None);
    assert!(!controller.is_timer_pending());
    assert_eq!(table.resolves(), 0);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_monitor_pool_exhausted() {
    let table = Arc::new(ProcessTable::new());
    let config = DeviceConfig {
        max_monitored: 1,
        ..DeviceConfig::default()
    };
    let controller = DeferredController::new(&config, table.clone());

    let first = table.spawn("first");
    let second = table.spawn("second");

    controller.monitor(first, Duration::from_secs(1)).unwrap();
    let err = controller
        .monitor(second, Duration::from_secs(1))
        .unwrap_err();
    assert!(matches!(err, DeviceError::OutOfMemory(_)));

    assert_eq!(controller.monitored_pids(), vec![first]);
    // The rejected reference went back immediately
    assert_eq!(table.usage(second), Some(0));
    assert_eq!(table.outstanding(), 1);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_monitor_rearms_every_period() {
    let (controller, table) = controller();
    let pid = table.spawn("daemon");

    controller.monitor(pid, Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(controller.firings(), 3);
    assert!(controller.is_timer_pending());
    // Live task stays on the list
    assert_eq!(controller.monitored_pids(), vec![pid]);

    assert!(controller.cancel().await);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.firings(), 3);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_monitor_uses_latest_period() {
    let (controller, table) = controller();
    let a = table.spawn("a");
    let b = table.spawn("b");

    controller.monitor(a, Duration::from_secs(10)).unwrap();
    controller.monitor(b, Duration::from_secs(1)).unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(controller.firings(), 2);
    assert_eq!(controller.monitored_len(), 2);

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deferred_work_coalesces() {
    let table = Arc::new(ProcessTable::new());
    let work = Arc::new(GatedWork::default());
    let controller =
        DeferredController::with_work(&DeviceConfig::fast(), table, work.clone());

    controller.arm_deferred(Duration::ZERO);
    assert_eq!(controller.mode(), TimerMode::DeferredBlocking);
    wait_until(|| controller.stats().executor.submitted == 1).await;
    assert!(controller.is_work_pending());

    // Second firing while the first run is still blocked
    controller.arm_deferred(Duration::ZERO);
    wait_until(|| controller.stats().executor.coalesced == 1).await;

    work.open();
    wait_until(|| !controller.is_work_pending()).await;

    let stats = controller.stats();
    assert_eq!(stats.firings, 2);
    assert_eq!(stats.executor.submitted, 1);
    assert_eq!(stats.executor.coalesced, 1);
    assert_eq!(stats.executor.completed, 1);
    assert_eq!(work.runs(), 1);

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deferred_work_runs_again_after_completion() {
    let table = Arc::new(ProcessTable::new());
    let work = Arc::new(GatedWork::default());
    work.open();
    let controller =
        DeferredController::with_work(&DeviceConfig::fast(), table, work.clone());

    controller.arm_deferred(Duration::ZERO);
    wait_until(|| controller.stats().executor.completed == 1).await;

    controller.arm_deferred(Duration::ZERO);
    wait_until(|| controller.stats().executor.completed == 2).await;

    let stats = controller.stats();
    assert_eq!(stats.executor.submitted, 2);
    assert_eq!(stats.executor.coalesced, 0);
    assert_eq!(work.runs(), 2);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_controllers_are_independent() {
    let (first, _first_table) = controller();
    let (second, _second_table) = controller();

    first.arm(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(first.firings(), 1);
    assert_eq!(second.firings(), 0);
    assert_eq!(second.mode(), TimerMode::None);

    first.shutdown().await;
    second.shutdown().await;
}
