/*!
 * Process Monitor Tests
 * Pruning behaviour across several monitored tasks
 */

use deferred_work::{DeferredController, DeviceConfig, ProcessTable};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const PERIOD: Duration = Duration::from_secs(1);

#[tokio::test(start_paused = true)]
async fn test_prunes_only_dead_tasks() {
    let table = Arc::new(ProcessTable::new());
    let controller = DeferredController::new(&DeviceConfig::default(), table.clone());

    let pids: Vec<_> = ["init", "sshd", "cron", "job"]
        .into_iter()
        .map(|comm| table.spawn(comm))
        .collect();
    for &pid in &pids {
        controller.monitor(pid, PERIOD).unwrap();
    }
    assert_eq!(table.outstanding(), 4);

    table.exit(pids[1]);
    table.exit(pids[3]);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(controller.monitored_pids(), vec![pids[0], pids[2]]);
    assert_eq!(controller.stats().pruned_total, 2);
    assert_eq!(table.outstanding(), 2);

    controller.shutdown().await;
    assert_eq!(table.outstanding(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exit_between_scans() {
    let table = Arc::new(ProcessTable::new());
    let controller = DeferredController::new(&DeviceConfig::default(), table.clone());

    let a = table.spawn("a");
    let b = table.spawn("b");
    controller.monitor(a, PERIOD).unwrap();
    controller.monitor(b, PERIOD).unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(controller.monitored_len(), 2);

    table.exit(a);
    tokio::time::sleep(PERIOD).await;
    assert_eq!(controller.monitored_pids(), vec![b]);

    table.exit(b);
    tokio::time::sleep(PERIOD).await;
    assert_eq!(controller.monitored_len(), 0);
    assert_eq!(controller.stats().pruned_total, 2);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_same_pid_monitored_twice() {
    let table = Arc::new(ProcessTable::new());
    let controller = DeferredController::new(&DeviceConfig::default(), table.clone());
    let pid = table.spawn("twice");

    controller.monitor(pid, PERIOD).unwrap();
    controller.monitor(pid, PERIOD).unwrap();
    assert_eq!(controller.monitored_pids(), vec![pid, pid]);
    assert_eq!(table.usage(pid), Some(2));

    table.exit(pid);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(controller.monitored_len(), 0);
    assert_eq!(table.outstanding(), 0);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_exited_pid_cannot_be_monitored() {
    let table = Arc::new(ProcessTable::new());
    let controller = DeferredController::new(&DeviceConfig::default(), table.clone());
    let pid = table.spawn("short-lived");

    table.exit(pid);
    assert!(controller.monitor(pid, PERIOD).is_err());
    assert_eq!(controller.monitored_len(), 0);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stats_serialize() {
    let table = Arc::new(ProcessTable::new());
    let controller = DeferredController::new(&DeviceConfig::default(), table.clone());
    let pid = table.spawn("observed");
    controller.monitor(pid, PERIOD).unwrap();

    let json = serde_json::to_value(controller.stats()).unwrap();
    assert_eq!(json["mode"], "process_monitor");
    assert_eq!(json["monitored"], serde_json::json!([pid]));
    assert_eq!(json["timer_pending"], true);

    controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_monitor_commands() {
    let table = Arc::new(ProcessTable::new());
    let controller = Arc::new(DeferredController::new(
        &DeviceConfig::fast(),
        table.clone(),
    ));

    let pids: Vec<_> = (0..16).map(|i| table.spawn(format!("proc-{i}"))).collect();
    let tasks = pids.iter().map(|&pid| {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.monitor(pid, Duration::from_millis(20)) })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }
    assert_eq!(controller.monitored_len(), 16);

    // Scans run on the real clock while half the tasks exit
    for &pid in pids.iter().step_by(2) {
        table.exit(pid);
    }
    crate::support::wait_until(|| controller.monitored_len() == 8).await;
    assert_eq!(table.outstanding(), 8);

    let report = controller.shutdown().await;
    assert_eq!(report.entries_released, 8);
    assert_eq!(table.outstanding(), 0);
}
