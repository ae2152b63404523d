/*!
 * Deferred Work Device - Demo Entry Point
 *
 * Loads the device over an in-memory process table and walks through each
 * control command:
 * - One-shot timer
 * - Cancellation
 * - Deferred blocking work
 * - Process monitoring with pruning of exited tasks
 */

use anyhow::Context;
use deferred_work::device::{TIMER_ALLOC, TIMER_CANCEL, TIMER_MON, TIMER_SET};
use deferred_work::{init_tracing, Device, DeviceConfig, ProcessTable};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Deferred work device starting...");
    info!("================================================");

    let config = DeviceConfig::from_env().context("loading device configuration")?;
    info!(
        monitor_period_ms = config.monitor_period.as_millis() as u64,
        blocking_io_ms = config.blocking_io.as_millis() as u64,
        max_monitored = config.max_monitored,
        "Configuration loaded"
    );
    let monitor_period = config.monitor_period;
    let blocking_io = config.blocking_io;

    info!("Populating process table...");
    let table = Arc::new(ProcessTable::new());
    let shell = table.spawn("sh");
    let daemon = table.spawn("crond");
    let job = table.spawn("backup-job");

    let device = Device::load(config, table.clone());
    let session = device.open();

    info!("One-shot timer (1s)...");
    session.ioctl(TIMER_SET, 1).await?;
    tokio::time::sleep(Duration::from_millis(1200)).await;

    info!("Arming and cancelling a timer...");
    session.ioctl(TIMER_SET, 5).await?;
    session.ioctl(TIMER_CANCEL, 0).await?;

    info!("Deferred blocking work (timer at 0s)...");
    session.ioctl(TIMER_ALLOC, 0).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    info!("Monitoring processes...");
    for pid in [shell, daemon, job] {
        session.ioctl(TIMER_MON, u64::from(pid)).await?;
    }
    if let Err(e) = session.ioctl(TIMER_MON, 99_999).await {
        warn!(error = %e, errno = e.errno(), "monitor of missing pid rejected");
    }

    table.exit(job);
    tokio::time::sleep(monitor_period * 2).await;
    info!(monitored = ?device.controller().monitored_pids(), "after one exit");

    // Give the deferred work time to finish before teardown drains it
    tokio::time::sleep(blocking_io).await;

    let stats = device.controller().stats();
    info!(
        stats = %serde_json::to_string(&stats).context("serializing stats")?,
        "Controller statistics"
    );

    session.release();
    let report = device.unload().await;
    info!(
        entries_released = report.entries_released,
        outstanding = table.outstanding(),
        "Device unloaded"
    );
    info!("================================================");

    Ok(())
}
