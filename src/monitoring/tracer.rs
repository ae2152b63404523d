/*!
 * Structured Tracing
 * Subscriber setup and per-command spans for the control surface
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Environment variable enabling JSON output
pub const ENV_TRACE_JSON: &str = "DEFERRED_TRACE_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - DEFERRED_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .is_ok()
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Commands slower than this are reported at `warn`
const SLOW_COMMAND: Duration = Duration::from_millis(10);

/// Span covering one control command on one session
///
/// Records the outcome and duration when dropped. `TIMER_CANCEL` waits for
/// a running callback, so it is the usual source of slow-command warnings.
pub struct CommandSpan {
    span: Span,
    start: Instant,
    command: &'static str,
}

impl CommandSpan {
    pub fn new(session: Uuid, command: &'static str, arg: u64) -> Self {
        let span = span!(
            Level::DEBUG,
            "control_command",
            session = %session,
            command,
            arg,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
            errno = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            command,
        }
    }

    /// The underlying span, for `Instrument`
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn record_ok(&self) {
        self.span.record("result", "ok");
    }

    pub fn record_errno(&self, errno: i32) {
        self.span.record("result", "error");
        self.span.record("errno", errno);
    }
}

impl Drop for CommandSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        self.span.record("duration_us", elapsed.as_micros() as u64);

        let _entered = self.span.enter();
        if elapsed > SLOW_COMMAND {
            warn!(
                command = self.command,
                duration_ms = elapsed.as_millis() as u64,
                "slow control command"
            );
        } else {
            debug!(
                command = self.command,
                duration_us = elapsed.as_micros() as u64,
                "control command done"
            );
        }
    }
}
