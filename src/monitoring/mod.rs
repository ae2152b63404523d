/*!
 * Monitoring Module
 * Logging setup and command spans
 */

mod tracer;

pub use tracer::{init_tracing, CommandSpan, ENV_TRACE_JSON};
