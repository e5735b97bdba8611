/*!
 * Monitoring
 * Structured logging setup
 */

mod tracer;

pub use tracer::{init_tracing, tracing_installed, ENV_TRACE_JSON};
