/*!
 * Tracing Setup
 * Installs the process-wide `tracing` subscriber that renders the toolkit's
 * lifecycle and failure events
 */

use crate::core::atomic::AtomicCell;
use crate::core::atomic::OrderingToken::{AcqRel, Acquire};
use tracing::info;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Set to `1` or `true` for JSON log lines
pub const ENV_TRACE_JSON: &str = "TOOLKIT_TRACE_JSON";

static INSTALLED: AtomicCell<bool> = AtomicCell::<bool>::const_new(false);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - TOOLKIT_TRACE_JSON: Enable JSON output (default: false)
///
/// Only the first call installs a subscriber. Returns false when tracing was
/// already initialized, by this function or by another subscriber.
pub fn init_tracing() -> bool {
    if INSTALLED.swap(true, AcqRel) {
        return false;
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "tracing initialized");
    }
    installed
}

/// True once `init_tracing` has run
pub fn tracing_installed() -> bool {
    INSTALLED.load(Acquire)
}
