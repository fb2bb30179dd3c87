//! Telemetry initialization.
//!
//! Controlled by `UMS_BRIDGE_LOG_FORMAT`:
//! - unset or `"compact"` → human-readable events to stderr
//! - `"json"` → JSON spans/events to stderr (machine-ingestible)
//!
//! The event filter follows `RUST_LOG` (default `"info"`). Watchers log at
//! `debug` for per-tick noise and `warn`/`error` for dropped or failed work,
//! so a quiet `umsb watch` session stays quiet.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber for the `umsb` binary.
///
/// Safe to call once per process; a second call is a no-op (the global
/// subscriber can only be set once and the failure is swallowed).
pub fn init() {
    let format = std::env::var("UMS_BRIDGE_LOG_FORMAT").ok();

    match format.as_deref() {
        Some("json") => init_json(),
        _ => init_compact(),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// JSON events to stderr via tracing-subscriber's JSON formatter.
fn init_json() {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
        )
        .try_init();
}

/// Compact human-readable events to stderr.
fn init_compact() {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
