//! Structured logging setup.
//!
//! Tables go to stdout; diagnostics go to stderr through `tracing` so they
//! never corrupt a piped table or CSV stream. Level defaults to WARN and is
//! overridable with `RUST_LOG`; `LOG_FORMAT=json` switches the stderr layer
//! to JSON, and `LOOKER_AUDIT_LOG_DIR` additionally mirrors events into a
//! daily-rolling file for long audit sessions.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize the subscriber. The returned guard (when file logging is on)
/// must live until process exit so buffered events get flushed.
pub fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));

    match std::env::var("LOOKER_AUDIT_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "looker-audit.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let registry = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false));
            if json {
                registry
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            } else {
                registry
                    .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                    .init();
            }
            Some(guard)
        }
        Err(_) => {
            let registry = tracing_subscriber::registry().with(filter);
            if json {
                registry
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            } else {
                registry
                    .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                    .init();
            }
            None
        }
    }
}
