use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE: &str = "roadmap-grid.log";

/// Install the global subscriber: stderr plus a file in `log_dir`.
/// `RUST_LOG` overrides the default filter. Keep the guard alive for the
/// life of the program or buffered file lines are lost.
pub fn init(log_dir: &Path) -> WorkerGuard {
    if let Err(err) = std::fs::create_dir_all(log_dir) {
        eprintln!("cannot create log directory {}: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "roadmap_grid=debug,warn".into()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr));
    if registry.try_init().is_err() {
        eprintln!("a tracing subscriber is already installed");
    }
    guard
}
