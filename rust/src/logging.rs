use std::path::Path;

use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "hangouts_core=debug,hangouts_sqlite_storage=info,info";

/// Installs the global subscriber: stderr plus `<data_dir>/hangouts.log`.
///
/// `RUST_LOG` overrides the default filter. Safe to call more than once; only
/// the first call installs anything. The file layer is skipped when the data
/// dir is not writable.
pub fn init_logging(data_dir: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    let log_path = Path::new(data_dir).join("hangouts.log");
    let _ = std::fs::create_dir_all(data_dir);
    let file_layer = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
        });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
}
