use std::{fs, io, path::Path};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the file writer flushing until dropped.
#[must_use]
pub enum LogFlusher {
    File(WorkerGuard),
    Stderr,
}

fn default_filter(debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Installs the global subscriber. `RUST_LOG` wins over `debug`. With a log
/// file, output goes to that file only.
pub fn init_logging(log_file: Option<&Path>, debug: bool) -> io::Result<LogFlusher> {
    let filter = default_filter(debug);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            Ok(LogFlusher::File(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .try_init()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            Ok(LogFlusher::Stderr)
        }
    }
}
