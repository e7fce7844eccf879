//! Console and file logging.

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber: console output plus a timestamped log file
/// under `<exe_dir>/logs/`. The filter defaults to `info` and honors `RUST_LOG`.
///
/// Returns the log file path, or `None` when only the console is used.
pub fn init_logging() -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_path = log_file_path();
    let file = fs::create_dir_all(crate::paths::get_logs_dir())
        .and_then(|_| File::create(&log_path))
        .ok();
    let file_layer = file.map(|f| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(f))
    });
    let logging_to_file = file_layer.is_some();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();

    logging_to_file.then_some(log_path)
}

/// `<exe_dir>/logs/screenboot_<YYYYmmdd_HHMMSS>.log`
pub fn log_file_path() -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    crate::paths::get_logs_dir().join(format!("screenboot_{}.log", timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        let path = log_file_path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("screenboot_"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "screenboot_YYYYmmdd_HHMMSS.log".len());
    }
}
