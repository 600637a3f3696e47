// Conditional logging macros - only active in debug builds

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        log::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {{}};
}

#[cfg(debug_assertions)]
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        log::info!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{}};
}

const LOG_DIR: &str = "nba-mantle";
const LOG_FILE: &str = "nba-mantle.log";

/// Where the log file goes: `<cache dir>/nba-mantle/nba-mantle.log`.
pub fn log_file_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(LOG_DIR).join(LOG_FILE))
}

/// Install the global logger, filtered by `RUST_LOG` (default `info`).
///
/// Logs go to the file from [`log_file_path`] so they do not corrupt the
/// terminal UI; stderr is used when the file cannot be opened. Returns the
/// log file path when one is in use.
pub fn init_logging() -> Option<PathBuf> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    let opened = log_file_path().and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;
        Some((path, file))
    });

    let path = match opened {
        Some((path, file)) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            Some(path)
        }
        None => None,
    };

    if builder.try_init().is_err() {
        return None;
    }
    path
}
