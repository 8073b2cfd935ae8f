//! Session logger: a `log::Log` implementation that writes every record to a
//! single file in the OS data directory.
//!
//! The file is **truncated at each launch**, so it only ever holds the most
//! recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\AdStudio\adstudio.log`
//!   Linux:    `~/.local/share/AdStudio/adstudio.log`
//!   macOS:    `~/Library/Application Support/AdStudio/adstudio.log`
//!
//! Call sites use the `log` macros (`log::info!`, `log::warn!`, ...). A panic
//! hook mirrors panic messages into the same file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::settings::{APP_DIR_NAME, data_dir};

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

struct SessionLogger {
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
    echo_stderr: bool,
}

impl SessionLogger {
    fn write_line(&self, line: &str) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{}", line);
            }
        }
        if self.echo_stderr {
            eprintln!("{}", line);
        }
    }
}

impl log::Log for SessionLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.write_line(&format!(
            "[{}] [{}] {}: {}",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Initialise the session logger. Only the first call has any effect.
///
/// * Creates (or truncates) the log file. Failing to open it is not fatal;
///   records then only go to stderr when `echo_stderr` is set.
/// * Installs a panic hook that writes the panic message to the log before
///   running the previous hook.
pub fn init(level: log::LevelFilter, echo_stderr: bool) {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new().create(true).write(true).truncate(true).open(&path);
    let (file, path) = match file {
        Ok(f) => (Some(Mutex::new(f)), Some(path)),
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            (None, None)
        }
    };

    let logger = LOGGER.get_or_init(|| SessionLogger { file, path, echo_stderr });
    if log::set_logger(logger).is_err() {
        return;
    }
    log::set_max_level(level);

    logger.write_line(&format!("=== AdStudio session started {} ===", human_timestamp()));
    if let Some(path) = &logger.path {
        logger.write_line(&format!("Log file: {}", path.display()));
    }

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(logger) = LOGGER.get() {
            logger.write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        }
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join(APP_DIR_NAME).join("adstudio.log")
}

/// `HH:MM:SS` within the current UTC day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}
