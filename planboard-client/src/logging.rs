/// Process logger: `env_logger` filtering and stderr output, with every
/// accepted record also appended to `<config_dir>/planboard/logs/client.log`.
use env_logger::Logger;
use log::{Log, Metadata, Record, SetLoggerError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub level: String,
    pub target: String,
    pub message: String,
}

struct ClientLogFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl ClientLogFile {
    fn new(path: PathBuf) -> Self {
        let file = Self::open(&path).ok();
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn append_entry(&self, entry: &LogEntry) {
        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if guard.is_none() {
            match Self::open(&self.path) {
                Ok(file) => *guard = Some(file),
                Err(_) => return,
            }
        }
        if let Some(file) = guard.as_mut() {
            let _ = writeln!(file, "{}", format_log_line(entry));
            let _ = file.flush();
        }
    }
}

static LOG_FILE: LazyLock<ClientLogFile> =
    LazyLock::new(|| ClientLogFile::new(default_log_path()));

pub fn default_log_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planboard")
        .join("logs")
        .join("client.log")
}

pub fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "{} [{}] [{}] {}",
        entry.timestamp_ms,
        entry.level.to_uppercase(),
        entry.target,
        entry.message.replace('\n', "\\n")
    )
}

struct ClientLogger {
    inner: Logger,
}

impl Log for ClientLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.inner.log(record);

        let entry = LogEntry {
            timestamp_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
            level: record.level().to_string().to_lowercase(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        };
        LOG_FILE.append_entry(&entry);
    }

    fn flush(&self) {
        self.inner.flush();
        if let Ok(mut guard) = LOG_FILE.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Install the logger. `RUST_LOG` overrides `default_filter` (e.g. "info").
pub fn init(default_filter: &str) -> Result<(), SetLoggerError> {
    let inner = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .build();
    let max_level = inner.filter();
    let logger = Box::leak(Box::new(ClientLogger { inner }));
    log::set_logger(logger)?;
    log::set_max_level(max_level);
    Ok(())
}

pub fn log_file_path() -> String {
    LOG_FILE.path.display().to_string()
}
