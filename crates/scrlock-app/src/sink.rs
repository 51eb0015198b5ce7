//! Message persistence.

use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};

/// Stores messages left on the lock screen.
pub trait MessageSink {
    /// Persist one message stamped with `at`.
    fn save(&mut self, text: &str, at: DateTime<Local>) -> io::Result<()>;
}

/// One log record: `[YYYY-MM-DD HH:MM] text\n`.
pub fn format_record(text: &str, at: DateTime<Local>) -> String {
    format!("[{}] {text}\n", at.format("%Y-%m-%d %H:%M"))
}

/// Append-only, human-readable message log.
#[derive(Debug, Clone)]
pub struct FileMessageSink {
    path: PathBuf,
}

impl FileMessageSink {
    /// Sink appending to `path`. Nothing is touched until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageSink for FileMessageSink {
    fn save(&mut self, text: &str, at: DateTime<Local>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(format_record(text, at).as_bytes())?;
        file.flush()
    }
}
