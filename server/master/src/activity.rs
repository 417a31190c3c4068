use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;

/// Fed one line per significant event (peer connect/disconnect, grant/
/// release, auth failure). The default implementation rolls a new file at
/// midnight; a no-op implementation exists for tests.
pub trait ActivitySink: Send + Sync {
    fn record(&self, line: &str);
}

pub struct NoopActivitySink;

impl ActivitySink for NoopActivitySink {
    fn record(&self, _line: &str) {}
}

/// Appends to `YYYY-MM-DD.activity.log` under `dir`, opening a new file the
/// first time a line is recorded on a new day.
pub struct DailyFileActivitySink {
    dir: PathBuf,
    open: Mutex<Option<(String, File)>>,
}

impl DailyFileActivitySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), open: Mutex::new(None) }
    }
}

impl ActivitySink for DailyFileActivitySink {
    fn record(&self, line: &str) {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let mut open = self.open.lock().unwrap();

        let needs_new = !matches!(&*open, Some((day, _)) if *day == today);
        if needs_new {
            let path = self.dir.join(format!("{today}.activity.log"));
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => *open = Some((today, file)),
                Err(e) => {
                    tracing::error!(error = %e, path = %path.display(), "failed to open activity log");
                    return;
                }
            }
        }

        if let Some((_, file)) = open.as_mut() {
            if let Err(e) = writeln!(file, "{} {}", Utc::now().to_rfc3339(), line) {
                tracing::error!(error = %e, "failed to write activity log line");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_sink_creates_a_dated_file() {
        let dir = std::env::temp_dir().join(format!("fne-activity-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let sink = DailyFileActivitySink::new(&dir);
        sink.record("peer 9001 connected");

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let path = dir.join(format!("{today}.activity.log"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("peer 9001 connected"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn noop_sink_does_nothing() {
        NoopActivitySink.record("ignored");
    }
}
