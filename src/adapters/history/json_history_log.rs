use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::core::errors::{Result, StratusError};
use crate::core::models::history_entry::HistoryEntry;
use crate::core::traits::history::HistoryLog;

/// History log that appends entries as JSON lines to a file.
///
/// Each line in the log file is a self-contained JSON object
/// representing one `HistoryEntry`. This format supports efficient
/// append operations and line-by-line streaming reads.
pub struct JsonHistoryLog {
    log_path: PathBuf,
}

impl JsonHistoryLog {
    pub fn new(log_path: &Path) -> Self {
        Self {
            log_path: log_path.to_path_buf(),
        }
    }
}

impl HistoryLog for JsonHistoryLog {
    fn record(&self, entry: &HistoryEntry) -> Result<()> {
        let line = serde_json::to_string(entry).map_err(|e| StratusError::HistoryError {
            detail: format!("Failed to serialize history entry: {e}"),
        })?;

        // Ensure the parent directory exists
        if let Some(parent) = self.log_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| StratusError::HistoryError {
                detail: format!("Cannot open history log at {}: {e}", self.log_path.display()),
            })?;

        writeln!(file, "{line}").map_err(|e| StratusError::HistoryError {
            detail: format!("Failed to write history entry: {e}"),
        })?;

        Ok(())
    }

    fn query(
        &self,
        environment: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.log_path).map_err(|e| StratusError::HistoryError {
            detail: format!("Cannot read history log: {e}"),
        })?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| StratusError::HistoryError {
                detail: format!("Error reading history log line {}: {e}", line_num + 1),
            })?;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let entry: HistoryEntry =
                serde_json::from_str(trimmed).map_err(|e| StratusError::HistoryError {
                    detail: format!("Malformed history entry at line {}: {e}", line_num + 1),
                })?;

            if let Some(env_filter) = environment
                && entry.environment != env_filter
            {
                continue;
            }

            if let Some(since_date) = since
                && entry.timestamp < since_date
            {
                continue;
            }

            entries.push(entry);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::history_entry::HistoryAction;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_entry(environment: &str, action: HistoryAction) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc::now(),
            author: "Alice".to_string(),
            email: Some("alice@test.com".to_string()),
            action,
            environment: environment.to_string(),
            stacks: vec!["demo-network-dev".to_string()],
            detail: None,
        }
    }

    #[test]
    fn record_and_query_round_trip() {
        let tmp = TempDir::new().unwrap();
        let log = JsonHistoryLog::new(&tmp.path().join("history.log"));

        log.record(&sample_entry("dev", HistoryAction::Deploy)).unwrap();

        let results = log.query(None, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].environment, "dev");
        assert_eq!(results[0].action, HistoryAction::Deploy);
    }

    #[test]
    fn multiple_entries_appended() {
        let tmp = TempDir::new().unwrap();
        let log = JsonHistoryLog::new(&tmp.path().join("history.log"));

        log.record(&sample_entry("dev", HistoryAction::Synth)).unwrap();
        log.record(&sample_entry("dev", HistoryAction::Deploy)).unwrap();
        log.record(&sample_entry("prod", HistoryAction::Deploy)).unwrap();

        let results = log.query(None, None).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn filter_by_environment() {
        let tmp = TempDir::new().unwrap();
        let log = JsonHistoryLog::new(&tmp.path().join("history.log"));

        log.record(&sample_entry("dev", HistoryAction::Deploy)).unwrap();
        log.record(&sample_entry("prod", HistoryAction::Deploy)).unwrap();

        let results = log.query(Some("prod"), None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].environment, "prod");
    }

    #[test]
    fn filter_by_since() {
        let tmp = TempDir::new().unwrap();
        let log = JsonHistoryLog::new(&tmp.path().join("history.log"));

        let old = HistoryEntry {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ..sample_entry("dev", HistoryAction::Init)
        };
        let recent = HistoryEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
            ..sample_entry("dev", HistoryAction::Deploy)
        };

        log.record(&old).unwrap();
        log.record(&recent).unwrap();

        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let results = log.query(None, Some(cutoff)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].action, HistoryAction::Deploy);
    }

    #[test]
    fn query_nonexistent_file_returns_empty() {
        let log = JsonHistoryLog::new(Path::new("/nonexistent/history.log"));

        let results = log.query(None, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn record_creates_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join(".stratus").join("history.log");
        let log = JsonHistoryLog::new(&nested);

        log.record(&sample_entry("dev", HistoryAction::Init)).unwrap();

        assert!(nested.exists());
    }
}
