use crate::core::errors::Result;
use crate::core::models::history_entry::HistoryEntry;

/// Port for recording and querying deployment history.
pub trait HistoryLog: Send + Sync {
    /// Append an entry to the history log.
    fn record(&self, entry: &HistoryEntry) -> Result<()>;

    /// Query all entries, optionally filtered.
    fn query(
        &self,
        environment: Option<&str>,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<HistoryEntry>>;
}
