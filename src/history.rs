use std::path::PathBuf;

/// Maximum number of remembered search terms.
pub const MAX_HISTORY: usize = 5;

/// Recent-search history persisted as a small JSON file.
///
/// Purely local preference state: most-recent-first, case-insensitively
/// deduplicated, capped at [`MAX_HISTORY`] entries. Reading never fails:
/// a missing, unreadable, or corrupt file degrades to an empty history.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    path: PathBuf,
}

impl SearchHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The remembered terms, most recent first.
    pub fn entries(&self) -> Vec<String> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let mut entries: Vec<String> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(error = %err, "ignoring corrupt search history");
                return Vec::new();
            }
        };
        entries.truncate(MAX_HISTORY);
        entries
    }

    /// Remember a submitted search term.
    ///
    /// Blank input is a no-op. An existing case-insensitive duplicate is
    /// removed first, so the newest casing wins and moves to the front.
    /// Write failures are logged and swallowed; history is best-effort.
    pub fn save(&self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }

        let needle = term.to_lowercase();
        let mut entries = self.entries();
        entries.retain(|entry| entry.to_lowercase() != needle);
        entries.insert(0, term.to_string());
        entries.truncate(MAX_HISTORY);

        match serde_json::to_string(&entries) {
            Ok(encoded) => {
                if let Err(err) = std::fs::write(&self.path, encoded) {
                    tracing::debug!(error = %err, "failed to persist search history");
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "failed to encode search history");
            }
        }
    }
}
