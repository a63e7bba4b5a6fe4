/// Most-recent-first list of unique search queries, capped at `limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHistory {
    entries: Vec<String>,
    limit: usize,
}

impl SearchHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
        }
    }

    /// Rebuilds a history from stored entries, dropping blanks and
    /// duplicates and enforcing the cap.
    pub fn from_entries(entries: impl IntoIterator<Item = String>, limit: usize) -> Self {
        let mut history = Self::new(limit);
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() || history.entries.iter().any(|e| e == entry) {
                continue;
            }
            history.entries.push(entry.to_string());
        }
        history.entries.truncate(limit);
        history
    }

    pub fn from_json(raw: &str, limit: usize) -> Result<Self, serde_json::Error> {
        let entries: Vec<String> = serde_json::from_str(raw)?;
        Ok(Self::from_entries(entries, limit))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    /// Moves `query` to the front. Returns `false` for a blank query.
    pub fn record(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        self.entries.retain(|existing| existing != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(self.limit);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;
