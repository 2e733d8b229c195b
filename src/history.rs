use std::collections::VecDeque;

/// Default number of lines kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Bounded log of executed lines with a navigation cursor.
///
/// The cursor ranges over `0..=len`; `len` means "past the newest entry" and is
/// where every append leaves it.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: usize,
}

impl HistoryBuffer {
    /// An empty buffer keeping at most `capacity` lines (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity: capacity.max(1),
            cursor: 0,
        }
    }

    /// Append a line unless it repeats the newest entry, then reset the cursor.
    pub fn push(&mut self, line: &str) {
        if self.entries.back().map(String::as_str) != Some(line) {
            self.entries.push_back(line.to_string());
            while self.entries.len() > self.capacity {
                self.entries.pop_front();
            }
        }
        self.cursor = self.entries.len();
    }

    /// Step toward the oldest entry; stays on it once reached.
    pub fn previous(&mut self) -> &str {
        if self.entries.is_empty() {
            return "";
        }
        self.cursor = self.cursor.saturating_sub(1);
        &self.entries[self.cursor]
    }

    /// Step toward the newest entry; stays on it once reached.
    pub fn next(&mut self) -> &str {
        if self.entries.is_empty() {
            return "";
        }
        self.cursor = (self.cursor + 1).min(self.entries.len() - 1);
        &self.entries[self.cursor]
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of stored lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of lines kept; older ones are dropped first.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget every line and reset the cursor.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
