use std::sync::{Arc, Mutex};

/// Shared, ordered log of what every mock was asked to do.
///
/// # Example
///
/// ```ignore
/// let journal = Journal::new();
/// // ... mocks push "media:call", "data:open", ...
/// assert!(journal.position("media:call") < journal.position("data:connect"));
/// ```
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::debug!("[Journal] {}", entry);
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| *e == entry)
            .count()
    }

    /// Index of the first occurrence. Panics when absent so ordering
    /// assertions fail with the full journal in the message.
    pub fn position(&self, entry: &str) -> usize {
        let entries = self.entries();
        entries
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("'{entry}' not in journal: {entries:?}"))
    }

    /// Asserts that the given entries appear in this relative order.
    pub fn assert_order(&self, expected: &[&str]) {
        let positions: Vec<usize> = expected.iter().map(|e| self.position(e)).collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "expected order {:?}, journal: {:?}",
            expected,
            self.entries()
        );
    }
}
