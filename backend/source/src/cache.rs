use std::collections::HashMap;

/// Session-lifetime source cache keyed by normalized URL.
///
/// Never persisted; dropped with the session.
#[derive(Debug, Default, Clone)]
pub struct SourceCache {
    entries: HashMap<String, String>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn insert(&mut self, url: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(url.into(), text.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
