use std::collections::HashMap;

/// Key-value map owned by exactly one node. Only that node's RPC handlers
/// mutate it, so no locking is involved.
#[derive(Debug, Default, Clone)]
pub struct LocalStore {
    data: HashMap<String, String>,
}

impl LocalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites.
    pub fn put(&mut self, key: String, value: String) {
        self.data.insert(key, value);
    }

    /// Current value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Deletes `key`, returning what it held. Absent keys are left alone.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no key is held.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
