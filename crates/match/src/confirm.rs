use std::collections::BTreeSet;

use crate::model::Value;

/// Master key values a reviewer has confirmed.
///
/// Identity is the key value's text, not the row: a confirmation survives a
/// re-upload as long as the same key text reappears, and it covers every
/// master row that shares that key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationStore {
    keys: BTreeSet<String>,
}

impl ConfirmationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.keys.contains(&key.key_text())
    }

    pub fn contains_text(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Returns true if the key was not already confirmed.
    pub fn insert(&mut self, key: &Value) -> bool {
        self.keys.insert(key.key_text())
    }

    /// Returns true if the key was confirmed.
    pub fn remove(&mut self, key: &Value) -> bool {
        self.keys.remove(&key.key_text())
    }

    /// Flip membership; returns the new state.
    pub fn toggle(&mut self, key: &Value) -> bool {
        if self.remove(key) {
            false
        } else {
            self.insert(key);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ConfirmationStore {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(Into::into).collect(),
        }
    }
}
