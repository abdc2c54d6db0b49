//! Flash values: written on one request, read once on a later one
//!
//! Entries live in their own namespace inside the session payload. Reading
//! an entry removes it from the in-memory session, and the ordinary change
//! detection persists the removal at the end of the request.

use super::value::Value;
use std::collections::BTreeMap;

/// Read-once view over a session's flash namespace
#[derive(Debug)]
pub struct Flash<'a> {
    entries: &'a mut BTreeMap<String, Value>,
}

impl<'a> Flash<'a> {
    pub(crate) fn new(entries: &'a mut BTreeMap<String, Value>) -> Self {
        Self { entries }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Take a value; later reads return `None`
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Look at a value without consuming it
    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Take every value at once
    pub fn take_all(&mut self) -> BTreeMap<String, Value> {
        std::mem::take(&mut *self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
