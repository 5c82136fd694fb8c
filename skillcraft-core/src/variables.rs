//! # Context Variables
//!
//! The variable bag threaded through plans and skills. Every argument and
//! every result is plain text; the distinguished `input` slot carries the
//! primary value from one step to the next.
//!
//! Keys are ASCII case-insensitive (`Path`, `path` and `PATH` are the same
//! slot).
//! The casing used on first insertion is kept for display and serialization,
//! and insertion order is preserved so serialized plans are deterministic.

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Name of the primary variable
pub const INPUT_KEY: &str = "input";

/// Ordered, case-insensitive string-to-string map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextVariables {
    /// Folded key -> (original key, value)
    entries: IndexMap<String, (String, String)>,
}

fn fold(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl ContextVariables {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bag holding only `input`
    pub fn with_input(input: impl Into<String>) -> Self {
        let mut vars = Self::new();
        vars.update(input);
        vars
    }

    /// The primary value, empty when unset
    pub fn input(&self) -> &str {
        self.get(INPUT_KEY).unwrap_or("")
    }

    /// Overwrite the primary value
    pub fn update(&mut self, input: impl Into<String>) {
        self.set(INPUT_KEY, input);
    }

    /// Get a value; `None` when the key is missing
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&fold(key)).map(|(_, v)| v.as_str())
    }

    /// Get a value only when it is present and non-empty
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Set a value, overwriting any existing one under the same key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.get_mut(&fold(&key)) {
            Some(entry) => entry.1 = value,
            None => {
                self.entries.insert(fold(&key), (key, value));
            }
        }
    }

    /// Remove a value, returning it
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(&fold(key)).map(|(_, v)| v)
    }

    /// Check if a key is present (even with an empty value)
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&fold(key))
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bag is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(k, _)| k.as_str())
    }

    /// Copy every variable from `other` that is not already present here.
    /// Existing values are never overwritten.
    pub fn merge_missing(&mut self, other: &ContextVariables) {
        for (key, value) in other.iter() {
            if !self.contains_key(key) {
                self.set(key, value);
            }
        }
    }

    /// Copy every variable from `other`, overwriting on conflict
    pub fn merge(&mut self, other: &ContextVariables) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }
}

impl fmt::Display for ContextVariables {
    /// Displays the primary value, which is what a step "returns"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input())
    }
}

impl<K, V> FromIterator<(K, V)> for ContextVariables
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (k, v) in iter {
            vars.set(k, v);
        }
        vars
    }
}

impl Serialize for ContextVariables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ContextVariables {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VariablesVisitor;

        impl<'de> Visitor<'de> for VariablesVisitor {
            type Value = ContextVariables;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an object of string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut vars = ContextVariables::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    vars.set(key, value);
                }
                Ok(vars)
            }
        }

        deserializer.deserialize_map(VariablesVisitor)
    }
}
