use serde::{Deserialize, Serialize};
use toml::{Table, Value};

/// Key every renderer understands: whether it takes part in conversion.
pub const ENABLED: &str = "enabled";

/// A renderer's settings tree.
///
/// Renderers start from their own defaults and receive caller overrides via
/// [`Settings::merge`]. Merging is shallow: scalars overwrite, tables are
/// updated key by key, arrays are extended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Table);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build settings from a table of defaults.
    pub fn from_table(table: Table) -> Self {
        Self(table)
    }

    /// Whether the owning renderer is enabled. Absent means enabled.
    pub fn enabled(&self) -> bool {
        self.0.get(ENABLED).and_then(Value::as_bool).unwrap_or(true)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.set(ENABLED, enabled);
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_table(&self, key: &str) -> Option<&Table> {
        self.0.get(key).and_then(Value::as_table)
    }

    /// String items of an array value; non-string items are skipped.
    pub fn get_strings(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Merge caller-supplied settings into these ones.
    pub fn merge(&mut self, update: &Table) {
        for (key, value) in update {
            match (self.0.get_mut(key), value) {
                (None, value) => {
                    self.0.insert(key.clone(), value.clone());
                }
                (Some(Value::Array(current)), Value::Array(extra)) => {
                    current.extend(extra.iter().cloned());
                }
                (Some(Value::Table(current)), Value::Table(extra)) => {
                    for (k, v) in extra {
                        current.insert(k.clone(), v.clone());
                    }
                }
                (Some(slot), value) => *slot = value.clone(),
            }
        }
    }
}
