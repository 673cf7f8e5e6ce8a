//! Durable key-value persistence
//!
//! The session store only needs `get`/`set` of JSON values by key. `set` is
//! write-through: when it returns `Ok` the value is on disk.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

/// JSON object file holding every key, rewritten on each `set`
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable or
    /// corrupt file is logged and also starts empty so callers can self-heal.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => {
                    info!(path = %path.display(), keys = map.len(), "Loaded persisted state");
                    map
                }
                Ok(other) => {
                    warn!(path = %path.display(), kind = %json_kind(&other), "Persisted state is not a JSON object, starting empty");
                    Map::new()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Persisted state is corrupt, starting empty");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No persisted state yet");
                Map::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read persisted state, starting empty");
                Map::new()
            }
        };

        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(&self.values)
            .context("Failed to serialize persisted state")?;

        // The target is only ever replaced by a complete file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write state to {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move state into place at {:?}", self.path))?;

        debug!(path = %self.path.display(), "Flushed persisted state");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let previous = self.values.insert(key.to_string(), value);
        if let Err(e) = self.flush() {
            // Memory must not get ahead of the file
            match previous {
                Some(old) => self.values.insert(key.to_string(), old),
                None => self.values.remove(key),
            };
            return Err(e).with_context(|| format!("Failed to persist key '{}'", key));
        }
        Ok(())
    }
}

/// In-memory store, counts writes per key
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
    writes: HashMap<String, usize>,
    failing: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Every later `set` fails and leaves the values untouched
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Number of `set` calls made for `key`
    pub fn writes(&self, key: &str) -> usize {
        self.writes.get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if self.failing {
            anyhow::bail!("Write of '{}' refused", key);
        }
        self.values.insert(key.to_string(), value);
        *self.writes.entry(key.to_string()).or_default() += 1;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
