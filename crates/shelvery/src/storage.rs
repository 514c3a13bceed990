use log::warn;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;

/// Project-scoped key-value persistence, the shape the host's extension
/// storage exposes: get a JSON value by key, replace it wholesale.
pub trait StateStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn update(&mut self, key: &str, value: Value) -> Result<()>;
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn update(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON file per key inside a state directory, surviving restarts
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.file_for(key);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring unreadable state file {}: {}", path.display(), err);
                None
            }
        }
    }

    fn update(&mut self, key: &str, value: Value) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let text = serde_json::to_string_pretty(&value)?;
        fs::write(self.file_for(key), text)?;
        Ok(())
    }
}
