use crate::node::{Node, NodeMap};
use crate::result::CommonResult;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Simple persistent key-value backend used by the `Storage.*` operators and commands
pub trait KeyValueStore {
    /// Read a stored value
    fn get(&self, key: &str) -> Option<Node>;

    /// Store a value, replacing any previous one
    fn set(&self, key: &str, value: Node);
}

/// Volatile store for tests and sessions without persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, Node>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Node> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Node) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The whole file is rewritten on every `set`. Write failures are logged
/// and the in-memory value is kept.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RefCell<NodeMap>,
}

impl JsonFileStore {
    /// Open a store, loading existing entries if the file exists
    pub fn open(path: impl AsRef<Path>) -> CommonResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                NodeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            NodeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened JSON file store");
        Ok(Self {
            path,
            entries: RefCell::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> CommonResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&*self.entries.borrow())?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Node> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Node) {
        self.entries.borrow_mut().insert(key.to_string(), value);
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "Failed to persist storage");
        }
    }
}
