use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::Result;
use crate::history::TraceStore;
use crate::trace::Trace;

/// A serializable copy of the trace history and its pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// Version of the crate that wrote the snapshot
    pub version: String,
    pub traces: Vec<Trace>,
    pub index: isize,
}

impl HistorySnapshot {
    pub fn new(store: &TraceStore) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            traces: store.traces().to_vec(),
            index: store.index(),
        }
    }

    /// Rebuild a store, validating the pointer against the traces
    pub fn into_store(self) -> Result<TraceStore> {
        if self.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "History snapshot version {} differs from current version {}",
                self.version,
                env!("CARGO_PKG_VERSION")
            );
        }
        TraceStore::from_parts(self.traces, self.index)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(dir) = path.as_ref().parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
