use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::warn;

use crate::error::Result;
use crate::types::TierState;

/// product URL → persisted tier state. BTreeMap keeps the file ordering
/// stable so hand-edits and diffs stay readable.
pub type TierStateMap = BTreeMap<String, TierState>;

/// JSON-file persistence for the per-product tier states. The file is meant
/// to be human-readable and safe to hand-edit for recovery; every save is a
/// whole-file rewrite.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// A missing file is a fresh start. A corrupt file is logged and also
    /// treated as a fresh start rather than blocking the run — the ratchet
    /// re-arms and at worst one duplicate alert fires.
    pub fn load(&self) -> TierStateMap {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return TierStateMap::new(),
            Err(e) => {
                warn!("Cannot read state file {}: {e}", self.path.display());
                return TierStateMap::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "State file {} is not valid JSON ({e}), starting with empty state",
                    self.path.display()
                );
                TierStateMap::new()
            }
        }
    }

    pub fn save(&self, map: &TierStateMap) -> Result<()> {
        let raw = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tier;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nope.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut map = TierStateMap::new();
        map.insert(
            "https://shop.example.com/p/align".to_string(),
            TierState {
                was_in_best: true,
                last_price: Some(45.0),
                last_in_stock: true,
                last_tier: Some(Tier::Best),
                ..TierState::default()
            },
        );
        store.save(&map).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, map);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = StateStore::new(path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_overwrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut map = TierStateMap::new();
        map.insert("https://a".to_string(), TierState::default());
        map.insert("https://b".to_string(), TierState::default());
        store.save(&map).unwrap();

        map.remove("https://b");
        store.save(&map).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("https://a"));
    }
}
