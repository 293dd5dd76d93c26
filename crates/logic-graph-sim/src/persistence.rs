//! Saving and loading circuits as JSON.
//!
//! Plain description files can live anywhere ([`load_description`],
//! [`save_description`]). A [`CircuitStore`] additionally keeps a working
//! circuit with metadata, plus timestamped snapshots, under a project root:
//!
//! ```text
//! .logic/
//! ├── circuit.json        # Current circuit (metadata + description)
//! └── snapshots/
//!     ├── 1703800000000.json
//!     └── 1703800100000.json
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use logic_graph_core::{BlockKind, CircuitDescription};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::simulator::Simulator;

/// Name of the store folder under a project root.
pub const STORE_DIR: &str = ".logic";

const CIRCUIT_FILE: &str = "circuit.json";
const SNAPSHOTS_DIR: &str = "snapshots";

/// Read a description file.
pub fn load_description(path: impl AsRef<Path>) -> SimResult<CircuitDescription> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let description: CircuitDescription = serde_json::from_str(&json)?;
    debug!(path = %path.display(), blocks = description.blocks.len(), "description_loaded");
    Ok(description)
}

/// Write a description file, pretty-printed.
pub fn save_description(path: impl AsRef<Path>, description: &CircuitDescription) -> SimResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(description)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), blocks = description.blocks.len(), "description_saved");
    Ok(())
}

/// Metadata stored next to a circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitMetadata {
    /// Version of the persistence format.
    pub version: u32,

    pub saved_at: SystemTime,

    /// Simulator tick count at save time.
    pub tick_count: u64,

    pub block_count: usize,

    pub wire_count: usize,

    /// Number of sequential (DELAY) blocks.
    pub sequential_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A stored circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCircuit {
    pub metadata: CircuitMetadata,
    pub description: CircuitDescription,
}

impl PersistedCircuit {
    fn capture(sim: &Simulator, label: Option<String>) -> SimResult<Self> {
        let circuit = sim.circuit();
        let metadata = CircuitMetadata {
            version: 1,
            saved_at: SystemTime::now(),
            tick_count: sim.tick_count(),
            block_count: circuit.len(),
            wire_count: circuit.wires().len(),
            sequential_count: circuit.blocks_of_kind(BlockKind::Delay).count(),
            label,
        };
        Ok(Self {
            metadata,
            description: sim.to_description()?,
        })
    }
}

/// Manages circuits within the `.logic/` folder of a project root.
#[derive(Debug, Clone)]
pub struct CircuitStore {
    root: PathBuf,
    store_dir: PathBuf,
}

impl CircuitStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let store_dir = root.join(STORE_DIR);
        Self { root, store_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Path of the current circuit file.
    pub fn circuit_path(&self) -> PathBuf {
        self.store_dir.join(CIRCUIT_FILE)
    }

    /// Whether a current circuit has been saved.
    pub fn exists(&self) -> bool {
        self.circuit_path().exists()
    }

    pub fn init(&self) -> SimResult<()> {
        let snapshots_dir = self.store_dir.join(SNAPSHOTS_DIR);
        if !snapshots_dir.exists() {
            std::fs::create_dir_all(&snapshots_dir)?;
            debug!(path = %self.store_dir.display(), "store_created");
        }
        Ok(())
    }

    /// Save the simulator's circuit as the current circuit.
    pub fn save(&self, sim: &Simulator, label: Option<String>) -> SimResult<PathBuf> {
        self.init()?;
        let persisted = PersistedCircuit::capture(sim, label)?;
        let path = self.circuit_path();
        std::fs::write(&path, serde_json::to_string_pretty(&persisted)?)?;

        info!(
            path = %path.display(),
            tick = persisted.metadata.tick_count,
            blocks = persisted.metadata.block_count,
            "circuit_saved"
        );
        Ok(path)
    }

    /// Load the current circuit, if any.
    pub fn load(&self) -> SimResult<Option<PersistedCircuit>> {
        let path = self.circuit_path();
        if !path.exists() {
            return Ok(None);
        }
        let persisted = read_persisted(&path)?;
        info!(
            path = %path.display(),
            tick = persisted.metadata.tick_count,
            blocks = persisted.metadata.block_count,
            "circuit_loaded"
        );
        Ok(Some(persisted))
    }

    /// Write a timestamped copy of the simulator's circuit.
    pub fn snapshot(&self, sim: &Simulator, label: Option<String>) -> SimResult<PathBuf> {
        self.init()?;
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let persisted = PersistedCircuit::capture(sim, label)?;
        let path = self
            .store_dir
            .join(SNAPSHOTS_DIR)
            .join(format!("{}.json", timestamp));
        std::fs::write(&path, serde_json::to_string_pretty(&persisted)?)?;

        info!(path = %path.display(), tick = sim.tick_count(), "circuit_snapshot");
        Ok(path)
    }

    /// Available snapshots, newest first.
    pub fn list_snapshots(&self) -> SimResult<Vec<SnapshotInfo>> {
        let snapshots_dir = self.store_dir.join(SNAPSHOTS_DIR);
        if !snapshots_dir.exists() {
            return Ok(vec![]);
        }

        let mut snapshots: Vec<SnapshotInfo> = std::fs::read_dir(&snapshots_dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                if path.extension()? != "json" {
                    return None;
                }
                let timestamp: u64 = path.file_stem()?.to_str()?.parse().ok()?;
                Some(SnapshotInfo { path, timestamp })
            })
            .collect();

        snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(snapshots)
    }

    pub fn load_snapshot(&self, path: &Path) -> SimResult<PersistedCircuit> {
        let persisted = read_persisted(path)?;
        info!(path = %path.display(), tick = persisted.metadata.tick_count, "snapshot_loaded");
        Ok(persisted)
    }

    pub fn load_latest_snapshot(&self) -> SimResult<Option<PersistedCircuit>> {
        match self.list_snapshots()?.first() {
            Some(latest) => Ok(Some(self.load_snapshot(&latest.path)?)),
            None => Ok(None),
        }
    }

    /// Remove the store folder and everything in it.
    pub fn clear(&self) -> SimResult<()> {
        if self.store_dir.exists() {
            std::fs::remove_dir_all(&self.store_dir)?;
            info!(path = %self.store_dir.display(), "store_cleared");
        }
        Ok(())
    }
}

fn read_persisted(path: &Path) -> SimResult<PersistedCircuit> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// A snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    pub path: PathBuf,

    /// Unix time in milliseconds.
    pub timestamp: u64,
}

impl SnapshotInfo {
    pub fn created_at(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + std::time::Duration::from_millis(self.timestamp)
    }
}

impl Simulator {
    /// Save to a store as the current circuit.
    pub fn save_to(&self, store: &CircuitStore, label: Option<String>) -> SimResult<PathBuf> {
        store.save(self, label)
    }

    /// Rebuild a simulator from a store's current circuit. The tick counter
    /// resumes from the saved value.
    pub fn load_from(store: &CircuitStore, config: SimConfig) -> SimResult<Option<Self>> {
        let Some(persisted) = store.load()? else {
            return Ok(None);
        };
        let mut sim = Simulator::from_description(&persisted.description, config)?;
        sim.resume_tick_count(persisted.metadata.tick_count);
        Ok(Some(sim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logic_graph_core::PinRef;
    use tempfile::TempDir;

    fn toggled_led() -> Simulator {
        let mut sim = Simulator::new();
        let toggle = sim.add_block(BlockKind::Toggle).unwrap();
        let delay = sim.add_block(BlockKind::Delay).unwrap();
        let led = sim.add_block(BlockKind::Led).unwrap();
        sim.try_connect(PinRef::new(toggle, 0), delay, 0).unwrap();
        sim.try_connect(PinRef::new(delay, 0), led, 0).unwrap();
        sim.set_toggle(toggle, true).unwrap();
        sim.tick().unwrap();
        sim
    }

    #[test]
    fn test_description_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("circuit.json");
        let sim = toggled_led();

        save_description(&path, &sim.to_description().unwrap()).unwrap();
        let loaded = load_description(&path).unwrap();
        assert_eq!(loaded, sim.to_description().unwrap());
    }

    #[test]
    fn test_load_description_reports_bad_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_description(&path),
            Err(crate::SimError::Serialization(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = CircuitStore::new(temp_dir.path());
        assert!(!store.exists());
        assert!(store.load().unwrap().is_none());

        let sim = toggled_led();
        store.save(&sim, Some("latched".to_string())).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.metadata.label.as_deref(), Some("latched"));
        assert_eq!(loaded.metadata.block_count, 3);
        assert_eq!(loaded.metadata.wire_count, 2);
        assert_eq!(loaded.metadata.sequential_count, 1);
        assert_eq!(loaded.description, sim.to_description().unwrap());
    }

    #[test]
    fn test_load_from_resumes_tick_count() {
        let temp_dir = TempDir::new().unwrap();
        let store = CircuitStore::new(temp_dir.path());
        let sim = toggled_led();
        sim.save_to(&store, None).unwrap();

        let restored = Simulator::load_from(&store, SimConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(restored.tick_count(), 1);
        assert_eq!(restored.leds(), sim.leds());
    }

    #[test]
    fn test_snapshots_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = CircuitStore::new(temp_dir.path());
        let mut sim = toggled_led();

        store.snapshot(&sim, Some("first".to_string())).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        sim.tick().unwrap();
        store.snapshot(&sim, Some("second".to_string())).unwrap();

        let snapshots = store.list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].created_at() >= snapshots[1].created_at());

        let latest = store.load_latest_snapshot().unwrap().unwrap();
        assert_eq!(latest.metadata.label.as_deref(), Some("second"));
        assert_eq!(latest.metadata.tick_count, 2);
    }

    #[test]
    fn test_clear_removes_everything() {
        let temp_dir = TempDir::new().unwrap();
        let store = CircuitStore::new(temp_dir.path());
        store.save(&toggled_led(), None).unwrap();
        store.clear().unwrap();
        assert!(!store.store_dir().exists());
        assert!(store.list_snapshots().unwrap().is_empty());
    }
}
