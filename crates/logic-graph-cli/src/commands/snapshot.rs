//! `lg snapshot` and `lg snapshots`: keep timestamped copies of circuits in
//! the configured store.

use std::path::Path;

use anyhow::{Context, Result};
use logic_graph_sim::{save_description, CircuitStore};

use super::open;
use crate::config::Config;

/// Execute `lg snapshot`.
pub fn create(config: &Config, file: &Path, label: Option<String>) -> Result<()> {
    let sim = open(config, file)?;
    let store = CircuitStore::new(&config.store_dir);
    let path = store.snapshot(&sim, label)?;
    println!("✅ Snapshot written to {}", path.display());
    Ok(())
}

/// Execute `lg snapshots`: list snapshots, newest first.
pub fn list(config: &Config) -> Result<()> {
    let store = CircuitStore::new(&config.store_dir);
    let snapshots = store.list_snapshots()?;
    if snapshots.is_empty() {
        println!("No snapshots in {}", store.store_dir().display());
        return Ok(());
    }

    for info in snapshots {
        let persisted = store.load_snapshot(&info.path)?;
        println!(
            "{}  {:>4} blocks  tick {:>6}  {}",
            info.timestamp,
            persisted.metadata.block_count,
            persisted.metadata.tick_count,
            persisted.metadata.label.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Execute `lg restore`: write the newest snapshot out as a circuit file.
pub fn restore(config: &Config, file: &Path) -> Result<()> {
    let store = CircuitStore::new(&config.store_dir);
    let persisted = store
        .load_latest_snapshot()?
        .with_context(|| format!("No snapshots in {}", store.store_dir().display()))?;
    save_description(file, &persisted.description)?;
    println!(
        "✅ Restored snapshot ({} blocks) to {}",
        persisted.metadata.block_count,
        file.display()
    );
    Ok(())
}
