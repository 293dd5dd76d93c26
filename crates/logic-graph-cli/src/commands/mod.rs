//! CLI command implementations.

pub mod config;
pub mod edit;
pub mod init;
pub mod run;
pub mod show;
pub mod snapshot;

use std::path::Path;

use anyhow::{bail, Context, Result};
use logic_graph_sim::{load_description, save_description, BlockId, Simulator};

use crate::config::Config;

/// Load a circuit file into a simulator configured from `config`.
pub fn open(config: &Config, file: &Path) -> Result<Simulator> {
    let description = load_description(file)
        .with_context(|| format!("Failed to read circuit from {}", file.display()))?;
    let sim = Simulator::from_description(&description, config.sim_config()?)
        .with_context(|| format!("Invalid circuit in {}", file.display()))?;
    Ok(sim)
}

/// Write the simulator's circuit back to `file`.
pub fn save(sim: &Simulator, file: &Path) -> Result<()> {
    let description = sim.to_description()?;
    save_description(file, &description)
        .with_context(|| format!("Failed to write circuit to {}", file.display()))
}

/// Handle of the block at list position `index`.
pub fn block_at(sim: &Simulator, index: usize) -> Result<BlockId> {
    let ids = sim.circuit().ids();
    match ids.get(index) {
        Some(id) => Ok(*id),
        None => bail!(
            "No block at index {} (circuit has {} blocks)",
            index,
            ids.len()
        ),
    }
}

/// List position of a block handle.
pub fn index_of(sim: &Simulator, id: BlockId) -> Option<usize> {
    sim.circuit().ids().iter().position(|other| *other == id)
}

/// Parse `<index>:<n>`; a bare `<index>` means `n = 0`.
pub fn parse_endpoint(text: &str) -> Result<(usize, usize)> {
    let (index, n) = match text.split_once(':') {
        Some((index, n)) => (index, n),
        None => (text, "0"),
    };
    let index = index
        .trim()
        .parse()
        .with_context(|| format!("Invalid block index in '{text}'"))?;
    let n = n
        .trim()
        .parse()
        .with_context(|| format!("Invalid pin/slot in '{text}'"))?;
    Ok((index, n))
}
