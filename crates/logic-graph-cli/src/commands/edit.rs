//! Circuit editing commands: `add`, `connect`, `disconnect`, `delete`,
//! `toggle`.
//!
//! Every command loads the file, applies one change through the simulator
//! and writes the file back. A rejected connection leaves the file as it
//! was.

use std::path::Path;

use anyhow::Result;
use logic_graph_sim::{BlockKind, ConnectOutcome, PinRef};
use tracing::info;

use super::{block_at, open, save};
use crate::config::Config;

/// Execute `lg add`. Returns the new block's index.
pub fn add(config: &Config, file: &Path, kind: BlockKind, label: Option<String>) -> Result<usize> {
    let mut sim = open(config, file)?;
    match label {
        Some(label) => sim.add_labeled_block(kind, label)?,
        None => sim.add_block(kind)?,
    };
    save(&sim, file)?;

    let index = sim.circuit().len() - 1;
    println!("✅ Added {kind} at index {index}");
    Ok(index)
}

/// Execute `lg connect`.
pub fn connect(
    config: &Config,
    file: &Path,
    from: (usize, usize),
    to: (usize, usize),
) -> Result<ConnectOutcome> {
    let mut sim = open(config, file)?;
    let driver = PinRef::new(block_at(&sim, from.0)?, from.1);
    let target = block_at(&sim, to.0)?;

    let outcome = sim.try_connect(driver, target, to.1)?;
    match outcome {
        ConnectOutcome::Connected => {
            save(&sim, file)?;
            info!(from = from.0, pin = from.1, to = to.0, slot = to.1, "connect_saved");
            println!("✅ Connected [{}]:{} -> [{}]:{}", from.0, from.1, to.0, to.1);
        }
        ConnectOutcome::LoopRejected => {
            eprintln!(
                "❌ Rejected [{}]:{} -> [{}]:{}: it would close a combinational loop",
                from.0, from.1, to.0, to.1
            );
        }
    }
    Ok(outcome)
}

/// Execute `lg disconnect`.
pub fn disconnect(config: &Config, file: &Path, target: (usize, usize)) -> Result<()> {
    let mut sim = open(config, file)?;
    let id = block_at(&sim, target.0)?;
    let previous = sim.disconnect(id, target.1)?;
    save(&sim, file)?;

    match previous.wire() {
        Some(_) => println!("✅ Disconnected [{}]:{}", target.0, target.1),
        None => println!("[{}]:{} was not wired; tied low", target.0, target.1),
    }
    Ok(())
}

/// Execute `lg delete`.
pub fn delete(config: &Config, file: &Path, index: usize) -> Result<()> {
    let mut sim = open(config, file)?;
    let removed = sim.delete_block(block_at(&sim, index)?)?;
    save(&sim, file)?;

    println!(
        "✅ Deleted {} at index {} (later blocks shift down by one)",
        removed.kind(),
        index
    );
    Ok(())
}

/// Execute `lg toggle`: flip a TOGGLE, or set it with `value`.
pub fn toggle(config: &Config, file: &Path, index: usize, value: Option<bool>) -> Result<()> {
    let mut sim = open(config, file)?;
    let id = block_at(&sim, index)?;
    let on = match value {
        Some(on) => {
            sim.set_toggle(id, on)?;
            on
        }
        None => sim.flip_toggle(id)?,
    };
    save(&sim, file)?;

    println!("✅ Toggle [{}] is now {}", index, if on { "on" } else { "off" });
    Ok(())
}
