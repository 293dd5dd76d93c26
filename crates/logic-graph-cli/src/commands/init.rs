//! `lg init`: write a starter circuit.

use std::path::Path;

use anyhow::{bail, Result};
use clap::ValueEnum;
use logic_graph_sim::{BlockKind, PinRef, SimResult, Simulator};
use tracing::info;

use super::save;

/// Starter circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Template {
    /// A DELAY fed by its own inverse, driving an LED.
    Blinker,
    /// Two toggles, XOR sum and AND carry, each on an LED.
    HalfAdder,
    /// A set toggle ORed with a DELAY's own output: once lit, stays lit.
    Latch,
    /// No blocks.
    Empty,
}

impl Template {
    pub fn build(self) -> SimResult<Simulator> {
        let mut sim = Simulator::new();
        match self {
            Template::Blinker => {
                let delay = sim.add_labeled_block(BlockKind::Delay, "clock")?;
                let not = sim.add_block(BlockKind::Not)?;
                let led = sim.add_labeled_block(BlockKind::Led, "out")?;
                sim.try_connect(PinRef::new(delay, 0), not, 0)?;
                sim.try_connect(PinRef::new(not, 0), delay, 0)?;
                sim.try_connect(PinRef::new(delay, 0), led, 0)?;
            }
            Template::HalfAdder => {
                let a = sim.add_labeled_block(BlockKind::Toggle, "a")?;
                let b = sim.add_labeled_block(BlockKind::Toggle, "b")?;
                let xor = sim.add_block(BlockKind::Xor)?;
                let and = sim.add_block(BlockKind::And)?;
                let sum = sim.add_labeled_block(BlockKind::Led, "sum")?;
                let carry = sim.add_labeled_block(BlockKind::Led, "carry")?;
                sim.try_connect(PinRef::new(a, 0), xor, 0)?;
                sim.try_connect(PinRef::new(b, 0), xor, 1)?;
                sim.try_connect(PinRef::new(a, 0), and, 0)?;
                sim.try_connect(PinRef::new(b, 0), and, 1)?;
                sim.try_connect(PinRef::new(xor, 0), sum, 0)?;
                sim.try_connect(PinRef::new(and, 0), carry, 0)?;
            }
            Template::Latch => {
                let set = sim.add_labeled_block(BlockKind::Toggle, "set")?;
                let or = sim.add_block(BlockKind::Or)?;
                let delay = sim.add_labeled_block(BlockKind::Delay, "hold")?;
                let led = sim.add_labeled_block(BlockKind::Led, "out")?;
                sim.try_connect(PinRef::new(set, 0), or, 0)?;
                sim.try_connect(PinRef::new(delay, 0), or, 1)?;
                sim.try_connect(PinRef::new(or, 0), delay, 0)?;
                sim.try_connect(PinRef::new(delay, 0), led, 0)?;
            }
            Template::Empty => {}
        }
        Ok(sim)
    }
}

/// Execute the `lg init` command.
pub fn execute(file: &Path, template: Template, force: bool) -> Result<()> {
    if file.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            file.display()
        );
    }

    let sim = template.build()?;
    save(&sim, file)?;

    info!(path = %file.display(), ?template, blocks = sim.circuit().len(), "circuit_initialized");
    println!(
        "✅ Wrote {:?} circuit with {} blocks to {}",
        template,
        sim.circuit().len(),
        file.display()
    );
    Ok(())
}
