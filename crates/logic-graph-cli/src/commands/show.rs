//! `lg show`: print a circuit's blocks, wiring and current outputs.

use std::path::Path;

use anyhow::Result;
use logic_graph_sim::{Input, Simulator};

use super::{index_of, open};
use crate::config::Config;

/// Execute the `lg show` command.
pub fn execute(config: &Config, file: &Path, json: bool) -> Result<()> {
    let mut sim = open(config, file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sim.to_description()?)?);
        return Ok(());
    }

    println!("📊 {}", file.display());
    println!("{:─<50}", "");
    for line in block_lines(&mut sim)? {
        println!("{line}");
    }

    let circuit = sim.circuit();
    println!();
    println!("Blocks:              {}", circuit.len());
    println!("Wires:               {}", circuit.wires().len());
    println!(
        "Combinational depth: {}",
        circuit
            .combinational_depth()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "(cyclic)".to_string())
    );

    let leds = sim.leds();
    if !leds.is_empty() {
        println!();
        println!("LEDs:");
        for (id, lit) in leds {
            let label = sim
                .circuit()
                .get(id)?
                .label()
                .map(|l| format!(" {l}"))
                .unwrap_or_default();
            println!(
                "  [{}]{} {}",
                index_of(&sim, id).unwrap_or_default(),
                label,
                if lit { "●" } else { "○" }
            );
        }
    }

    Ok(())
}

/// One line per block: index, kind, label, inputs and outputs.
fn block_lines(sim: &mut Simulator) -> Result<Vec<String>> {
    let ids = sim.circuit().ids();
    let outputs = ids
        .iter()
        .map(|id| sim.output(*id))
        .collect::<Result<Vec<_>, _>>()?;
    let sim: &Simulator = sim;

    let mut lines = Vec::new();
    for (index, (id, outputs)) in ids.into_iter().zip(outputs).enumerate() {
        let block = sim.circuit().get(id)?;

        let inputs: Vec<String> = block
            .inputs()
            .iter()
            .map(|input| match input {
                Input::Literal(value) => u8::from(*value).to_string(),
                Input::Wire(driver) => format!(
                    "[{}]:{}",
                    index_of(sim, driver.block).unwrap_or_default(),
                    driver.pin
                ),
            })
            .collect();
        let outputs: Vec<String> = outputs.iter().map(|v| u8::from(*v).to_string()).collect();

        lines.push(format!(
            "[{index:>3}] {:<6} {:<10} in ({}) out ({})",
            block.kind().to_string(),
            block.label().unwrap_or(""),
            inputs.join(", "),
            outputs.join(", ")
        ));
    }
    Ok(lines)
}
