//! A ring oscillator built from inverters.
//!
//! Three NOT gates in a ring form a combinational loop, which the simulator
//! refuses to wire. Closing the ring through a DELAY instead gives a
//! circuit that oscillates once per tick.
//!
//! Run with:
//! ```bash
//! cargo run --example ring_oscillator -p logic-graph-sim
//! ```

use std::time::Duration;

use logic_graph_sim::{BlockKind, ConnectOutcome, PinRef, SimConfig, SimResult, Simulator};

fn main() -> SimResult<()> {
    let mut sim = Simulator::with_config(SimConfig::slow())?;

    let stages: Vec<_> = (0..3)
        .map(|i| sim.add_labeled_block(BlockKind::Not, format!("inv{i}")))
        .collect::<SimResult<_>>()?;

    sim.try_connect(PinRef::new(stages[0], 0), stages[1], 0)?;
    sim.try_connect(PinRef::new(stages[1], 0), stages[2], 0)?;

    let outcome = sim.try_connect(PinRef::new(stages[2], 0), stages[0], 0)?;
    assert_eq!(outcome, ConnectOutcome::LoopRejected);
    println!("closing the inverter ring directly: {outcome:?}");

    let delay = sim.add_labeled_block(BlockKind::Delay, "latch")?;
    sim.try_connect(PinRef::new(stages[2], 0), delay, 0)?;
    let outcome = sim.try_connect(PinRef::new(delay, 0), stages[0], 0)?;
    println!("closing it through a DELAY: {outcome:?}");

    let led = sim.add_labeled_block(BlockKind::Led, "out")?;
    sim.try_connect(PinRef::new(delay, 0), led, 0)?;

    // Two simulated seconds at 60 fps and 1 tick/s.
    let frame = Duration::from_secs_f64(1.0 / 60.0);
    for _ in 0..120 {
        let report = sim.update(frame)?;
        if report.ticks > 0 {
            println!(
                "tick {:>2}: led {}",
                sim.tick_count(),
                if sim.led_lit(led)? { "on" } else { "off" }
            );
        }
    }

    for _ in 0..4 {
        sim.tick()?;
        println!(
            "tick {:>2}: led {}",
            sim.tick_count(),
            if sim.led_lit(led)? { "on" } else { "off" }
        );
    }

    let description = sim.to_description()?;
    println!("\n{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}
