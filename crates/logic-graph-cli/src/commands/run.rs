//! `lg run` and `lg step`: advance a circuit through time.
//!
//! `run` plays the host role: a `tokio` interval fires at the frame rate and
//! each frame hands the real elapsed time to [`Simulator::update`]. `step`
//! skips the clock and takes discrete ticks directly.

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Result};
use logic_graph_sim::Simulator;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use super::{index_of, open, save};
use crate::config::Config;

/// Options for `lg run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub speed: f64,
    pub seconds: f64,
    pub frame_rate: f64,
    /// Print LED states after every frame that ticked.
    pub trace: bool,
    /// Write the final state back to the file.
    pub save: bool,
}

/// Execute the `lg run` command.
pub async fn execute(config: &Config, file: &Path, options: RunOptions) -> Result<()> {
    ensure!(
        options.frame_rate.is_finite() && options.frame_rate > 0.0,
        "frame rate must be > 0, got {}",
        options.frame_rate
    );
    ensure!(
        options.seconds.is_finite() && options.seconds >= 0.0,
        "duration must be >= 0 seconds, got {}",
        options.seconds
    );

    let mut sim = open(config, file)?;
    sim.set_speed(options.speed)?;
    sim.play();

    let frame = Duration::from_secs_f64(1.0 / options.frame_rate);
    let budget = Duration::from_secs_f64(options.seconds);
    info!(
        speed = options.speed,
        frame_rate = options.frame_rate,
        budget_ms = budget.as_millis() as u64,
        "run_start"
    );

    let mut interval = tokio::time::interval(frame);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let started = Instant::now();
    let mut last = started;
    let mut delivered = Duration::ZERO;
    let mut interrupted = false;
    while delivered < budget {
        tokio::select! {
            now = interval.tick() => {
                // The final frame is cut short so exactly `budget` reaches the clock.
                let elapsed = now.duration_since(last).min(budget - delivered);
                delivered += elapsed;
                last = now;
                let report = sim.update(elapsed)?;
                if options.trace && report.ticks > 0 {
                    println!("tick {:>6}  {}", sim.tick_count(), led_strip(&sim));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                break;
            }
        }
    }
    // Consume the time the last frame added.
    let report = sim.update(Duration::ZERO)?;
    if options.trace && report.ticks > 0 {
        println!("tick {:>6}  {}", sim.tick_count(), led_strip(&sim));
    }

    info!(
        ticks = sim.tick_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        interrupted,
        "run_complete"
    );

    if options.save {
        save(&sim, file)?;
    }
    print_summary(&sim);
    Ok(())
}

/// Execute the `lg step` command.
pub fn step(config: &Config, file: &Path, count: usize, write_back: bool) -> Result<()> {
    let mut sim = open(config, file)?;
    for _ in 0..count {
        let report = sim.tick()?;
        println!(
            "tick {:>6}  changed {:>3}  {}",
            report.tick + 1,
            report.changed,
            led_strip(&sim)
        );
    }

    if write_back {
        save(&sim, file)?;
    }
    print_summary(&sim);
    Ok(())
}

/// LED states as `[index]●` / `[index]○`.
fn led_strip(sim: &Simulator) -> String {
    sim.leds()
        .into_iter()
        .map(|(id, lit)| {
            format!(
                "[{}]{}",
                index_of(sim, id).unwrap_or_default(),
                if lit { "●" } else { "○" }
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_summary(sim: &Simulator) {
    println!("Ticks: {}", sim.tick_count());
    let leds = led_strip(sim);
    if !leds.is_empty() {
        println!("LEDs:  {leds}");
    }
}
