//! The simulator facade: a circuit, its clock and a tick history.
//!
//! `Simulator` is the entry point for hosts. It keeps the circuit's caches
//! consistent across every mutation, so [`Simulator::output`] always answers
//! from a finished recalculation pass.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use logic_graph_core::{
    Block, BlockId, BlockKind, BlockState, Circuit, CircuitDescription, Input, PinRef,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::evaluator::Evaluator;
use crate::transaction::{self, ConnectOutcome};

/// Result of a single discrete step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick number (0-indexed).
    pub tick: u64,

    /// Sequential blocks that were stepped.
    pub sequential: usize,

    /// Sequential blocks whose state changed.
    pub changed: usize,

    /// Duration of the step, excluding the recalculation that follows it.
    pub duration: Duration,
}

impl TickReport {
    pub fn had_changes(&self) -> bool {
        self.changed > 0
    }
}

/// Result of one host frame passed to [`Simulator::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Steps taken this frame.
    pub ticks: usize,

    /// State changes summed over those steps.
    pub changed: usize,
}

impl FrameReport {
    /// A recalculation pass runs exactly when at least one step was taken.
    pub fn recalculated(&self) -> bool {
        self.ticks > 0
    }
}

/// A circuit together with the clock that drives it.
#[derive(Debug, Clone)]
pub struct Simulator {
    circuit: Circuit,
    clock: SimClock,
    config: SimConfig,
    tick_count: u64,
    history: VecDeque<TickReport>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Empty circuit, default configuration.
    pub fn new() -> Self {
        Self {
            circuit: Circuit::new(),
            clock: SimClock::default(),
            config: SimConfig::default(),
            tick_count: 0,
            history: VecDeque::new(),
        }
    }

    /// Empty circuit with a custom configuration.
    pub fn with_config(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let mut clock =
            SimClock::new(config.speed)?.with_max_backlog_factor(config.max_backlog_factor);
        if !config.start_running {
            clock.pause();
        }
        Ok(Self {
            circuit: Circuit::new(),
            clock,
            config,
            tick_count: 0,
            history: VecDeque::new(),
        })
    }

    /// Adopt an existing circuit.
    ///
    /// Fails with [`SimError::CombinationalLoop`] if the circuit contains a
    /// loop that [`try_connect`](Self::try_connect) would have refused.
    pub fn from_circuit(circuit: Circuit, config: SimConfig) -> SimResult<Self> {
        circuit.validate()?;
        let mut sim = Self::with_config(config)?;
        sim.circuit = circuit;

        if let Some(block) = Evaluator::new(&mut sim.circuit).find_loop()? {
            return Err(SimError::CombinationalLoop { block });
        }
        sim.recalculate()?;

        info!(
            blocks = sim.circuit.len(),
            speed = sim.clock.speed(),
            "simulator_loaded"
        );
        Ok(sim)
    }

    pub fn from_description(description: &CircuitDescription, config: SimConfig) -> SimResult<Self> {
        let circuit = Circuit::from_description(description)?;
        Self::from_circuit(circuit, config)
    }

    pub fn to_description(&self) -> SimResult<CircuitDescription> {
        Ok(self.circuit.to_description()?)
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Place a new block with every input tied low.
    pub fn add_block(&mut self, kind: BlockKind) -> SimResult<BlockId> {
        let id = self.circuit.add_block(kind);
        self.settle_new_block(id)
    }

    pub fn add_labeled_block(
        &mut self,
        kind: BlockKind,
        label: impl Into<String>,
    ) -> SimResult<BlockId> {
        let id = self.circuit.insert(Block::new(kind).with_label(label))?;
        self.settle_new_block(id)
    }

    /// Nothing drives a fresh block yet, so only its own output needs
    /// computing.
    fn settle_new_block(&mut self, id: BlockId) -> SimResult<BlockId> {
        Evaluator::new(&mut self.circuit).output(id)?;
        debug!(block = id.0, "block_added");
        Ok(id)
    }

    pub fn try_connect(
        &mut self,
        driver: PinRef,
        target: BlockId,
        slot: usize,
    ) -> SimResult<ConnectOutcome> {
        transaction::try_connect(&mut self.circuit, driver, target, slot)
    }

    pub fn disconnect(&mut self, target: BlockId, slot: usize) -> SimResult<Input> {
        transaction::disconnect(&mut self.circuit, target, slot)
    }

    pub fn set_literal(&mut self, target: BlockId, slot: usize, value: bool) -> SimResult<Input> {
        transaction::set_literal(&mut self.circuit, target, slot, value)
    }

    pub fn delete_block(&mut self, id: BlockId) -> SimResult<Block> {
        transaction::delete_block(&mut self.circuit, id)
    }

    /// Invert a toggle. Returns its new value.
    pub fn flip_toggle(&mut self, id: BlockId) -> SimResult<bool> {
        let on = !self.toggle_block(id)?.state().bit();
        self.set_toggle(id, on)?;
        Ok(on)
    }

    pub fn set_toggle(&mut self, id: BlockId, on: bool) -> SimResult<()> {
        self.toggle_block(id)?;
        *self.circuit.get_mut(id)?.state_mut() = BlockState::Toggle { on };
        self.recalculate()?;
        debug!(block = id.0, on, "toggle_set");
        Ok(())
    }

    fn toggle_block(&self, id: BlockId) -> SimResult<&Block> {
        let block = self.circuit.get(id)?;
        match block.kind() {
            BlockKind::Toggle => Ok(block),
            kind => Err(SimError::NotAToggle { block: id, kind }),
        }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Output vector of a block.
    pub fn output(&mut self, id: BlockId) -> SimResult<Vec<bool>> {
        Evaluator::new(&mut self.circuit).output(id)
    }

    /// Whether an LED is lit as of the last recalculation.
    pub fn led_lit(&self, id: BlockId) -> SimResult<bool> {
        let block = self.circuit.get(id)?;
        match block.kind() {
            BlockKind::Led => Ok(block.state().bit()),
            kind => Err(SimError::NotAnLed { block: id, kind }),
        }
    }

    /// Every LED in handle order.
    pub fn leds(&self) -> Vec<(BlockId, bool)> {
        self.circuit
            .blocks_of_kind(BlockKind::Led)
            .map(|(id, block)| (id, block.state().bit()))
            .collect()
    }

    pub fn recalculate(&mut self) -> SimResult<()> {
        Evaluator::new(&mut self.circuit).recalculate()
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Take one step and recalculate.
    pub fn tick(&mut self) -> SimResult<TickReport> {
        let report = self.step()?;
        self.recalculate()?;
        Ok(report)
    }

    /// Run `n` single ticks.
    pub fn run_ticks(&mut self, n: usize) -> SimResult<Vec<TickReport>> {
        let mut reports = Vec::with_capacity(n);
        for _ in 0..n {
            reports.push(self.tick()?);
        }
        Ok(reports)
    }

    /// Advance by one host frame.
    ///
    /// Every step due this frame reads inputs from the recalculation that
    /// preceded the frame; one recalculation follows the last step.
    pub fn update(&mut self, elapsed: Duration) -> SimResult<FrameReport> {
        let ticks = self.clock.update(elapsed);
        if ticks == 0 {
            return Ok(FrameReport::default());
        }

        let mut changed = 0;
        for _ in 0..ticks {
            changed += self.step()?.changed;
        }
        self.recalculate()?;

        debug!(ticks, changed, tick = self.tick_count, "frame_complete");
        Ok(FrameReport { ticks, changed })
    }

    /// Tick every sequential block once. All inputs are read before any
    /// state is written.
    fn step(&mut self) -> SimResult<TickReport> {
        let started = Instant::now();

        let sequential: Vec<BlockId> = self
            .circuit
            .iter()
            .filter(|(_, block)| block.kind().is_sequential())
            .map(|(id, _)| id)
            .collect();

        let mut evaluator = Evaluator::new(&mut self.circuit);
        let mut updates = Vec::with_capacity(sequential.len());
        for id in &sequential {
            updates.push((*id, evaluator.resolved_inputs(*id)?));
        }

        let mut changed = 0;
        for (id, inputs) in updates {
            let block = self.circuit.get_mut(id)?;
            let kind = block.kind();
            if kind.tick(&inputs, block.state_mut()) {
                changed += 1;
            }
        }

        let report = TickReport {
            tick: self.tick_count,
            sequential: sequential.len(),
            changed,
            duration: started.elapsed(),
        };

        self.history.push_back(report.clone());
        while self.history.len() > self.config.history_window {
            self.history.pop_front();
        }
        self.tick_count += 1;

        debug!(
            tick = report.tick,
            changed = report.changed,
            duration_us = report.duration.as_micros() as u64,
            "simulator_tick_complete"
        );
        Ok(report)
    }

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn set_speed(&mut self, speed: f64) -> SimResult<()> {
        self.clock.set_speed(speed)?;
        self.config.speed = speed;
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Most recent tick reports, oldest first.
    pub fn history(&self) -> &VecDeque<TickReport> {
        &self.history
    }

    pub(crate) fn resume_tick_count(&mut self, tick_count: u64) {
        self.tick_count = tick_count;
    }

    /// Discard the clock backlog, tick counter and history. Block state is
    /// left alone.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
        self.tick_count = 0;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logic_graph_core::{BlockRecord, RecordInput, DESCRIPTION_VERSION};

    /// DELAY fed by its own inverse, observed by an LED.
    fn blinker() -> (Simulator, BlockId, BlockId) {
        let mut sim = Simulator::new();
        let delay = sim.add_block(BlockKind::Delay).unwrap();
        let not = sim.add_block(BlockKind::Not).unwrap();
        let led = sim.add_block(BlockKind::Led).unwrap();
        assert!(sim.try_connect(PinRef::new(delay, 0), not, 0).unwrap().is_connected());
        assert!(sim.try_connect(PinRef::new(not, 0), delay, 0).unwrap().is_connected());
        assert!(sim.try_connect(PinRef::new(delay, 0), led, 0).unwrap().is_connected());
        (sim, delay, led)
    }

    #[test]
    fn test_blinker_alternates_per_tick() {
        let (mut sim, _, led) = blinker();
        assert!(!sim.led_lit(led).unwrap());

        let mut seen = Vec::new();
        for _ in 0..4 {
            let report = sim.tick().unwrap();
            assert!(report.had_changes());
            seen.push(sim.led_lit(led).unwrap());
        }
        assert_eq!(seen, vec![true, false, true, false]);
        assert_eq!(sim.tick_count(), 4);
    }

    #[test]
    fn test_tick_reads_before_writing() {
        // toggle -> d1 -> d2: a two-stage shift register.
        let mut sim = Simulator::new();
        let toggle = sim.add_block(BlockKind::Toggle).unwrap();
        let d1 = sim.add_block(BlockKind::Delay).unwrap();
        let d2 = sim.add_block(BlockKind::Delay).unwrap();
        sim.try_connect(PinRef::new(toggle, 0), d1, 0).unwrap();
        sim.try_connect(PinRef::new(d1, 0), d2, 0).unwrap();
        sim.set_toggle(toggle, true).unwrap();

        sim.tick().unwrap();
        assert_eq!(sim.output(d1).unwrap(), vec![true]);
        assert_eq!(sim.output(d2).unwrap(), vec![false]);

        sim.tick().unwrap();
        assert_eq!(sim.output(d2).unwrap(), vec![true]);
    }

    #[test]
    fn test_update_waits_for_accumulated_time() {
        let (mut sim, _, _) = blinker();
        let frame = sim.update(Duration::from_millis(350)).unwrap();
        assert_eq!(frame.ticks, 0);
        assert!(!frame.recalculated());

        let frame = sim.update(Duration::ZERO).unwrap();
        assert_eq!(frame.ticks, 3);
        assert!(frame.recalculated());
        assert_eq!(sim.tick_count(), 3);
    }

    #[test]
    fn test_frame_steps_share_prior_inputs() {
        let (mut sim, delay, led) = blinker();
        sim.update(Duration::from_millis(250)).unwrap();
        let frame = sim.update(Duration::ZERO).unwrap();
        assert_eq!(frame.ticks, 2);
        // Both steps latched NOT(false) from the pre-frame pass; only the
        // first one changed anything.
        assert_eq!(frame.changed, 1);
        assert_eq!(sim.output(delay).unwrap(), vec![true]);
        assert!(sim.led_lit(led).unwrap());
    }

    #[test]
    fn test_paused_simulator_does_not_tick() {
        let (mut sim, _, _) = blinker();
        sim.pause();
        assert!(!sim.is_running());
        sim.update(Duration::from_secs(3)).unwrap();
        assert_eq!(sim.update(Duration::ZERO).unwrap().ticks, 0);
        sim.play();
        assert_eq!(sim.update(Duration::ZERO).unwrap().ticks, 0);
    }

    #[test]
    fn test_flip_toggle_updates_led() {
        let mut sim = Simulator::new();
        let toggle = sim.add_labeled_block(BlockKind::Toggle, "switch").unwrap();
        let led = sim.add_block(BlockKind::Led).unwrap();
        sim.try_connect(PinRef::new(toggle, 0), led, 0).unwrap();

        assert!(sim.flip_toggle(toggle).unwrap());
        assert!(sim.led_lit(led).unwrap());
        assert_eq!(sim.leds(), vec![(led, true)]);
        assert!(!sim.flip_toggle(toggle).unwrap());
        assert!(!sim.led_lit(led).unwrap());
        assert_eq!(sim.circuit().get(toggle).unwrap().label(), Some("switch"));
    }

    #[test]
    fn test_kind_checks() {
        let mut sim = Simulator::new();
        let not = sim.add_block(BlockKind::Not).unwrap();
        assert!(matches!(sim.flip_toggle(not), Err(SimError::NotAToggle { .. })));
        assert!(matches!(sim.led_lit(not), Err(SimError::NotAnLed { .. })));
    }

    #[test]
    fn test_from_description_rejects_combinational_loop() {
        let description = CircuitDescription {
            version: DESCRIPTION_VERSION,
            blocks: vec![BlockRecord::new(BlockKind::And)
                .with_inputs(vec![RecordInput::wire(0), RecordInput::Literal(true)])],
        };
        assert!(matches!(
            Simulator::from_description(&description, SimConfig::default()),
            Err(SimError::CombinationalLoop { .. })
        ));
    }

    #[test]
    fn test_description_round_trip_keeps_behaviour() {
        let (mut sim, _, _) = blinker();
        sim.tick().unwrap();
        let description = sim.to_description().unwrap();

        let mut restored = Simulator::from_description(&description, SimConfig::default()).unwrap();
        assert_eq!(restored.leds(), sim.leds());
        sim.tick().unwrap();
        restored.tick().unwrap();
        assert_eq!(restored.leds(), sim.leds());
    }

    #[test]
    fn test_history_is_bounded() {
        let config = SimConfig {
            history_window: 2,
            ..Default::default()
        };
        let mut sim = Simulator::with_config(config).unwrap();
        sim.add_block(BlockKind::Delay).unwrap();
        sim.run_ticks(5).unwrap();

        let ticks: Vec<u64> = sim.history().iter().map(|r| r.tick).collect();
        assert_eq!(ticks, vec![3, 4]);

        sim.reset_clock();
        assert_eq!(sim.tick_count(), 0);
        assert!(sim.history().is_empty());
    }

    #[test]
    fn test_config_controls_clock() {
        let config = SimConfig {
            start_running: false,
            ..SimConfig::slow()
        };
        let mut sim = Simulator::with_config(config).unwrap();
        assert!(!sim.is_running());
        assert_eq!(sim.speed(), 1.0);

        sim.set_speed(30.0).unwrap();
        assert_eq!(sim.config().speed, 30.0);
        assert!(sim.set_speed(0.0).is_err());
        assert_eq!(sim.speed(), 30.0);
    }
}
