//! Memoized pull-based resolution of block outputs.
//!
//! A block's output is computed on demand from its inputs. Literal inputs
//! pass through; a wire into one of the kind's `io_deps` slots is resolved
//! by asking the driver for its output; a wire into any other slot is
//! pinned to `false` and never followed. Results are cached on the
//! block until the next [`invalidate`](Evaluator::invalidate), so one
//! recalculation pass computes every block exactly once.
//!
//! Resolution walks an explicit stack rather than the call stack, so chain
//! depth is bounded by memory only. The loop-checked variant reports a
//! block that reappears on the active path instead of descending forever.
//! Because only `io_deps` wires are followed, loop detection is confined to the
//! combinational subgraph: feedback through a DELAY is never a loop.

use std::collections::HashSet;

use logic_graph_core::{BlockId, BlockKind, Circuit, CircuitError, Input, PinRef};
use tracing::{debug, trace};

use crate::error::{SimError, SimResult};

/// Resolver over a borrowed circuit.
#[derive(Debug)]
pub struct Evaluator<'a> {
    circuit: &'a mut Circuit,
    on_path: HashSet<BlockId>,
}

/// A block whose inputs are being gathered.
#[derive(Debug)]
struct Frame {
    id: BlockId,
    kind: BlockKind,
    inputs: Vec<Input>,
    values: Vec<bool>,
}

impl<'a> Evaluator<'a> {
    pub fn new(circuit: &'a mut Circuit) -> Self {
        Self {
            circuit,
            on_path: HashSet::new(),
        }
    }

    /// Output vector of `block` in the current pass.
    ///
    /// Assumes the combinational subgraph is acyclic, which validated
    /// connections guarantee. Re-entering a block anyway fails with
    /// [`SimError::UnvalidatedLoop`].
    pub fn output(&mut self, block: BlockId) -> SimResult<Vec<bool>> {
        self.resolve(block, false)?
            .ok_or(SimError::UnvalidatedLoop { block })
    }

    /// Output vector of `block`, or `None` if resolving it runs into a
    /// combinational loop. Nothing on the failing path is cached.
    pub fn output_with_loop_check(&mut self, block: BlockId) -> SimResult<Option<Vec<bool>>> {
        self.resolve(block, true)
    }

    /// Clear every cached output.
    pub fn invalidate(&mut self) {
        self.circuit.clear_caches();
    }

    /// Invalidate, then resolve every block once.
    pub fn recalculate(&mut self) -> SimResult<()> {
        self.invalidate();
        for id in self.circuit.ids() {
            self.output(id)?;
        }
        Ok(())
    }

    /// Invalidate and run the loop-checked resolution over every block.
    ///
    /// Returns the first block whose resolution hit a loop.
    pub fn find_loop(&mut self) -> SimResult<Option<BlockId>> {
        self.invalidate();
        for id in self.circuit.ids() {
            if self.output_with_loop_check(id)?.is_none() {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Every input of `block` resolved to a value, including slots outside
    /// `io_deps`. This is the vector a tick consumes.
    pub fn resolved_inputs(&mut self, block: BlockId) -> SimResult<Vec<bool>> {
        let inputs = self.circuit.get(block)?.inputs().to_vec();
        let mut values = Vec::with_capacity(inputs.len());
        for input in inputs {
            let value = match input {
                Input::Literal(value) => value,
                Input::Wire(driver) => {
                    let outputs = self.output(driver.block)?;
                    self.pin_value(driver, &outputs)?
                }
            };
            values.push(value);
        }
        Ok(values)
    }

    fn resolve(&mut self, root: BlockId, check: bool) -> SimResult<Option<Vec<bool>>> {
        let resolved = self.walk(root, check);
        if resolved.is_err() {
            self.on_path.clear();
        }
        resolved
    }

    fn walk(&mut self, root: BlockId, check: bool) -> SimResult<Option<Vec<bool>>> {
        if let Some(cached) = self.circuit.get(root)?.cached() {
            return Ok(Some(cached.to_vec()));
        }

        // Explicit DFS: `on_path` marks the blocks currently on `stack`.
        let mut stack = vec![self.enter(root)?];
        let mut resolved = Vec::new();
        while let Some(frame) = stack.last_mut() {
            let slot = frame.values.len();
            if let Some(&input) = frame.inputs.get(slot) {
                let value = match input {
                    Input::Literal(value) => value,
                    Input::Wire(driver) if frame.kind.is_io_dep(slot) => {
                        match self.cached_pin(driver)? {
                            Some(value) => value,
                            None if self.on_path.contains(&driver.block) => {
                                let path: Vec<_> = stack.iter().map(|frame| frame.id).collect();
                                return self.abandon(driver.block, &path, check);
                            }
                            None => {
                                let child = self.enter(driver.block)?;
                                stack.push(child);
                                continue;
                            }
                        }
                    }
                    // Sequential slot: decoupled from this step's resolution.
                    Input::Wire(_) => false,
                };
                frame.values.push(value);
                continue;
            }

            resolved = self.complete(frame)?;
            stack.pop();
        }
        Ok(Some(resolved))
    }

    fn enter(&mut self, id: BlockId) -> SimResult<Frame> {
        let block = self.circuit.get(id)?;
        let frame = Frame {
            id,
            kind: block.kind(),
            inputs: block.inputs().to_vec(),
            values: Vec::with_capacity(block.inputs().len()),
        };
        self.on_path.insert(id);
        Ok(frame)
    }

    fn complete(&mut self, frame: &Frame) -> SimResult<Vec<bool>> {
        let block = self.circuit.get_mut(frame.id)?;
        let outputs = frame.kind.calculate(&frame.values, block.state_mut());
        block.set_cached(outputs.clone());
        self.on_path.remove(&frame.id);
        trace!(
            block = frame.id.0,
            kind = %frame.kind,
            values = ?frame.values,
            ?outputs,
            "block_resolved"
        );
        Ok(outputs)
    }

    fn abandon(
        &mut self,
        block: BlockId,
        path: &[BlockId],
        check: bool,
    ) -> SimResult<Option<Vec<bool>>> {
        self.on_path.clear();
        debug!(block = block.0, ?path, "combinational_loop_detected");
        if check {
            Ok(None)
        } else {
            Err(SimError::UnvalidatedLoop { block })
        }
    }

    /// Value of `driver` if its block already resolved in this pass.
    fn cached_pin(&self, driver: PinRef) -> SimResult<Option<bool>> {
        match self.circuit.get(driver.block)?.cached() {
            Some(outputs) => self.pin_value(driver, outputs).map(Some),
            None => Ok(None),
        }
    }

    fn pin_value(&self, driver: PinRef, outputs: &[bool]) -> SimResult<bool> {
        match outputs.get(driver.pin) {
            Some(value) => Ok(*value),
            None => {
                let kind = self.circuit.get(driver.block)?.kind();
                Err(CircuitError::PinOutOfRange { driver, kind }.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logic_graph_core::BlockState;

    fn wire(circuit: &mut Circuit, from: BlockId, to: BlockId, slot: usize) {
        circuit
            .set_input(to, slot, Input::Wire(PinRef::new(from, 0)))
            .unwrap();
    }

    fn set_toggle(circuit: &mut Circuit, id: BlockId, on: bool) {
        *circuit.get_mut(id).unwrap().state_mut() = BlockState::Toggle { on };
    }

    #[test]
    fn test_chain_resolves() {
        let mut circuit = Circuit::new();
        let a = circuit.add_block(BlockKind::Toggle);
        let b = circuit.add_block(BlockKind::Toggle);
        let and = circuit.add_block(BlockKind::And);
        let not = circuit.add_block(BlockKind::Not);
        wire(&mut circuit, a, and, 0);
        wire(&mut circuit, b, and, 1);
        wire(&mut circuit, and, not, 0);
        set_toggle(&mut circuit, a, true);
        set_toggle(&mut circuit, b, true);

        let mut eval = Evaluator::new(&mut circuit);
        assert_eq!(eval.output(not).unwrap(), vec![false]);
        assert_eq!(eval.output(and).unwrap(), vec![true]);
    }

    #[test]
    fn test_memoized_within_pass() {
        let mut circuit = Circuit::new();
        let toggle = circuit.add_block(BlockKind::Toggle);
        let node = circuit.add_block(BlockKind::Node);
        wire(&mut circuit, toggle, node, 0);

        let first = Evaluator::new(&mut circuit).output(node).unwrap();
        assert_eq!(first, vec![false]);

        // Without invalidation the stale cache is served.
        set_toggle(&mut circuit, toggle, true);
        assert_eq!(Evaluator::new(&mut circuit).output(node).unwrap(), vec![false]);

        let mut eval = Evaluator::new(&mut circuit);
        eval.recalculate().unwrap();
        assert_eq!(eval.output(node).unwrap(), vec![true]);
    }

    #[test]
    fn test_non_io_dep_wire_is_pinned_low() {
        let mut circuit = Circuit::new();
        let toggle = circuit.add_block(BlockKind::Toggle);
        let delay = circuit.add_block(BlockKind::Delay);
        wire(&mut circuit, toggle, delay, 0);
        set_toggle(&mut circuit, toggle, true);

        let mut eval = Evaluator::new(&mut circuit);
        eval.recalculate().unwrap();
        // The delay output is its latched bit, not its live input.
        assert_eq!(eval.output(delay).unwrap(), vec![false]);
        assert_eq!(eval.resolved_inputs(delay).unwrap(), vec![true]);
    }

    #[test]
    fn test_loop_check_flags_and_self_loop() {
        let mut circuit = Circuit::new();
        let and = circuit.add_block(BlockKind::And);
        wire(&mut circuit, and, and, 0);

        let mut eval = Evaluator::new(&mut circuit);
        assert_eq!(eval.output_with_loop_check(and).unwrap(), None);
        assert_eq!(eval.find_loop().unwrap(), Some(and));
        assert!(matches!(
            eval.output(and),
            Err(SimError::UnvalidatedLoop { .. })
        ));
        drop(eval);
        assert!(circuit.get(and).unwrap().cached().is_none());
    }

    #[test]
    fn test_loop_check_passes_delay_self_loop() {
        let mut circuit = Circuit::new();
        let delay = circuit.add_block(BlockKind::Delay);
        wire(&mut circuit, delay, delay, 0);

        let mut eval = Evaluator::new(&mut circuit);
        assert_eq!(eval.find_loop().unwrap(), None);
        assert_eq!(eval.output_with_loop_check(delay).unwrap(), Some(vec![false]));
    }

    #[test]
    fn test_loop_failure_propagates_without_caching() {
        let mut circuit = Circuit::new();
        let or = circuit.add_block(BlockKind::Or);
        let not = circuit.add_block(BlockKind::Not);
        let led = circuit.add_block(BlockKind::Led);
        wire(&mut circuit, or, not, 0);
        wire(&mut circuit, not, or, 0);
        wire(&mut circuit, not, led, 0);

        let mut eval = Evaluator::new(&mut circuit);
        eval.invalidate();
        assert_eq!(eval.output_with_loop_check(led).unwrap(), None);
        drop(eval);
        for id in [or, not, led] {
            assert!(circuit.get(id).unwrap().cached().is_none());
        }
    }

    #[test]
    fn test_long_chain_resolves_iteratively() {
        let mut circuit = Circuit::new();
        let toggle = circuit.add_block(BlockKind::Toggle);
        set_toggle(&mut circuit, toggle, true);
        let mut tail = toggle;
        for _ in 0..50_001 {
            let not = circuit.add_block(BlockKind::Not);
            wire(&mut circuit, tail, not, 0);
            tail = not;
        }

        let mut eval = Evaluator::new(&mut circuit);
        // An odd number of inversions of `true`.
        assert_eq!(eval.output(tail).unwrap(), vec![false]);
        assert_eq!(eval.find_loop().unwrap(), None);
    }

    #[test]
    fn test_missing_block_is_structural_error() {
        let mut circuit = Circuit::new();
        let mut eval = Evaluator::new(&mut circuit);
        assert!(matches!(
            eval.output(BlockId(7)),
            Err(SimError::Circuit(CircuitError::BlockNotFound { .. }))
        ));
    }
}
