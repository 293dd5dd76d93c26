//! Validated mutations of circuit wiring.
//!
//! Every operation touches exactly one input binding, so a transaction is a
//! snapshot of that one slot: write speculatively, validate, restore on
//! failure. After every committed change the circuit is recalculated so
//! cached outputs reflect the new topology.

use logic_graph_core::{Block, BlockId, Circuit, Input, PinRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimResult;
use crate::evaluator::Evaluator;

/// Result of a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectOutcome {
    /// The wire was committed.
    Connected,
    /// The wire would have closed a combinational loop and was rolled back.
    LoopRejected,
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected)
    }
}

/// The prior binding of a single input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub block: BlockId,
    pub slot: usize,
    pub previous: Input,
}

impl SlotSnapshot {
    /// Write `input` into the slot and remember what was there.
    pub fn write(
        circuit: &mut Circuit,
        block: BlockId,
        slot: usize,
        input: Input,
    ) -> SimResult<Self> {
        let previous = circuit.set_input(block, slot, input)?;
        Ok(Self {
            block,
            slot,
            previous,
        })
    }

    /// Put the remembered binding back.
    pub fn restore(self, circuit: &mut Circuit) -> SimResult<()> {
        circuit.set_input(self.block, self.slot, self.previous)?;
        Ok(())
    }

    /// Run `check` against the speculative binding. If it fails, the slot
    /// is restored and caches are dropped before the error is returned.
    pub fn check<T>(
        self,
        circuit: &mut Circuit,
        check: impl FnOnce(&mut Circuit) -> SimResult<T>,
    ) -> SimResult<T> {
        match check(circuit) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.restore(circuit)?;
                circuit.clear_caches();
                Err(err)
            }
        }
    }
}

/// Wire `driver` into input `slot` of `target`, unless doing so would close
/// a combinational loop.
///
/// Structural problems (missing blocks, bad pin or slot) are errors. A loop
/// is not: the slot is restored to its previous binding and
/// [`ConnectOutcome::LoopRejected`] is returned.
pub fn try_connect(
    circuit: &mut Circuit,
    driver: PinRef,
    target: BlockId,
    slot: usize,
) -> SimResult<ConnectOutcome> {
    let snapshot = SlotSnapshot::write(circuit, target, slot, Input::Wire(driver))?;

    let looped = snapshot.check(circuit, |circuit| Evaluator::new(circuit).find_loop())?;
    if let Some(at) = looped {
        snapshot.restore(circuit)?;
        // The aborted pass left caches computed against the speculative wire.
        Evaluator::new(circuit).recalculate()?;
        debug!(
            from = driver.block.0,
            pin = driver.pin,
            to = target.0,
            slot,
            loop_at = at.0,
            "connect_loop_rejected"
        );
        return Ok(ConnectOutcome::LoopRejected);
    }

    Evaluator::new(circuit).recalculate()?;
    debug!(
        from = driver.block.0,
        pin = driver.pin,
        to = target.0,
        slot,
        "connect_committed"
    );
    Ok(ConnectOutcome::Connected)
}

/// Tie input `slot` of `target` to a constant and recalculate. Returns the
/// previous binding.
pub fn set_literal(
    circuit: &mut Circuit,
    target: BlockId,
    slot: usize,
    value: bool,
) -> SimResult<Input> {
    let snapshot = SlotSnapshot::write(circuit, target, slot, Input::Literal(value))?;
    Evaluator::new(circuit).recalculate()?;
    debug!(to = target.0, slot, value, "input_set_literal");
    Ok(snapshot.previous)
}

/// Drop whatever drives input `slot` of `target`; the slot reads `false`.
pub fn disconnect(circuit: &mut Circuit, target: BlockId, slot: usize) -> SimResult<Input> {
    set_literal(circuit, target, slot, false)
}

/// Remove a block, scrubbing every wire it drove, and recalculate.
pub fn delete_block(circuit: &mut Circuit, id: BlockId) -> SimResult<Block> {
    let removed = circuit.remove_block(id)?;
    Evaluator::new(circuit).recalculate()?;
    debug!(block = id.0, kind = %removed.kind(), "block_deleted");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use logic_graph_core::{BlockKind, CircuitError};

    #[test]
    fn test_connect_commits_and_recalculates() {
        let mut circuit = Circuit::new();
        let not = circuit.add_block(BlockKind::Not);
        let led = circuit.add_block(BlockKind::Led);

        let outcome = try_connect(&mut circuit, PinRef::new(not, 0), led, 0).unwrap();
        assert_eq!(outcome, ConnectOutcome::Connected);
        assert_eq!(circuit.get(not).unwrap().cached(), Some(&[true][..]));
        assert!(circuit.get(led).unwrap().state().bit());
    }

    #[test]
    fn test_loop_rolls_back_previous_binding() {
        let mut circuit = Circuit::new();
        let and = circuit.add_block(BlockKind::And);
        circuit.set_input(and, 1, Input::Literal(true)).unwrap();

        let outcome = try_connect(&mut circuit, PinRef::new(and, 0), and, 1).unwrap();
        assert_eq!(outcome, ConnectOutcome::LoopRejected);
        assert_eq!(circuit.get(and).unwrap().input(1), Some(Input::Literal(true)));
        // Caches were rebuilt against the restored topology.
        assert_eq!(circuit.get(and).unwrap().cached(), Some(&[false][..]));
    }

    #[test]
    fn test_failed_check_restores_slot() {
        let mut circuit = Circuit::new();
        let toggle = circuit.add_block(BlockKind::Toggle);
        let not = circuit.add_block(BlockKind::Not);
        circuit.set_input(not, 0, Input::Literal(true)).unwrap();

        let snapshot =
            SlotSnapshot::write(&mut circuit, not, 0, Input::Wire(PinRef::new(toggle, 0)))
                .unwrap();
        let err = snapshot
            .check(&mut circuit, |circuit| {
                Evaluator::new(circuit).recalculate()?;
                Err::<(), _>(CircuitError::BlockNotFound { block: BlockId(9) }.into())
            })
            .unwrap_err();

        assert!(matches!(
            err,
            SimError::Circuit(CircuitError::BlockNotFound { .. })
        ));
        assert_eq!(circuit.get(not).unwrap().input(0), Some(Input::Literal(true)));
        assert!(circuit.get(not).unwrap().cached().is_none());
    }

    #[test]
    fn test_structural_errors_leave_circuit_untouched() {
        let mut circuit = Circuit::new();
        let not = circuit.add_block(BlockKind::Not);
        let err = try_connect(&mut circuit, PinRef::new(BlockId(42), 0), not, 0).unwrap_err();
        assert!(matches!(
            err,
            SimError::Circuit(CircuitError::BlockNotFound { .. })
        ));
        assert_eq!(circuit.get(not).unwrap().input(0), Some(Input::Literal(false)));
    }

    #[test]
    fn test_disconnect_returns_previous_wire() {
        let mut circuit = Circuit::new();
        let toggle = circuit.add_block(BlockKind::Toggle);
        let node = circuit.add_block(BlockKind::Node);
        try_connect(&mut circuit, PinRef::new(toggle, 0), node, 0).unwrap();

        let previous = disconnect(&mut circuit, node, 0).unwrap();
        assert_eq!(previous, Input::Wire(PinRef::new(toggle, 0)));
        assert_eq!(circuit.get(node).unwrap().input(0), Some(Input::Literal(false)));
    }

    #[test]
    fn test_delete_block_recalculates() {
        let mut circuit = Circuit::new();
        let toggle = circuit.add_block(BlockKind::Toggle);
        *circuit.get_mut(toggle).unwrap().state_mut() =
            logic_graph_core::BlockState::Toggle { on: true };
        let not = circuit.add_block(BlockKind::Not);
        try_connect(&mut circuit, PinRef::new(toggle, 0), not, 0).unwrap();
        assert_eq!(circuit.get(not).unwrap().cached(), Some(&[false][..]));

        delete_block(&mut circuit, toggle).unwrap();
        assert_eq!(circuit.get(not).unwrap().cached(), Some(&[true][..]));
    }
}
