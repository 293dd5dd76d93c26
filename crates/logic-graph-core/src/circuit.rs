//! The block arena.
//!
//! A `Circuit` owns every block and hands out [`BlockId`] handles from a
//! per-circuit counter. Wires are derived from input bindings; the
//! [`wiring_graph`](Circuit::wiring_graph) view materialises them as a
//! `petgraph` graph for analysis and display.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

use crate::block::{Block, BlockId, Input, PinRef};
use crate::error::{CircuitError, CircuitResult};
use crate::kind::BlockKind;

/// A single derived edge: `from` drives input `slot` of block `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    /// Driving output pin.
    pub from: PinRef,
    /// Consuming block.
    pub to: BlockId,
    /// Input slot on the consuming block.
    pub slot: usize,
    /// Whether the slot is one of the consumer's `io_deps`.
    pub combinational: bool,
}

/// All blocks of one circuit, in handle order.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    blocks: BTreeMap<BlockId, Block>,
    next_id: u64,
}

impl Circuit {
    /// Creates an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a fresh block of `kind` with default state and inputs.
    pub fn add_block(&mut self, kind: BlockKind) -> BlockId {
        let id = self.issue_id();
        self.blocks.insert(id, Block::new(kind));
        id
    }

    /// Place a prepared block after checking it against the invariants.
    pub fn insert(&mut self, block: Block) -> CircuitResult<BlockId> {
        let id = BlockId(self.next_id);
        self.check_block(id, &block)?;
        self.next_id += 1;
        self.blocks.insert(id, block);
        Ok(id)
    }

    fn issue_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    /// Like [`block`](Self::block) but missing handles are an error.
    pub fn get(&self, id: BlockId) -> CircuitResult<&Block> {
        self.blocks
            .get(&id)
            .ok_or(CircuitError::BlockNotFound { block: id })
    }

    /// Like [`block_mut`](Self::block_mut) but missing handles are an error.
    pub fn get_mut(&mut self, id: BlockId) -> CircuitResult<&mut Block> {
        self.blocks
            .get_mut(&id)
            .ok_or(CircuitError::BlockNotFound { block: id })
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Handles of every block, ascending.
    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().map(|(id, block)| (*id, block))
    }

    /// Blocks of one kind, ascending by handle.
    pub fn blocks_of_kind(&self, kind: BlockKind) -> impl Iterator<Item = (BlockId, &Block)> {
        self.iter().filter(move |(_, block)| block.kind() == kind)
    }

    /// Check that `driver` names a live block and one of its output pins.
    pub fn check_driver(&self, driver: PinRef) -> CircuitResult<()> {
        let source = self.get(driver.block)?;
        if driver.pin >= source.kind().output_arity() {
            return Err(CircuitError::PinOutOfRange {
                driver,
                kind: source.kind(),
            });
        }
        Ok(())
    }

    /// Bind input `slot` of block `id`, returning the previous binding.
    ///
    /// Wires are checked structurally only; combinational loops are the
    /// caller's concern.
    pub fn set_input(&mut self, id: BlockId, slot: usize, input: Input) -> CircuitResult<Input> {
        if let Input::Wire(driver) = input {
            self.check_driver(driver)?;
        }
        let block = self.get_mut(id)?;
        let kind = block.kind();
        block
            .replace_input(slot, input)
            .ok_or(CircuitError::SlotOutOfRange {
                block: id,
                kind,
                slot,
            })
    }

    /// Delete a block.
    ///
    /// Every wire driven by the block is rewritten to literal `false` before
    /// the block leaves the arena, so no dangling wire is ever observable.
    pub fn remove_block(&mut self, id: BlockId) -> CircuitResult<Block> {
        if !self.contains(id) {
            return Err(CircuitError::BlockNotFound { block: id });
        }
        for (other, block) in self.blocks.iter_mut() {
            if *other != id {
                block.scrub_wires_from(id);
            }
        }
        self.blocks
            .remove(&id)
            .ok_or(CircuitError::BlockNotFound { block: id })
    }

    /// Drop every cached output.
    pub fn clear_caches(&mut self) {
        for block in self.blocks.values_mut() {
            block.clear_cache();
        }
    }

    /// Check every structural invariant of every block.
    pub fn validate(&self) -> CircuitResult<()> {
        for (id, block) in self.iter() {
            self.check_block(id, block)?;
            if let Some(cached) = block.cached() {
                let expected = block.kind().output_arity();
                if cached.len() != expected {
                    return Err(CircuitError::CacheArity {
                        block: id,
                        kind: block.kind(),
                        expected,
                        actual: cached.len(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_block(&self, id: BlockId, block: &Block) -> CircuitResult<()> {
        let kind = block.kind();
        if block.inputs().len() != kind.input_arity() {
            return Err(CircuitError::InputArity {
                block: id,
                kind,
                expected: kind.input_arity(),
                actual: block.inputs().len(),
            });
        }
        if !kind.accepts_state(block.state()) {
            return Err(CircuitError::StateMismatch { block: id, kind });
        }
        for (slot, input) in block.inputs().iter().enumerate() {
            if let Input::Wire(driver) = *input {
                // A block may drive itself; it is not in the arena yet on insert.
                if driver.block == id {
                    if driver.pin >= kind.output_arity() {
                        return Err(CircuitError::PinOutOfRange { driver, kind });
                    }
                    continue;
                }
                if !self.contains(driver.block) {
                    return Err(CircuitError::DanglingWire {
                        block: id,
                        slot,
                        driver,
                    });
                }
                self.check_driver(driver)?;
            }
        }
        Ok(())
    }

    /// Every wire in the circuit, ordered by consumer then slot.
    pub fn wires(&self) -> Vec<Wire> {
        self.iter()
            .flat_map(|(to, block)| {
                block
                    .inputs()
                    .iter()
                    .enumerate()
                    .filter_map(move |(slot, input)| {
                        input.wire().map(|from| Wire {
                            from,
                            to,
                            slot,
                            combinational: block.kind().is_io_dep(slot),
                        })
                    })
            })
            .collect()
    }

    /// Convert to a petgraph `StableDiGraph` with driver -> consumer edges.
    /// Returns the graph and a mapping from `BlockId` to `NodeIndex`.
    pub fn wiring_graph(&self) -> (StableDiGraph<BlockId, Wire>, HashMap<BlockId, NodeIndex>) {
        self.build_graph(false)
    }

    fn build_graph(
        &self,
        combinational_only: bool,
    ) -> (StableDiGraph<BlockId, Wire>, HashMap<BlockId, NodeIndex>) {
        let mut graph = StableDiGraph::new();
        let mut id_to_index = HashMap::new();

        for id in self.blocks.keys() {
            let idx = graph.add_node(*id);
            id_to_index.insert(*id, idx);
        }

        for wire in self.wires() {
            if combinational_only && !wire.combinational {
                continue;
            }
            if let (Some(&from_idx), Some(&to_idx)) =
                (id_to_index.get(&wire.from.block), id_to_index.get(&wire.to))
            {
                graph.add_edge(from_idx, to_idx, wire);
            }
        }

        (graph, id_to_index)
    }

    /// Whether the subgraph of `io_deps` wires contains a cycle.
    pub fn has_combinational_cycle(&self) -> bool {
        let (graph, _) = self.build_graph(true);
        is_cyclic_directed(&graph)
    }

    /// Number of blocks on the longest chain of combinational wires, or
    /// `None` if that subgraph is cyclic.
    pub fn combinational_depth(&self) -> Option<usize> {
        let (graph, _) = self.build_graph(true);
        let order = toposort(&graph, None).ok()?;

        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        for idx in order {
            let longest_upstream = graph
                .neighbors_directed(idx, Direction::Incoming)
                .filter_map(|pred| depth.get(&pred).copied())
                .max()
                .unwrap_or(0);
            depth.insert(idx, longest_upstream + 1);
        }
        Some(depth.values().copied().max().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockState;

    fn wire(circuit: &mut Circuit, from: BlockId, to: BlockId, slot: usize) {
        circuit
            .set_input(to, slot, Input::Wire(PinRef::new(from, 0)))
            .unwrap();
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut circuit = Circuit::new();
        let a = circuit.add_block(BlockKind::And);
        circuit.remove_block(a).unwrap();
        let b = circuit.add_block(BlockKind::And);
        assert_ne!(a, b);
        assert_eq!(circuit.len(), 1);
    }

    #[test]
    fn test_set_input_rejects_bad_wires() {
        let mut circuit = Circuit::new();
        let led = circuit.add_block(BlockKind::Led);
        let not = circuit.add_block(BlockKind::Not);

        // LED has no output pins.
        let err = circuit
            .set_input(not, 0, Input::Wire(PinRef::new(led, 0)))
            .unwrap_err();
        assert!(matches!(err, CircuitError::PinOutOfRange { .. }));

        let err = circuit
            .set_input(not, 0, Input::Wire(PinRef::new(BlockId(99), 0)))
            .unwrap_err();
        assert_eq!(err, CircuitError::BlockNotFound { block: BlockId(99) });

        let err = circuit.set_input(not, 1, Input::Literal(true)).unwrap_err();
        assert!(matches!(err, CircuitError::SlotOutOfRange { slot: 1, .. }));
    }

    #[test]
    fn test_remove_block_scrubs_wires() {
        let mut circuit = Circuit::new();
        let toggle = circuit.add_block(BlockKind::Toggle);
        let and = circuit.add_block(BlockKind::And);
        let led = circuit.add_block(BlockKind::Led);
        wire(&mut circuit, toggle, and, 0);
        wire(&mut circuit, toggle, and, 1);
        wire(&mut circuit, and, led, 0);

        circuit.remove_block(toggle).unwrap();

        let and_block = circuit.get(and).unwrap();
        assert_eq!(and_block.inputs(), &[Input::Literal(false), Input::Literal(false)]);
        assert_eq!(
            circuit.get(led).unwrap().input(0),
            Some(Input::Wire(PinRef::new(and, 0)))
        );
        circuit.validate().unwrap();
    }

    #[test]
    fn test_remove_missing_block() {
        let mut circuit = Circuit::new();
        assert!(matches!(
            circuit.remove_block(BlockId(4)),
            Err(CircuitError::BlockNotFound { .. })
        ));
    }

    #[test]
    fn test_insert_checks_state_and_wires() {
        let mut circuit = Circuit::new();
        let bad_state = Block::new(BlockKind::And).with_state(BlockState::Delay { latched: true });
        assert!(matches!(
            circuit.insert(bad_state),
            Err(CircuitError::StateMismatch { .. })
        ));

        let ok = Block::new(BlockKind::Delay).with_state(BlockState::Delay { latched: true });
        let id = circuit.insert(ok).unwrap();
        assert!(circuit.get(id).unwrap().state().bit());
    }

    #[test]
    fn test_combinational_cycle_ignores_delay_feedback() {
        let mut circuit = Circuit::new();
        let delay = circuit.add_block(BlockKind::Delay);
        let not = circuit.add_block(BlockKind::Not);
        wire(&mut circuit, delay, not, 0);
        wire(&mut circuit, not, delay, 0);
        assert!(!circuit.has_combinational_cycle());
        assert_eq!(circuit.combinational_depth(), Some(2));

        let and = circuit.add_block(BlockKind::And);
        wire(&mut circuit, and, and, 0);
        assert!(circuit.has_combinational_cycle());
        assert_eq!(circuit.combinational_depth(), None);
    }

    #[test]
    fn test_wiring_graph_edges() {
        let mut circuit = Circuit::new();
        let a = circuit.add_block(BlockKind::Toggle);
        let b = circuit.add_block(BlockKind::Not);
        let c = circuit.add_block(BlockKind::Led);
        wire(&mut circuit, a, b, 0);
        wire(&mut circuit, b, c, 0);

        let (graph, index) = circuit.wiring_graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge(index[&a], index[&b]));
        assert!(graph.contains_edge(index[&b], index[&c]));
        assert_eq!(circuit.combinational_depth(), Some(3));
    }
}
