//! Portable, position-indexed form of a circuit.
//!
//! A description is an ordered list of `(kind, state, inputs)` records. Wires
//! refer to other records by list position plus output pin, so the shape is
//! independent of the handles a particular [`Circuit`] issued. Positions may
//! point forward as well as backward: a DELAY feedback loop always has one
//! wire pointing at a later record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockId, BlockState, Input, PinRef};
use crate::circuit::Circuit;
use crate::error::{CircuitError, CircuitResult};
use crate::kind::BlockKind;

/// Version of the description schema.
pub const DESCRIPTION_VERSION: u32 = 1;

fn default_version() -> u32 {
    DESCRIPTION_VERSION
}

/// Root of a serialized circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDescription {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Blocks in list order.
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

impl Default for CircuitDescription {
    fn default() -> Self {
        Self {
            version: DESCRIPTION_VERSION,
            blocks: Vec::new(),
        }
    }
}

/// One block of a description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub kind: BlockKind,
    /// Instance state; omitted means the kind's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<BlockState>,
    #[serde(default)]
    pub inputs: Vec<RecordInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BlockRecord {
    /// A record with default state and all inputs tied low.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            state: None,
            inputs: vec![RecordInput::Literal(false); kind.input_arity()],
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_state(mut self, state: BlockState) -> Self {
        self.state = Some(state);
        self
    }

    /// Replace the inputs wholesale.
    pub fn with_inputs(mut self, inputs: Vec<RecordInput>) -> Self {
        self.inputs = inputs;
        self
    }
}

/// An input binding inside a description.
///
/// Literals serialize as bare booleans, wires as `{"block": n, "pin": p}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordInput {
    Literal(bool),
    Wire { block: usize, pin: usize },
}

impl RecordInput {
    /// Shorthand for a wire from pin 0 of the record at `block`.
    pub fn wire(block: usize) -> Self {
        RecordInput::Wire { block, pin: 0 }
    }
}

impl Circuit {
    /// Flatten into a description, records ordered by handle.
    ///
    /// Fails with [`CircuitError::DanglingWire`] if a wire names a block
    /// that is no longer in the circuit.
    pub fn to_description(&self) -> CircuitResult<CircuitDescription> {
        let positions: HashMap<BlockId, usize> = self
            .iter()
            .enumerate()
            .map(|(position, (id, _))| (id, position))
            .collect();

        let mut blocks = Vec::with_capacity(self.len());
        for (id, block) in self.iter() {
            let mut inputs = Vec::with_capacity(block.inputs().len());
            for (slot, input) in block.inputs().iter().enumerate() {
                inputs.push(match *input {
                    Input::Literal(value) => RecordInput::Literal(value),
                    Input::Wire(driver) => {
                        let position = positions.get(&driver.block).ok_or(
                            CircuitError::DanglingWire {
                                block: id,
                                slot,
                                driver,
                            },
                        )?;
                        RecordInput::Wire {
                            block: *position,
                            pin: driver.pin,
                        }
                    }
                });
            }
            blocks.push(BlockRecord {
                kind: block.kind(),
                state: (*block.state() != block.kind().default_state()).then_some(*block.state()),
                inputs,
                label: block.label().map(str::to_string),
            });
        }

        Ok(CircuitDescription {
            version: DESCRIPTION_VERSION,
            blocks,
        })
    }

    /// Rebuild a circuit. Handles are issued densely in record order.
    ///
    /// Only structure is checked here. Combinational loops are the
    /// evaluator's concern.
    pub fn from_description(description: &CircuitDescription) -> CircuitResult<Self> {
        let mut circuit = Circuit::new();
        let len = description.blocks.len();

        // First pass places every block so forward wires have a target.
        let mut ids = Vec::with_capacity(len);
        for (position, record) in description.blocks.iter().enumerate() {
            let expected = record.kind.input_arity();
            if record.inputs.len() != expected {
                return Err(CircuitError::InputArity {
                    block: BlockId(position as u64),
                    kind: record.kind,
                    expected,
                    actual: record.inputs.len(),
                });
            }
            let mut block = Block::new(record.kind);
            if let Some(state) = record.state {
                block = block.with_state(state);
            }
            if let Some(label) = &record.label {
                block = block.with_label(label.clone());
            }
            ids.push(circuit.insert(block)?);
        }

        for (position, record) in description.blocks.iter().enumerate() {
            for (slot, input) in record.inputs.iter().enumerate() {
                let input = match *input {
                    RecordInput::Literal(value) => Input::Literal(value),
                    RecordInput::Wire { block, pin } => {
                        let driver = ids.get(block).ok_or(CircuitError::RecordOutOfRange {
                            record: position,
                            slot,
                            position: block,
                            len,
                        })?;
                        Input::Wire(PinRef::new(*driver, pin))
                    }
                };
                circuit.set_input(ids[position], slot, input)?;
            }
        }

        Ok(circuit)
    }
}
