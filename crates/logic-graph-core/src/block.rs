//! Instantiated blocks and their input bindings.

use serde::{Deserialize, Serialize};

use crate::kind::BlockKind;

/// Stable handle for a block within a [`Circuit`](crate::Circuit).
///
/// Handles are issued by the owning circuit and never reused by it.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An output pin of a specific block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    /// Block that drives the wire.
    pub block: BlockId,
    /// Output pin index on that block.
    pub pin: usize,
}

impl PinRef {
    /// Create a reference to `pin` on `block`.
    pub fn new(block: BlockId, pin: usize) -> Self {
        Self { block, pin }
    }
}

/// What an input slot is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// A constant signal.
    Literal(bool),
    /// A wire from another block's output pin.
    Wire(PinRef),
}

impl Default for Input {
    fn default() -> Self {
        Input::Literal(false)
    }
}

impl Input {
    /// The wire source, if this slot is wired.
    pub fn wire(&self) -> Option<PinRef> {
        match self {
            Input::Wire(pin) => Some(*pin),
            Input::Literal(_) => None,
        }
    }

    /// Whether this slot is driven by `block`.
    pub fn is_driven_by(&self, block: BlockId) -> bool {
        matches!(self, Input::Wire(pin) if pin.block == block)
    }
}

/// Kind-specific instance state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    /// Purely combinational kinds carry nothing.
    #[default]
    Stateless,
    /// Bit set by the user.
    Toggle { on: bool },
    /// Last value shown by the LED.
    Led { lit: bool },
    /// Value captured on the previous tick.
    Delay { latched: bool },
}

impl BlockState {
    /// The single stored bit, or `false` for stateless blocks.
    pub fn bit(&self) -> bool {
        match *self {
            BlockState::Stateless => false,
            BlockState::Toggle { on } => on,
            BlockState::Led { lit } => lit,
            BlockState::Delay { latched } => latched,
        }
    }
}

/// A placed logic element.
///
/// Blocks are serialized only through
/// [`CircuitDescription`](crate::CircuitDescription), which re-validates
/// wiring on the way back in.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    kind: BlockKind,
    inputs: Vec<Input>,
    state: BlockState,
    cached: Option<Vec<bool>>,
    label: Option<String>,
}

impl Block {
    /// A fresh block with default state and every input tied to `false`.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            inputs: vec![Input::default(); kind.input_arity()],
            state: kind.default_state(),
            cached: None,
            label: None,
        }
    }

    /// Builder-style label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder-style initial state. Validity is checked when the block
    /// enters a circuit.
    pub fn with_state(mut self, state: BlockState) -> Self {
        self.state = state;
        self
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn input(&self, slot: usize) -> Option<Input> {
        self.inputs.get(slot).copied()
    }

    pub fn state(&self) -> &BlockState {
        &self.state
    }

    /// Mutable state, for ticks and user events.
    pub fn state_mut(&mut self) -> &mut BlockState {
        &mut self.state
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// Output computed in the current recalculation pass, if any.
    pub fn cached(&self) -> Option<&[bool]> {
        self.cached.as_deref()
    }

    pub fn set_cached(&mut self, outputs: Vec<bool>) {
        debug_assert_eq!(outputs.len(), self.kind.output_arity());
        self.cached = Some(outputs);
    }

    pub fn clear_cache(&mut self) {
        self.cached = None;
    }

    /// Overwrite an input slot, returning the previous binding.
    ///
    /// Only the slot index is checked here; wire targets are validated by
    /// [`Circuit::set_input`](crate::Circuit::set_input).
    pub(crate) fn replace_input(&mut self, slot: usize, input: Input) -> Option<Input> {
        self.inputs
            .get_mut(slot)
            .map(|current| std::mem::replace(current, input))
    }

    /// Rewrite every wire driven by `source` to `false`. Returns how many
    /// slots were scrubbed.
    pub(crate) fn scrub_wires_from(&mut self, source: BlockId) -> usize {
        let mut scrubbed = 0;
        for input in &mut self.inputs {
            if input.is_driven_by(source) {
                *input = Input::Literal(false);
                scrubbed += 1;
            }
        }
        scrubbed
    }
}
