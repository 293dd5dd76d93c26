//! The fixed taxonomy of logic elements.
//!
//! Every variant supplies its arity, its combinational function, an optional
//! state-advance function and the set of inputs that take part in same-step
//! combinational resolution (`io_deps`). All of it is plain data on the enum,
//! shared by every instance of the kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::block::BlockState;

/// Enumerates the logic elements a circuit can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockKind {
    /// Two-input conjunction.
    And,
    /// Two-input disjunction.
    Or,
    /// Two-input exclusive or (odd parity).
    Xor,
    /// Inverter.
    Not,
    /// Source whose bit is flipped by the user, never by a tick.
    Toggle,
    /// Sink that displays its single input.
    Led,
    /// One-step memory: outputs what it latched on the previous tick.
    Delay,
    /// Pass-through routing point.
    Node,
}

impl BlockKind {
    /// Every kind, in declaration order.
    pub const ALL: [BlockKind; 8] = [
        BlockKind::And,
        BlockKind::Or,
        BlockKind::Xor,
        BlockKind::Not,
        BlockKind::Toggle,
        BlockKind::Led,
        BlockKind::Delay,
        BlockKind::Node,
    ];

    /// Stable textual identifier, as used in circuit descriptions.
    pub fn id(&self) -> &'static str {
        match self {
            BlockKind::And => "AND",
            BlockKind::Or => "OR",
            BlockKind::Xor => "XOR",
            BlockKind::Not => "NOT",
            BlockKind::Toggle => "TOGGLE",
            BlockKind::Led => "LED",
            BlockKind::Delay => "DELAY",
            BlockKind::Node => "NODE",
        }
    }

    /// Number of input slots.
    pub fn input_arity(&self) -> usize {
        match self {
            BlockKind::And | BlockKind::Or | BlockKind::Xor => 2,
            BlockKind::Not | BlockKind::Led | BlockKind::Delay | BlockKind::Node => 1,
            BlockKind::Toggle => 0,
        }
    }

    /// Number of output pins.
    pub fn output_arity(&self) -> usize {
        match self {
            BlockKind::Led => 0,
            _ => 1,
        }
    }

    /// Input slots that participate in same-step combinational resolution.
    ///
    /// Wires into any other slot are pinned to `false` during evaluation and
    /// are never followed by loop detection. DELAY has none, which is what
    /// lets it close a feedback loop.
    pub fn io_deps(&self) -> &'static [usize] {
        match self {
            BlockKind::And | BlockKind::Or | BlockKind::Xor => &[0, 1],
            BlockKind::Not | BlockKind::Led | BlockKind::Node => &[0],
            BlockKind::Toggle | BlockKind::Delay => &[],
        }
    }

    /// Whether `slot` is one of [`io_deps`](Self::io_deps).
    pub fn is_io_dep(&self, slot: usize) -> bool {
        self.io_deps().contains(&slot)
    }

    /// Whether the kind advances internal state on a tick.
    pub fn is_sequential(&self) -> bool {
        matches!(self, BlockKind::Delay)
    }

    /// State a freshly placed block of this kind starts with.
    pub fn default_state(&self) -> BlockState {
        match self {
            BlockKind::Toggle => BlockState::Toggle { on: false },
            BlockKind::Led => BlockState::Led { lit: false },
            BlockKind::Delay => BlockState::Delay { latched: false },
            _ => BlockState::Stateless,
        }
    }

    /// Whether `state` is the variant this kind carries.
    pub fn accepts_state(&self, state: &BlockState) -> bool {
        std::mem::discriminant(&self.default_state()) == std::mem::discriminant(state)
    }

    /// Combinational function.
    ///
    /// `inputs` must hold exactly [`input_arity`](Self::input_arity) values;
    /// the result always holds [`output_arity`](Self::output_arity) values.
    /// LED records its input into `state` as a side effect.
    pub fn calculate(&self, inputs: &[bool], state: &mut BlockState) -> Vec<bool> {
        debug_assert_eq!(inputs.len(), self.input_arity());
        match self {
            BlockKind::And => vec![inputs[0] && inputs[1]],
            BlockKind::Or => vec![inputs[0] || inputs[1]],
            BlockKind::Xor => vec![inputs.iter().filter(|bit| **bit).count() % 2 == 1],
            BlockKind::Not => vec![!inputs[0]],
            BlockKind::Node => vec![inputs[0]],
            BlockKind::Toggle => vec![state.bit()],
            BlockKind::Delay => vec![state.bit()],
            BlockKind::Led => {
                if let BlockState::Led { lit } = state {
                    *lit = inputs[0];
                }
                Vec::new()
            }
        }
    }

    /// Advance instance state by one discrete step.
    ///
    /// Returns `true` if the state changed. Kinds without sequential
    /// behaviour leave `state` untouched.
    pub fn tick(&self, inputs: &[bool], state: &mut BlockState) -> bool {
        match (self, state) {
            (BlockKind::Delay, BlockState::Delay { latched }) => {
                let next = inputs.first().copied().unwrap_or(false);
                let changed = *latched != next;
                *latched = next;
                changed
            }
            _ => false,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Returned when parsing an unrecognised kind id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown block kind: {0}")]
pub struct UnknownBlockKind(pub String);

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownBlockKind(s.to_string()))
    }
}
