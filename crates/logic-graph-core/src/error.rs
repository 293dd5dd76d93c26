//! Structural errors.
//!
//! Every variant here means a collaborator built or mutated a circuit
//! incorrectly. None of them are reachable through validated operations.

use thiserror::Error;

use crate::block::{BlockId, PinRef};
use crate::kind::BlockKind;

/// Result type alias for circuit operations.
pub type CircuitResult<T> = Result<T, CircuitError>;

/// Violations of the circuit's structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    /// A block referenced by handle is not in the circuit.
    #[error("block not found: {block}")]
    BlockNotFound { block: BlockId },

    /// A block's input vector does not match its kind.
    #[error("{kind} block {block} has {actual} inputs, expected {expected}")]
    InputArity {
        block: BlockId,
        kind: BlockKind,
        expected: usize,
        actual: usize,
    },

    /// An input slot index beyond the kind's arity.
    #[error("{kind} block {block} has no input slot {slot}")]
    SlotOutOfRange {
        block: BlockId,
        kind: BlockKind,
        slot: usize,
    },

    /// A wire names an output pin the source kind does not have.
    #[error("{kind} block {} has no output pin {}", driver.block, driver.pin)]
    PinOutOfRange { driver: PinRef, kind: BlockKind },

    /// A wire points at a block that no longer exists.
    #[error("block {block} slot {slot} is wired to missing block {}", driver.block)]
    DanglingWire {
        block: BlockId,
        slot: usize,
        driver: PinRef,
    },

    /// Instance state does not belong to the block's kind.
    #[error("{kind} block {block} carries foreign state")]
    StateMismatch { block: BlockId, kind: BlockKind },

    /// A cached output vector of the wrong length.
    #[error("{kind} block {block} cached {actual} outputs, expected {expected}")]
    CacheArity {
        block: BlockId,
        kind: BlockKind,
        expected: usize,
        actual: usize,
    },

    /// A description wire refers past the end of the block list.
    #[error("record {record} input {slot} refers to position {position} of {len}")]
    RecordOutOfRange {
        record: usize,
        slot: usize,
        position: usize,
        len: usize,
    },
}
