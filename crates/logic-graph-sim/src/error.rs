//! Error types for the simulator.

use logic_graph_core::{BlockId, BlockKind, CircuitError};
use thiserror::Error;

/// Result type alias for simulator operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors that can occur while evaluating or driving a circuit.
///
/// A combinational loop found while *connecting* is not an error; it is
/// reported as [`ConnectOutcome::LoopRejected`](crate::ConnectOutcome).
#[derive(Debug, Error)]
pub enum SimError {
    /// The circuit violated a structural invariant.
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    /// A loaded circuit contains a combinational loop.
    #[error("combinational loop through block {block}")]
    CombinationalLoop { block: BlockId },

    /// Plain resolution re-entered a block on its own path. Only possible if
    /// a loop bypassed validation.
    #[error("unvalidated combinational loop reached at block {block}")]
    UnvalidatedLoop { block: BlockId },

    /// A toggle operation named a block of another kind.
    #[error("block {block} is a {kind}, not a TOGGLE")]
    NotAToggle { block: BlockId, kind: BlockKind },

    /// An LED query named a block of another kind.
    #[error("block {block} is a {kind}, not an LED")]
    NotAnLed { block: BlockId, kind: BlockKind },

    /// Clock speed must be finite and positive.
    #[error("invalid speed: {speed} (must be > 0 ticks/s)")]
    InvalidSpeed { speed: f64 },

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Description serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (file operations).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
