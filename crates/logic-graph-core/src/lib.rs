//! Core domain types shared across the logic-graph workspace.
//!
//! A circuit is a set of [`Block`]s held in a [`Circuit`] arena and addressed by
//! stable [`BlockId`] handles. Edges are never stored on their own: a wire
//! exists wherever a block's input slot holds an [`Input::Wire`] pointing at
//! another block's output pin.
//!
//! ```text
//! Block = {
//!     kind:   BlockKind,               // AND, OR, XOR, NOT, TOGGLE, LED, DELAY, NODE
//!     inputs: Vec<Input>,              // Literal(bool) | Wire(PinRef)
//!     state:  BlockState,              // kind-specific instance state
//!     cached: Option<Vec<bool>>,       // valid within one recalculation pass
//! }
//! ```
//!
//! Evaluation, connection transactions and the simulation clock live in
//! `logic-graph-sim`; this crate only owns the structure and its invariants.

mod block;
mod circuit;
mod description;
mod error;
mod kind;

pub use block::{Block, BlockId, BlockState, Input, PinRef};
pub use circuit::{Circuit, Wire};
pub use description::{BlockRecord, CircuitDescription, RecordInput, DESCRIPTION_VERSION};
pub use error::{CircuitError, CircuitResult};
pub use kind::{BlockKind, UnknownBlockKind};
