//! Evaluation and time stepping for logic-graph circuits.
//!
//! This crate turns the static structure from `logic-graph-core` into a
//! running simulation:
//!
//! - **Evaluator**: memoized, pull-based resolution of block outputs, with a
//!   loop-checked variant that reports combinational cycles instead of
//!   descending forever.
//! - **Transactions**: wiring changes that are written speculatively,
//!   validated, and rolled back if they would close a combinational loop.
//! - **Clock**: a fixed-rate accumulator that converts host frame times into
//!   discrete ticks, with a clamped backlog.
//! - **Simulator**: the facade hosts drive, owning a circuit, its clock and
//!   a bounded tick history.
//!
//! ## The Evaluation Model
//!
//! ```text
//! output(block) = cached
//!              ?? kind.calculate([ resolve(input) for input in inputs ])
//!
//! resolve(Literal(v))          = v
//! resolve(Wire(pin)) at io_dep = output(pin.block)[pin.pin]
//! resolve(Wire(_))   otherwise = false        // sequential slot
//! ```
//!
//! A tick reads every DELAY's fully resolved inputs from the last
//! recalculation, latches them, then recalculates once.

mod clock;
mod config;
mod error;
mod evaluator;
pub mod persistence;
mod simulator;
mod transaction;

pub use clock::{SimClock, DEFAULT_MAX_BACKLOG_FACTOR};
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use evaluator::Evaluator;
pub use simulator::{FrameReport, Simulator, TickReport};
pub use transaction::{
    delete_block, disconnect, set_literal, try_connect, ConnectOutcome, SlotSnapshot,
};

// Persistence
pub use persistence::{
    load_description, save_description, CircuitMetadata, CircuitStore, PersistedCircuit,
    SnapshotInfo, STORE_DIR,
};

// Core types hosts need alongside the simulator.
pub use logic_graph_core::{
    BlockId, BlockKind, BlockRecord, Circuit, CircuitDescription, CircuitError, Input, PinRef,
    RecordInput,
};
