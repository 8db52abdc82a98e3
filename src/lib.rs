//! `ladder-runtime` - runtime core for an LDmicro-compatible ladder logic
//! PLC engine.
//!
//! The engine loads a compiled ladder program over a line-oriented text
//! protocol, stores it as a flat bytecode stream plus an I/O descriptor
//! table, and executes one full scan per configured cycle period against
//! injected pin and Modbus drivers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Ladder bytecode instruction set and decoding.
pub mod bytecode;
/// Scheduling clocks.
pub mod clock;
/// Runtime errors.
pub mod error;
/// Logical I/O points and hardware driver interfaces.
pub mod io;
/// Engine timing telemetry.
pub mod metrics;

mod engine;

pub use engine::{Engine, LoaderState, CATCH_UP_LIMIT, MAX_LINE_LEN};
