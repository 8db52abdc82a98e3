//! Runtime errors.

use smol_str::SmolStr;
use thiserror::Error;

/// Runtime errors for program execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Unrecognized opcode encountered during a scan.
    #[error("unknown opcode 0x{opcode:02X} at pc 0x{pc:X}")]
    InvalidOpcode {
        /// The offending opcode byte.
        opcode: u8,
        /// Program counter where it was found.
        pc: usize,
    },

    /// An instruction's operands run past the end of the program.
    #[error("truncated instruction at pc 0x{pc:X}")]
    TruncatedProgram {
        /// Program counter of the truncated instruction.
        pc: usize,
    },

    /// A scan was requested while no loaded program is ready.
    #[error("no program ready")]
    NotReady,

    /// A pin driver or Modbus bank operation failed.
    ///
    /// Produced by [`crate::io::PinDriver`] and [`crate::io::ModbusBank`]
    /// implementations; during a scan it latches as a fatal fault.
    #[error("i/o driver error '{0}'")]
    IoDriver(SmolStr),
}
