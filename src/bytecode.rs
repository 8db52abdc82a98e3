//! Ladder bytecode instruction set and decoding.
//!
//! The compiled program is a flat byte stream produced by an LDmicro-style
//! host compiler. Each opcode has a fixed operand width; decoding yields a
//! closed [`Instruction`] so the interpreter never does ad-hoc program
//! counter arithmetic.

#![allow(missing_docs)]

use crate::error::RuntimeError;

/// Raw opcode values shared with the host compiler.
pub mod opcodes {
    pub const SET_BIT: u8 = 1;
    pub const CLEAR_BIT: u8 = 2;
    pub const COPY_BIT_TO_BIT: u8 = 3;
    pub const SET_VARIABLE_TO_LITERAL: u8 = 4;
    pub const SET_VARIABLE_TO_VARIABLE: u8 = 5;
    pub const INCREMENT_VARIABLE: u8 = 6;
    pub const SET_VARIABLE_ADD: u8 = 7;
    pub const SET_VARIABLE_SUBTRACT: u8 = 8;
    pub const SET_VARIABLE_MULTIPLY: u8 = 9;
    pub const SET_VARIABLE_DIVIDE: u8 = 10;
    pub const READ_ADC: u8 = 11;
    pub const SET_PWM: u8 = 12;

    pub const IF_BIT_SET: u8 = 50;
    pub const IF_BIT_CLEAR: u8 = 51;
    pub const IF_VARIABLE_LES_LITERAL: u8 = 52;
    pub const IF_VARIABLE_EQUALS_VARIABLE: u8 = 53;
    /// Legacy comparison kept for programs from older compilers.
    pub const IF_VARIABLE_GRT_VARIABLE: u8 = 54;

    pub const ELSE: u8 = 160;

    pub const END_OF_PROGRAM: u8 = 255;
}

/// One decoded ladder instruction.
///
/// Skip amounts on the conditional forms are byte counts added to the program
/// counter *after* the instruction's own width, mirroring the wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    SetBit { addr: u8 },
    ClearBit { addr: u8 },
    CopyBit { dst: u8, src: u8 },
    SetWordLiteral { addr: u8, value: i16 },
    SetWordFromWord { dst: u8, src: u8 },
    IncrementWord { addr: u8 },
    Add { dst: u8, a: u8, b: u8 },
    Sub { dst: u8, a: u8, b: u8 },
    Mul { dst: u8, a: u8, b: u8 },
    Div { dst: u8, a: u8, b: u8 },
    ReadAdc { addr: u8 },
    /// The encoded frequency operands are accepted but unused.
    SetPwm { addr: u8 },
    IfBitSet { addr: u8, skip: u8 },
    IfBitClear { addr: u8, skip: u8 },
    IfWordLessLiteral { addr: u8, literal: i16, skip: u8 },
    IfWordEqWord { a: u8, b: u8, skip: u8 },
    /// Obsolete in current compilers, still honored when downloaded.
    IfWordGtWord { a: u8, b: u8, skip: u8 },
    ElseJump { skip: u8 },
    EndOfProgram,
}

/// An instruction together with the pc of the following one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub insn: Instruction,
    pub next_pc: usize,
}

impl Instruction {
    /// Decode the instruction at `pc`.
    ///
    /// Returns [`RuntimeError::InvalidOpcode`] for an unassigned opcode and
    /// [`RuntimeError::TruncatedProgram`] when the fixed operand width runs
    /// past the end of the program. Both are fatal to the scan.
    pub fn decode(program: &[u8], pc: usize) -> Result<Decoded, RuntimeError> {
        use opcodes as op;

        let opcode = *program
            .get(pc)
            .ok_or(RuntimeError::TruncatedProgram { pc })?;
        let width = match opcode {
            op::END_OF_PROGRAM => 1,
            op::SET_BIT | op::CLEAR_BIT | op::INCREMENT_VARIABLE | op::READ_ADC | op::ELSE => 2,
            op::COPY_BIT_TO_BIT
            | op::SET_VARIABLE_TO_VARIABLE
            | op::IF_BIT_SET
            | op::IF_BIT_CLEAR => 3,
            op::SET_VARIABLE_TO_LITERAL
            | op::SET_VARIABLE_ADD
            | op::SET_VARIABLE_SUBTRACT
            | op::SET_VARIABLE_MULTIPLY
            | op::SET_VARIABLE_DIVIDE
            | op::SET_PWM
            | op::IF_VARIABLE_EQUALS_VARIABLE
            | op::IF_VARIABLE_GRT_VARIABLE => 4,
            op::IF_VARIABLE_LES_LITERAL => 5,
            _ => return Err(RuntimeError::InvalidOpcode { opcode, pc }),
        };
        if pc + width > program.len() {
            return Err(RuntimeError::TruncatedProgram { pc });
        }
        let operands = &program[pc + 1..pc + width];

        let insn = match opcode {
            op::SET_BIT => Instruction::SetBit { addr: operands[0] },
            op::CLEAR_BIT => Instruction::ClearBit { addr: operands[0] },
            op::COPY_BIT_TO_BIT => Instruction::CopyBit {
                dst: operands[0],
                src: operands[1],
            },
            op::SET_VARIABLE_TO_LITERAL => Instruction::SetWordLiteral {
                addr: operands[0],
                value: i16::from_le_bytes([operands[1], operands[2]]),
            },
            op::SET_VARIABLE_TO_VARIABLE => Instruction::SetWordFromWord {
                dst: operands[0],
                src: operands[1],
            },
            op::INCREMENT_VARIABLE => Instruction::IncrementWord { addr: operands[0] },
            op::SET_VARIABLE_ADD => Instruction::Add {
                dst: operands[0],
                a: operands[1],
                b: operands[2],
            },
            op::SET_VARIABLE_SUBTRACT => Instruction::Sub {
                dst: operands[0],
                a: operands[1],
                b: operands[2],
            },
            op::SET_VARIABLE_MULTIPLY => Instruction::Mul {
                dst: operands[0],
                a: operands[1],
                b: operands[2],
            },
            op::SET_VARIABLE_DIVIDE => Instruction::Div {
                dst: operands[0],
                a: operands[1],
                b: operands[2],
            },
            op::READ_ADC => Instruction::ReadAdc { addr: operands[0] },
            op::SET_PWM => Instruction::SetPwm { addr: operands[0] },
            op::IF_BIT_SET => Instruction::IfBitSet {
                addr: operands[0],
                skip: operands[1],
            },
            op::IF_BIT_CLEAR => Instruction::IfBitClear {
                addr: operands[0],
                skip: operands[1],
            },
            op::IF_VARIABLE_LES_LITERAL => Instruction::IfWordLessLiteral {
                addr: operands[0],
                literal: i16::from_le_bytes([operands[1], operands[2]]),
                skip: operands[3],
            },
            op::IF_VARIABLE_EQUALS_VARIABLE => Instruction::IfWordEqWord {
                a: operands[0],
                b: operands[1],
                skip: operands[2],
            },
            op::IF_VARIABLE_GRT_VARIABLE => Instruction::IfWordGtWord {
                a: operands[0],
                b: operands[1],
                skip: operands[2],
            },
            op::ELSE => Instruction::ElseJump { skip: operands[0] },
            op::END_OF_PROGRAM => Instruction::EndOfProgram,
            _ => unreachable!("width table covers all assigned opcodes"),
        };

        Ok(Decoded {
            insn,
            next_pc: pc + width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_advances_by_fixed_width() {
        let program = [opcodes::SET_VARIABLE_TO_LITERAL, 3, 0x34, 0x12];
        let decoded = Instruction::decode(&program, 0).unwrap();
        assert_eq!(
            decoded.insn,
            Instruction::SetWordLiteral {
                addr: 3,
                value: 0x1234
            }
        );
        assert_eq!(decoded.next_pc, 4);
    }

    #[test]
    fn unassigned_opcode_is_fatal() {
        let program = [0xFE];
        let err = Instruction::decode(&program, 0).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::InvalidOpcode {
                opcode: 0xFE,
                pc: 0
            }
        );
    }

    #[test]
    fn truncated_operands_are_fatal() {
        let program = [opcodes::IF_VARIABLE_LES_LITERAL, 1, 2];
        let err = Instruction::decode(&program, 0).unwrap_err();
        assert_eq!(err, RuntimeError::TruncatedProgram { pc: 0 });
    }
}
