//! Bytecode interpreter: one ladder scan per call.

use super::Engine;
use crate::bytecode::{Decoded, Instruction};
use crate::error::RuntimeError;

impl Engine {
    /// Execute the program from pc 0 until the end-of-program opcode.
    ///
    /// Decode failures (unknown opcode, truncated operands) and driver
    /// errors propagate; the caller latches them as a fatal fault.
    pub(super) fn interpret_one_cycle(&mut self) -> Result<(), RuntimeError> {
        let mut pc = 0;
        loop {
            let Decoded { insn, next_pc } = Instruction::decode(&self.program, pc)?;
            pc = next_pc;
            match insn {
                Instruction::SetBit { addr } => self.write_bit(addr, true)?,
                Instruction::ClearBit { addr } => self.write_bit(addr, false)?,
                Instruction::CopyBit { dst, src } => {
                    let value = self.read_bit(src)?;
                    self.write_bit(dst, value)?;
                }
                Instruction::SetWordLiteral { addr, value } => self.write_word(addr, value)?,
                Instruction::SetWordFromWord { dst, src } => {
                    let value = self.read_word(src)?;
                    self.write_word(dst, value)?;
                }
                Instruction::IncrementWord { addr } => {
                    let value = self.read_word(addr)?.wrapping_add(1);
                    self.write_word(addr, value)?;
                }
                Instruction::Add { dst, a, b } => {
                    let value = self.read_word(a)?.wrapping_add(self.read_word(b)?);
                    self.write_word(dst, value)?;
                }
                Instruction::Sub { dst, a, b } => {
                    let value = self.read_word(a)?.wrapping_sub(self.read_word(b)?);
                    self.write_word(dst, value)?;
                }
                Instruction::Mul { dst, a, b } => {
                    let value = self.read_word(a)?.wrapping_mul(self.read_word(b)?);
                    self.write_word(dst, value)?;
                }
                Instruction::Div { dst, a, b } => {
                    // Division by zero leaves the destination untouched.
                    let divisor = self.read_word(b)?;
                    if divisor != 0 {
                        let value = self.read_word(a)?.wrapping_div(divisor);
                        self.write_word(dst, value)?;
                    }
                }
                Instruction::ReadAdc { addr } => {
                    self.io.read_adc(addr, self.pins.as_mut())?;
                }
                Instruction::SetPwm { addr } => {
                    self.io.write_pwm(addr, self.pins.as_mut())?;
                }
                Instruction::IfBitSet { addr, skip } => {
                    if !self.read_bit(addr)? {
                        pc += skip as usize;
                    }
                }
                Instruction::IfBitClear { addr, skip } => {
                    if self.read_bit(addr)? {
                        pc += skip as usize;
                    }
                }
                Instruction::IfWordLessLiteral {
                    addr,
                    literal,
                    skip,
                } => {
                    if self.read_word(addr)? >= literal {
                        pc += skip as usize;
                    }
                }
                Instruction::IfWordEqWord { a, b, skip } => {
                    if self.read_word(a)? != self.read_word(b)? {
                        pc += skip as usize;
                    }
                }
                Instruction::IfWordGtWord { a, b, skip } => {
                    if self.read_word(a)? <= self.read_word(b)? {
                        pc += skip as usize;
                    }
                }
                Instruction::ElseJump { skip } => pc += skip as usize,
                Instruction::EndOfProgram => return Ok(()),
            }
        }
    }

    fn write_bit(&mut self, addr: u8, value: bool) -> Result<(), RuntimeError> {
        self.io
            .write_bit(addr, value, self.pins.as_mut(), self.modbus.as_deref_mut())
    }

    fn read_bit(&mut self, addr: u8) -> Result<bool, RuntimeError> {
        self.io
            .read_bit(addr, self.pins.as_mut(), self.modbus.as_deref_mut())
    }

    fn write_word(&mut self, addr: u8, value: i16) -> Result<(), RuntimeError> {
        self.io.write_word(addr, value, self.modbus.as_deref_mut())
    }

    fn read_word(&mut self, addr: u8) -> Result<i16, RuntimeError> {
        self.io.read_word(addr, self.modbus.as_deref_mut())
    }
}
