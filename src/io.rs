//! Logical I/O points and hardware driver interfaces.
//!
//! Every bytecode address names one [`IoPoint`] mapped to a physical pin or a
//! remote Modbus register. Reads and writes go through the point's cached
//! value: a physical write is issued only when the new value differs from the
//! cache, and a physical read refreshes the cache before returning it.

#![allow(missing_docs)]

mod loopback;
pub use loopback::{MemoryModbus, PinEvent, RecordingPins};

use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::error::RuntimeError;

/// Physical pin access consumed by the interpreter.
///
/// Implementations wrap the platform GPIO/ADC/PWM primitives. The engine only
/// ever touches pins through this trait, so tests substitute a recorder. A
/// driver error during a scan latches as a fatal engine fault.
pub trait PinDriver {
    /// Drive a digital output pin.
    fn digital_write(&mut self, pin: u8, value: bool) -> Result<(), RuntimeError>;

    /// Sample a digital input pin.
    fn digital_read(&mut self, pin: u8) -> Result<bool, RuntimeError>;

    /// Emit a PWM duty cycle on a pin.
    fn pwm_write(&mut self, pin: u8, duty: i16) -> Result<(), RuntimeError>;

    /// Sample an analog input pin.
    fn analog_read(&mut self, pin: u8) -> Result<i16, RuntimeError>;
}

/// No-op pin driver: outputs vanish, inputs read low/zero.
#[derive(Debug, Default)]
pub struct NullPins;

impl PinDriver for NullPins {
    fn digital_write(&mut self, _pin: u8, _value: bool) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn digital_read(&mut self, _pin: u8) -> Result<bool, RuntimeError> {
        Ok(false)
    }

    fn pwm_write(&mut self, _pin: u8, _duty: i16) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn analog_read(&mut self, _pin: u8) -> Result<i16, RuntimeError> {
        Ok(0)
    }
}

/// Modbus register server consumed by the engine.
///
/// The engine registers every mapped point once at load completion and then
/// reads/writes registers during scans. The wire protocol lives behind this
/// trait; when no bank is attached every Modbus access is a safe no-op.
pub trait ModbusBank {
    fn add_coil(&mut self, offset: u16) -> Result<(), RuntimeError>;
    fn add_discrete_input(&mut self, offset: u16) -> Result<(), RuntimeError>;
    fn add_holding_register(&mut self, offset: u16) -> Result<(), RuntimeError>;

    fn coil_write(&mut self, offset: u16, value: bool) -> Result<(), RuntimeError>;
    fn coil_read(&mut self, offset: u16) -> Result<bool, RuntimeError>;
    fn hreg_write(&mut self, offset: u16, value: i16) -> Result<(), RuntimeError>;
    fn hreg_read(&mut self, offset: u16) -> Result<i16, RuntimeError>;
}

/// Free-form status/fault text sink (serial console on firmware builds).
///
/// Observability only: engine behavior does not depend on what the sink does.
pub trait DiagnosticSink {
    fn report(&mut self, text: &str);
}

/// Discards all diagnostics.
#[derive(Debug, Default)]
pub struct NullDiagnostics;

impl DiagnosticSink for NullDiagnostics {
    fn report(&mut self, _text: &str) {}
}

// Shared-handle impls: drivers are moved into the engine as boxed trait
// objects, so callers that also need to observe them keep an Arc<Mutex<..>>
// clone on the outside.
impl<T: PinDriver> PinDriver for Arc<Mutex<T>> {
    fn digital_write(&mut self, pin: u8, value: bool) -> Result<(), RuntimeError> {
        self.lock().expect("pin driver lock poisoned").digital_write(pin, value)
    }

    fn digital_read(&mut self, pin: u8) -> Result<bool, RuntimeError> {
        self.lock().expect("pin driver lock poisoned").digital_read(pin)
    }

    fn pwm_write(&mut self, pin: u8, duty: i16) -> Result<(), RuntimeError> {
        self.lock().expect("pin driver lock poisoned").pwm_write(pin, duty)
    }

    fn analog_read(&mut self, pin: u8) -> Result<i16, RuntimeError> {
        self.lock().expect("pin driver lock poisoned").analog_read(pin)
    }
}

impl<T: ModbusBank> ModbusBank for Arc<Mutex<T>> {
    fn add_coil(&mut self, offset: u16) -> Result<(), RuntimeError> {
        self.lock().expect("modbus lock poisoned").add_coil(offset)
    }

    fn add_discrete_input(&mut self, offset: u16) -> Result<(), RuntimeError> {
        self.lock().expect("modbus lock poisoned").add_discrete_input(offset)
    }

    fn add_holding_register(&mut self, offset: u16) -> Result<(), RuntimeError> {
        self.lock()
            .expect("modbus lock poisoned")
            .add_holding_register(offset)
    }

    fn coil_write(&mut self, offset: u16, value: bool) -> Result<(), RuntimeError> {
        self.lock().expect("modbus lock poisoned").coil_write(offset, value)
    }

    fn coil_read(&mut self, offset: u16) -> Result<bool, RuntimeError> {
        self.lock().expect("modbus lock poisoned").coil_read(offset)
    }

    fn hreg_write(&mut self, offset: u16, value: i16) -> Result<(), RuntimeError> {
        self.lock().expect("modbus lock poisoned").hreg_write(offset, value)
    }

    fn hreg_read(&mut self, offset: u16) -> Result<i16, RuntimeError> {
        self.lock().expect("modbus lock poisoned").hreg_read(offset)
    }
}

impl<T: DiagnosticSink> DiagnosticSink for Arc<Mutex<T>> {
    fn report(&mut self, text: &str) {
        self.lock().expect("diagnostics lock poisoned").report(text);
    }
}

/// Point mapping kind, integer-coded in the download protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoKind {
    /// Unmapped or unknown code: value lives in the cache only.
    #[default]
    Pending,
    DigitalInput,
    DigitalOutput,
    ReadAdc,
    PwmOutput,
    ModbusContact,
    ModbusCoil,
    ModbusHreg,
}

impl IoKind {
    /// Map a protocol type code. Unknown codes become [`IoKind::Pending`].
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            7 => Self::DigitalInput,
            8 => Self::DigitalOutput,
            9 => Self::ReadAdc,
            10 => Self::PwmOutput,
            11 => Self::ModbusContact,
            12 => Self::ModbusCoil,
            13 => Self::ModbusHreg,
            _ => Self::Pending,
        }
    }
}

/// One logical I/O point.
///
/// The bit and word caches are separate on purpose: the same address may be
/// driven as a bit or a word depending on bytecode context, and sharing one
/// storage field invites cross-interpretation bugs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IoPoint {
    pub kind: IoKind,
    pub pin: u8,
    pub modbus_slave: u8,
    pub modbus_offset: u16,
    bit: bool,
    word: i16,
}

impl IoPoint {
    #[must_use]
    pub fn bit(&self) -> bool {
        self.bit
    }

    #[must_use]
    pub fn word(&self) -> i16 {
        self.word
    }
}

/// Fixed-size table of logical I/O points, re-allocated per program load.
#[derive(Debug, Default)]
pub struct IoTable {
    points: Vec<IoPoint>,
}

impl IoTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table with `len` zeroed points.
    pub fn reset(&mut self, len: usize) {
        self.points = vec![IoPoint::default(); len];
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn point(&self, addr: u8) -> Option<&IoPoint> {
        self.points.get(addr as usize)
    }

    /// Install the mapping for one point. Out-of-range addresses are ignored.
    pub fn set_mapping(&mut self, addr: usize, kind: IoKind, pin: u8, slave: u8, offset: u16) {
        let Some(point) = self.points.get_mut(addr) else {
            return;
        };
        point.kind = kind;
        point.pin = pin;
        point.modbus_slave = slave;
        point.modbus_offset = offset;
    }

    /// Register every Modbus-mapped point with the bank.
    pub fn register_modbus(&self, bank: &mut dyn ModbusBank) -> Result<(), RuntimeError> {
        for point in &self.points {
            match point.kind {
                IoKind::ModbusCoil => bank.add_coil(point.modbus_offset)?,
                IoKind::ModbusContact => bank.add_discrete_input(point.modbus_offset)?,
                IoKind::ModbusHreg => bank.add_holding_register(point.modbus_offset)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Write a bit value, issuing the physical/remote write only on change.
    pub fn write_bit(
        &mut self,
        addr: u8,
        value: bool,
        pins: &mut dyn PinDriver,
        mut modbus: Option<&mut (dyn ModbusBank + '_)>,
    ) -> Result<(), RuntimeError> {
        let Some(point) = self.points.get_mut(addr as usize) else {
            return Ok(());
        };
        if point.bit == value {
            return Ok(());
        }
        match point.kind {
            IoKind::DigitalOutput => pins.digital_write(point.pin, value)?,
            IoKind::ModbusCoil => {
                if let Some(bank) = modbus.as_deref_mut() {
                    bank.coil_write(point.modbus_offset, value)?;
                }
            }
            _ => {}
        }
        point.bit = value;
        trace!("write bit[{addr}] {value}");
        Ok(())
    }

    /// Read a bit value, refreshing the cache from hardware first.
    pub fn read_bit(
        &mut self,
        addr: u8,
        pins: &mut dyn PinDriver,
        mut modbus: Option<&mut (dyn ModbusBank + '_)>,
    ) -> Result<bool, RuntimeError> {
        let Some(point) = self.points.get_mut(addr as usize) else {
            return Ok(false);
        };
        match point.kind {
            IoKind::DigitalInput => point.bit = pins.digital_read(point.pin)?,
            IoKind::ModbusCoil => {
                if let Some(bank) = modbus.as_deref_mut() {
                    point.bit = bank.coil_read(point.modbus_offset)?;
                }
            }
            _ => {}
        }
        trace!("read  bit[{addr}] {}", point.bit);
        Ok(point.bit)
    }

    /// Write a word value, issuing the remote write only on change.
    ///
    /// Non-Modbus kinds update the cache only; PWM and ADC addresses are
    /// consumed by their dedicated instructions.
    pub fn write_word(
        &mut self,
        addr: u8,
        value: i16,
        mut modbus: Option<&mut (dyn ModbusBank + '_)>,
    ) -> Result<(), RuntimeError> {
        let Some(point) = self.points.get_mut(addr as usize) else {
            return Ok(());
        };
        if point.word == value {
            return Ok(());
        }
        if point.kind == IoKind::ModbusHreg {
            if let Some(bank) = modbus.as_deref_mut() {
                bank.hreg_write(point.modbus_offset, value)?;
            }
        }
        point.word = value;
        trace!("write word[{addr}] {value}");
        Ok(())
    }

    /// Read a word value, refreshing the cache from the register bank first.
    pub fn read_word(
        &mut self,
        addr: u8,
        mut modbus: Option<&mut (dyn ModbusBank + '_)>,
    ) -> Result<i16, RuntimeError> {
        let Some(point) = self.points.get_mut(addr as usize) else {
            return Ok(0);
        };
        if point.kind == IoKind::ModbusHreg {
            if let Some(bank) = modbus.as_deref_mut() {
                point.word = bank.hreg_read(point.modbus_offset)?;
            }
        }
        trace!("read  word[{addr}] {}", point.word);
        Ok(point.word)
    }

    /// Emit the cached word of `addr` as a PWM duty cycle on its pin.
    pub fn write_pwm(&mut self, addr: u8, pins: &mut dyn PinDriver) -> Result<(), RuntimeError> {
        let Some(point) = self.points.get(addr as usize) else {
            return Ok(());
        };
        pins.pwm_write(point.pin, point.word)
    }

    /// Sample the mapped analog pin into the cached word of `addr`.
    pub fn read_adc(&mut self, addr: u8, pins: &mut dyn PinDriver) -> Result<(), RuntimeError> {
        let Some(point) = self.points.get_mut(addr as usize) else {
            return Ok(());
        };
        point.word = pins.analog_read(point.pin)?;
        Ok(())
    }
}
