//! Recording I/O doubles for development and tests.

use std::collections::HashMap;

use crate::error::RuntimeError;
use crate::io::{ModbusBank, PinDriver};

/// What a [`RecordingPins`] driver saw on its output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEvent {
    Digital { pin: u8, value: bool },
    Pwm { pin: u8, duty: i16 },
}

/// Pin driver that records every write and serves scripted input levels.
#[derive(Debug, Default)]
pub struct RecordingPins {
    digital_levels: HashMap<u8, bool>,
    analog_levels: HashMap<u8, i16>,
    writes: Vec<PinEvent>,
}

impl RecordingPins {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the level a digital input pin will read.
    pub fn set_digital(&mut self, pin: u8, value: bool) {
        self.digital_levels.insert(pin, value);
    }

    /// Script the sample an analog input pin will read.
    pub fn set_analog(&mut self, pin: u8, value: i16) {
        self.analog_levels.insert(pin, value);
    }

    /// All writes issued so far, in order.
    #[must_use]
    pub fn writes(&self) -> &[PinEvent] {
        &self.writes
    }

    /// Number of writes that hit a given pin.
    #[must_use]
    pub fn write_count(&self, pin: u8) -> usize {
        self.writes
            .iter()
            .filter(|event| match event {
                PinEvent::Digital { pin: p, .. } | PinEvent::Pwm { pin: p, .. } => *p == pin,
            })
            .count()
    }
}

impl PinDriver for RecordingPins {
    fn digital_write(&mut self, pin: u8, value: bool) -> Result<(), RuntimeError> {
        self.writes.push(PinEvent::Digital { pin, value });
        Ok(())
    }

    fn digital_read(&mut self, pin: u8) -> Result<bool, RuntimeError> {
        Ok(self.digital_levels.get(&pin).copied().unwrap_or(false))
    }

    fn pwm_write(&mut self, pin: u8, duty: i16) -> Result<(), RuntimeError> {
        self.writes.push(PinEvent::Pwm { pin, duty });
        Ok(())
    }

    fn analog_read(&mut self, pin: u8) -> Result<i16, RuntimeError> {
        Ok(self.analog_levels.get(&pin).copied().unwrap_or(0))
    }
}

/// In-memory Modbus register bank recording registrations and traffic.
#[derive(Debug, Default)]
pub struct MemoryModbus {
    coils: HashMap<u16, bool>,
    hregs: HashMap<u16, i16>,
    registered_coils: Vec<u16>,
    registered_discrete: Vec<u16>,
    registered_hregs: Vec<u16>,
    coil_writes: usize,
    hreg_writes: usize,
}

impl MemoryModbus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a coil value before a scan.
    pub fn set_coil(&mut self, offset: u16, value: bool) {
        self.coils.insert(offset, value);
    }

    /// Seed a holding register value before a scan.
    pub fn set_hreg(&mut self, offset: u16, value: i16) {
        self.hregs.insert(offset, value);
    }

    #[must_use]
    pub fn coil(&self, offset: u16) -> bool {
        self.coils.get(&offset).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn hreg(&self, offset: u16) -> i16 {
        self.hregs.get(&offset).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn registered_coils(&self) -> &[u16] {
        &self.registered_coils
    }

    #[must_use]
    pub fn registered_discrete_inputs(&self) -> &[u16] {
        &self.registered_discrete
    }

    #[must_use]
    pub fn registered_holding_registers(&self) -> &[u16] {
        &self.registered_hregs
    }

    #[must_use]
    pub fn coil_write_count(&self) -> usize {
        self.coil_writes
    }

    #[must_use]
    pub fn hreg_write_count(&self) -> usize {
        self.hreg_writes
    }
}

impl ModbusBank for MemoryModbus {
    fn add_coil(&mut self, offset: u16) -> Result<(), RuntimeError> {
        self.registered_coils.push(offset);
        self.coils.entry(offset).or_insert(false);
        Ok(())
    }

    fn add_discrete_input(&mut self, offset: u16) -> Result<(), RuntimeError> {
        self.registered_discrete.push(offset);
        Ok(())
    }

    fn add_holding_register(&mut self, offset: u16) -> Result<(), RuntimeError> {
        self.registered_hregs.push(offset);
        self.hregs.entry(offset).or_insert(0);
        Ok(())
    }

    fn coil_write(&mut self, offset: u16, value: bool) -> Result<(), RuntimeError> {
        self.coil_writes += 1;
        self.coils.insert(offset, value);
        Ok(())
    }

    fn coil_read(&mut self, offset: u16) -> Result<bool, RuntimeError> {
        Ok(self.coil(offset))
    }

    fn hreg_write(&mut self, offset: u16, value: i16) -> Result<(), RuntimeError> {
        self.hreg_writes += 1;
        self.hregs.insert(offset, value);
        Ok(())
    }

    fn hreg_read(&mut self, offset: u16) -> Result<i16, RuntimeError> {
        Ok(self.hreg(offset))
    }
}
