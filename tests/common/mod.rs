#![allow(dead_code)]

use ladder_runtime::io::DiagnosticSink;
use ladder_runtime::Engine;

/// I/O point type codes as emitted by the host compiler.
pub const DIG_INPUT: i32 = 7;
pub const DIG_OUTPUT: i32 = 8;
pub const READ_ADC: i32 = 9;
pub const PWM_OUTPUT: i32 = 10;
pub const MODBUS_CONTACT: i32 = 11;
pub const MODBUS_COIL: i32 = 12;
pub const MODBUS_HREG: i32 = 13;

/// One descriptor line of the `$$IO` section.
#[derive(Debug, Clone, Copy)]
pub struct IoLine {
    pub addr: usize,
    pub kind: i32,
    pub pin: u8,
    pub slave: u8,
    pub offset: u16,
}

pub fn point(addr: usize, kind: i32, pin: u8) -> IoLine {
    IoLine {
        addr,
        kind,
        pin,
        slave: 0,
        offset: 0,
    }
}

pub fn modbus_point(addr: usize, kind: i32, offset: u16) -> IoLine {
    IoLine {
        addr,
        kind,
        pin: 0,
        slave: 1,
        offset,
    }
}

pub fn hex_line(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Run the full download protocol against the engine.
pub fn download(engine: &mut Engine, code: &[u8], io: &[IoLine], total_io: usize, cycle_us: u64) {
    engine.load_line(&format!("$$LDcode {}", code.len()));
    for chunk in code.chunks(16) {
        engine.load_line(&hex_line(chunk));
    }
    engine.load_line(&format!("$$IO {} {total_io}", io.len()));
    for line in io {
        engine.load_line(&format!(
            "{} P{} {} {} {} {}",
            line.addr, line.addr, line.kind, line.pin, line.slave, line.offset
        ));
    }
    engine.load_line(&format!("$$cycle {cycle_us} us"));
}

/// Diagnostics sink collecting reported text for assertions.
#[derive(Debug, Default)]
pub struct DiagLog {
    pub messages: Vec<String>,
}

impl DiagnosticSink for DiagLog {
    fn report(&mut self, text: &str) {
        self.messages.push(text.to_owned());
    }
}
