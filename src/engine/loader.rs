//! Line-oriented program download protocol.
//!
//! The host compiler streams the program as text:
//!
//! ```text
//! $$LDcode <byte_count>
//! <hex byte pairs, one or more lines>
//! $$IO <named_io_count> <total_io_count>
//! <addr> <name> <type> <pin> <modbus_slave> <modbus_offset>
//! $$cycle <microseconds> us
//! ```
//!
//! Parsing is deliberately best-effort: malformed numbers read as zero,
//! out-of-range addresses are dropped, lines missing a required field are
//! skipped. A corrupt program is only caught later, by the interpreter's
//! opcode check.

use std::time::Duration;

use tracing::{debug, warn};

use super::Engine;
use crate::io::IoKind;

/// Maximum buffered line length for character-at-a-time feeding.
/// Characters beyond the cap are silently dropped.
pub const MAX_LINE_LEN: usize = 128;

/// Download protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderState {
    /// Nothing received yet.
    #[default]
    Init,
    /// Receiving bytecode hex lines.
    Code,
    /// Receiving I/O point descriptor lines.
    Io,
    /// Receiving the cycle configuration.
    CycleConfig,
}

#[derive(Debug, Default)]
pub(super) struct Loader {
    state: LoaderState,
    line: Vec<u8>,
    cursor: usize,
}

impl Loader {
    pub(super) fn new() -> Self {
        Self::default()
    }
}

impl Engine {
    /// Current download protocol state.
    #[must_use]
    pub fn loader_state(&self) -> LoaderState {
        self.loader.state
    }

    /// Feed one character of program text, flushing on newline.
    pub fn feed_char(&mut self, c: u8) {
        if self.loader.line.len() < MAX_LINE_LEN {
            self.loader.line.push(c);
        }
        if c == b'\n' && !self.loader.line.is_empty() {
            let line = std::mem::take(&mut self.loader.line);
            let line = String::from_utf8_lossy(&line).into_owned();
            self.load_line(&line);
        }
    }

    /// Feed a complete block of program text.
    pub fn load_text(&mut self, text: &str) {
        for c in text.bytes() {
            self.feed_char(c);
        }
    }

    /// Process one line of program text.
    ///
    /// The line is truncated at the first carriage return or newline. Section
    /// markers switch state regardless of the current one and may appear
    /// anywhere in the stream.
    pub fn load_line(&mut self, line: &str) {
        let line = line.split(['\r', '\n']).next().unwrap_or("");

        if line.contains("$$LDcode") {
            self.loader.state = LoaderState::Code;
        } else if line.contains("$$IO") {
            self.loader.state = LoaderState::Io;
        } else if line.contains("$$cycle") {
            self.loader.state = LoaderState::CycleConfig;
        }

        match self.loader.state {
            LoaderState::Init => {}
            LoaderState::Code => self.load_code_line(line),
            LoaderState::Io => self.load_io_line(line),
            LoaderState::CycleConfig => self.load_cycle_line(line),
        }
    }

    fn load_code_line(&mut self, line: &str) {
        if line.starts_with('$') {
            // $$LDcode program_size
            let Some(size) = line.split_whitespace().nth(1) else {
                return;
            };
            let size = atoi(size).max(0) as usize;
            self.program = vec![0; size];
            self.loader.cursor = 0;
            self.ready = false;
            debug!("program size {size}");
            return;
        }

        let bytes = line.as_bytes();
        let mut i = 0;
        // Decoding stops at the first pair containing a control character;
        // that is the hex line terminator, not an error.
        while i + 1 < bytes.len() && bytes[i] >= 32 && bytes[i + 1] >= 32 {
            let byte = (hex_digit(bytes[i]) << 4) | hex_digit(bytes[i + 1]);
            if self.loader.cursor < self.program.len() {
                self.program[self.loader.cursor] = byte;
                self.loader.cursor += 1;
            }
            i += 2;
        }
    }

    fn load_io_line(&mut self, line: &str) {
        if line.starts_with('$') {
            // $$IO nb_named_IO total_nb_IO
            let Some(total) = line.split_whitespace().nth(2) else {
                return;
            };
            let total = atoi(total).max(0) as usize;
            self.io.reset(total);
            self.ready = false;
            debug!("io table size {total}");
            return;
        }

        // <addr> <name> <type> <pin> <modbus_slave> <modbus_offset>
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            return;
        }
        let addr = atoi(fields[0]);
        if addr < 0 || addr as usize >= self.io.len() {
            return;
        }
        self.io.set_mapping(
            addr as usize,
            IoKind::from_code(atoi(fields[2]) as i32),
            atoi(fields[3]) as u8,
            atoi(fields[4]) as u8,
            atoi(fields[5]) as u16,
        );
    }

    fn load_cycle_line(&mut self, line: &str) {
        if !line.starts_with('$') {
            return;
        }
        // $$cycle 10000 us -- period in microseconds at a fixed offset,
        // truncated to whole milliseconds.
        let micros = atoi(line.get(7..).unwrap_or("")).max(0) as u64;
        self.cycle = Duration::from_millis(micros / 1000);

        if let Some(bank) = self.modbus.as_deref_mut() {
            // A bank that refuses a registration leaves the engine not-ready;
            // only the next complete download retries.
            if let Err(err) = self.io.register_modbus(bank) {
                self.diag.report(&format!("modbus registration failed: {err}"));
                warn!("modbus registration failed: {err}");
                self.last_fault = Some(err);
                return;
            }
        }
        self.ready = true;
        self.last_fault = None;
        let cycle_ms = self.cycle.as_millis();
        self.diag
            .report(&format!("program ready, cycle time {cycle_ms} ms"));
        debug!("program ready, cycle time {cycle_ms} ms");
    }
}

/// C `atoi` semantics: skip leading whitespace, parse an optional sign and
/// leading digits, and yield 0 for anything unparsable.
fn atoi(text: &str) -> i64 {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let mut value: i64 = 0;
    for c in digits.chars() {
        let Some(d) = c.to_digit(10) else {
            break;
        };
        value = value.saturating_mul(10).saturating_add(i64::from(d));
    }
    sign * value
}

fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => 10 + (c - b'a'),
        b'A'..=b'F' => 10 + (c - b'A'),
        _ => 0,
    }
}
