//! The ladder engine: program storage, cyclic scheduler, public API.

use std::time::Duration;

use tracing::warn;

use crate::clock::{Clock, StdClock};
use crate::error::RuntimeError;
use crate::io::{DiagnosticSink, IoTable, ModbusBank, NullDiagnostics, PinDriver};
use crate::metrics::EngineMetrics;

mod loader;
mod scan;

pub use loader::{LoaderState, MAX_LINE_LEN};

/// Upper bound on catch-up scans executed in one tick.
///
/// Backlog beyond the cap is dropped, not deferred: a persistently slow scan
/// sheds cycles silently instead of starving the caller.
pub const CATCH_UP_LIMIT: u32 = 10;

/// Cyclic ladder logic engine.
///
/// Owns the compiled program, the I/O point table, and the download protocol
/// state. All hardware access goes through the injected drivers; with no
/// Modbus bank attached every Modbus-typed point degrades to its cache.
///
/// Single-threaded by design: callers must serialize loading against
/// [`Engine::tick`], loading mid-scan is unsupported.
pub struct Engine {
    clock: Box<dyn Clock>,
    pins: Box<dyn PinDriver>,
    modbus: Option<Box<dyn ModbusBank>>,
    diag: Box<dyn DiagnosticSink>,

    program: Vec<u8>,
    io: IoTable,
    loader: loader::Loader,

    ready: bool,
    cycle: Duration,
    last_tick: Option<Duration>,
    processing_time: Duration,
    last_fault: Option<RuntimeError>,
    metrics: EngineMetrics,
}

impl Engine {
    /// Build an engine over the given pin driver, with no program loaded.
    #[must_use]
    pub fn new(pins: Box<dyn PinDriver>) -> Self {
        Self {
            clock: Box::new(StdClock::new()),
            pins,
            modbus: None,
            diag: Box::new(NullDiagnostics),
            program: Vec::new(),
            io: IoTable::new(),
            loader: loader::Loader::new(),
            ready: false,
            cycle: Duration::ZERO,
            last_tick: None,
            processing_time: Duration::ZERO,
            last_fault: None,
            metrics: EngineMetrics::default(),
        }
    }

    /// Replace the scheduling clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a Modbus register bank.
    #[must_use]
    pub fn with_modbus(mut self, modbus: Box<dyn ModbusBank>) -> Self {
        self.modbus = Some(modbus);
        self
    }

    /// Attach a diagnostics sink.
    #[must_use]
    pub fn with_diagnostics(mut self, diag: Box<dyn DiagnosticSink>) -> Self {
        self.diag = diag;
        self
    }

    /// Whether a complete program is loaded and runnable.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.ready
    }

    /// Configured cycle period.
    #[must_use]
    pub fn cycle_interval(&self) -> Duration {
        self.cycle
    }

    /// Wall-clock duration of the most recent scan.
    #[must_use]
    pub fn processing_time(&self) -> Duration {
        self.processing_time
    }

    /// The fault that disabled the engine, if any.
    #[must_use]
    pub fn last_fault(&self) -> Option<&RuntimeError> {
        self.last_fault.as_ref()
    }

    /// Scan timing statistics and fault/drop counters.
    #[must_use]
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// The loaded bytecode program.
    #[must_use]
    pub fn program(&self) -> &[u8] {
        &self.program
    }

    /// The loaded I/O point table.
    #[must_use]
    pub fn io(&self) -> &IoTable {
        &self.io
    }

    /// Discard the loaded program and all loader state.
    pub fn clear_program(&mut self) {
        self.ready = false;
        self.loader = loader::Loader::new();
        self.program = Vec::new();
        self.io = IoTable::new();
        self.cycle = Duration::ZERO;
        self.last_tick = None;
        self.processing_time = Duration::ZERO;
        self.last_fault = None;
    }

    /// Execute one full scan immediately, outside the cyclic schedule.
    ///
    /// A fault latches exactly as it would during a tick: the engine goes
    /// not-ready until the next complete download.
    pub fn run_one_scan(&mut self) -> Result<(), RuntimeError> {
        if !self.ready {
            return Err(RuntimeError::NotReady);
        }
        self.scan_once()
    }

    /// Advance the cyclic scheduler from the engine clock.
    ///
    /// The first tick only records the start timestamp. Afterwards every tick
    /// runs up to [`CATCH_UP_LIMIT`] scans, each advancing the virtual tick
    /// time by exactly one cycle period; remaining backlog past the cap is
    /// dropped and counted in [`EngineMetrics::dropped_cycles`].
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let Some(mut last) = self.last_tick else {
            self.last_tick = Some(now);
            return;
        };
        if self.cycle.is_zero() {
            return;
        }

        let mut budget = CATCH_UP_LIMIT;
        while self.ready && last + self.cycle < now && budget > 0 {
            let start = self.clock.now();
            let result = self.scan_once();
            self.processing_time = self.clock.now().saturating_sub(start);
            self.metrics.record_scan(self.processing_time);
            last += self.cycle;
            budget -= 1;
            if result.is_err() {
                break;
            }
        }

        if budget == 0 {
            let mut missed = 0u64;
            while last + self.cycle < now {
                last += self.cycle;
                missed += 1;
            }
            if missed > 0 {
                self.metrics.record_dropped(missed);
                warn!("scan overrun: dropped {missed} cycle(s)");
            }
        }
        self.last_tick = Some(last);
    }

    /// Run one scan, latching any fatal fault.
    fn scan_once(&mut self) -> Result<(), RuntimeError> {
        match self.interpret_one_cycle() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.ready = false;
                self.metrics.record_fault();
                self.diag.report(&format!("scan fault: {err}"));
                warn!("scan fault: {err}");
                self.last_fault = Some(err.clone());
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ready", &self.ready)
            .field("cycle", &self.cycle)
            .field("program_len", &self.program.len())
            .field("io_len", &self.io.len())
            .finish_non_exhaustive()
    }
}
