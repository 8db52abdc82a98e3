//! Engine timing telemetry.

#![allow(missing_docs)]

use std::time::Duration;

/// Per-scan processing time statistics.
#[derive(Debug, Clone, Copy)]
pub struct ScanStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub last_ms: f64,
    samples: u64,
}

impl ScanStats {
    pub fn record(&mut self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        self.last_ms = ms;
        if self.samples == 0 {
            self.min_ms = ms;
            self.max_ms = ms;
            self.avg_ms = ms;
        } else {
            if ms < self.min_ms {
                self.min_ms = ms;
            }
            if ms > self.max_ms {
                self.max_ms = ms;
            }
            let total = self.avg_ms * self.samples as f64 + ms;
            self.avg_ms = total / (self.samples as f64 + 1.0);
        }
        self.samples = self.samples.saturating_add(1);
    }

    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self {
            min_ms: 0.0,
            max_ms: 0.0,
            avg_ms: 0.0,
            last_ms: 0.0,
            samples: 0,
        }
    }
}

/// Counters and timing telemetry exposed by the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineMetrics {
    pub scan: ScanStats,
    /// Scans executed since the engine was created.
    pub scans: u64,
    /// Fatal interpreter faults.
    pub faults: u64,
    /// Cycle periods dropped after the catch-up cap was exhausted.
    pub dropped_cycles: u64,
}

impl EngineMetrics {
    pub fn record_scan(&mut self, duration: Duration) {
        self.scans = self.scans.saturating_add(1);
        self.scan.record(duration);
    }

    pub fn record_fault(&mut self) {
        self.faults = self.faults.saturating_add(1);
    }

    pub fn record_dropped(&mut self, missed: u64) {
        self.dropped_cycles = self.dropped_cycles.saturating_add(missed);
    }
}
