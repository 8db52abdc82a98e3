mod common;

use std::time::Duration;

use common::download;
use ladder_runtime::bytecode::opcodes as op;
use ladder_runtime::clock::ManualClock;
use ladder_runtime::error::RuntimeError;
use ladder_runtime::io::NullPins;
use ladder_runtime::Engine;

fn engine_at_zero(clock: &ManualClock) -> Engine {
    Engine::new(Box::new(NullPins)).with_clock(Box::new(clock.clone()))
}

#[test]
fn first_tick_only_records_the_start_time() {
    let clock = ManualClock::new();
    let mut engine = engine_at_zero(&clock);
    download(&mut engine, &[op::END_OF_PROGRAM], &[], 0, 10_000);

    clock.advance(Duration::from_millis(25));
    engine.tick();
    assert_eq!(engine.metrics().scans, 0);

    clock.advance(Duration::from_millis(11));
    engine.tick();
    assert_eq!(engine.metrics().scans, 1);
}

#[test]
fn catch_up_advances_the_virtual_clock_one_period_per_scan() {
    let clock = ManualClock::new();
    let mut engine = engine_at_zero(&clock);
    download(&mut engine, &[op::END_OF_PROGRAM], &[], 0, 10_000);

    engine.tick(); // records t=0
    clock.advance(Duration::from_millis(45));
    engine.tick();
    // 45ms of backlog at 10ms per cycle: exactly 4 scans.
    assert_eq!(engine.metrics().scans, 4);
    assert_eq!(engine.metrics().dropped_cycles, 0);

    // The recorded tick time advanced to 40ms, not 45ms: at t=51 one more
    // cycle is due.
    clock.advance(Duration::from_millis(6));
    engine.tick();
    assert_eq!(engine.metrics().scans, 5);
}

#[test]
fn backlog_past_the_cap_is_dropped_silently() {
    let clock = ManualClock::new();
    let mut engine = engine_at_zero(&clock);
    download(&mut engine, &[op::END_OF_PROGRAM], &[], 0, 10_000);

    engine.tick();
    clock.advance(Duration::from_millis(500));
    engine.tick();
    assert_eq!(engine.metrics().scans, 10);
    // Virtual clock sits at 100ms after ten scans; periods up to 490ms are
    // shed, leaving the engine one cycle behind.
    assert_eq!(engine.metrics().dropped_cycles, 39);
    assert!(engine.ready());

    clock.advance(Duration::from_millis(5));
    engine.tick();
    assert_eq!(engine.metrics().scans, 11);
    assert_eq!(engine.metrics().dropped_cycles, 39);
}

#[test]
fn scan_timing_telemetry_is_recorded_per_scan() {
    let clock = ManualClock::new();
    let mut engine = engine_at_zero(&clock);
    download(&mut engine, &[op::END_OF_PROGRAM], &[], 0, 10_000);

    engine.tick();
    clock.advance(Duration::from_millis(21));
    engine.tick();
    assert_eq!(engine.metrics().scan.samples(), 2);
    // The manual clock does not move during a scan.
    assert_eq!(engine.processing_time(), Duration::ZERO);
}

#[test]
fn fault_during_tick_stops_cycling_until_reload() {
    let clock = ManualClock::new();
    let mut engine = engine_at_zero(&clock);
    download(&mut engine, &[0xFE], &[], 0, 10_000);

    engine.tick();
    clock.advance(Duration::from_millis(45));
    engine.tick();
    assert!(!engine.ready());
    assert_eq!(engine.metrics().faults, 1);
    assert!(matches!(
        engine.last_fault(),
        Some(RuntimeError::InvalidOpcode { opcode: 0xFE, .. })
    ));

    // Further ticks do nothing while faulted.
    clock.advance(Duration::from_millis(100));
    engine.tick();
    assert_eq!(engine.metrics().faults, 1);
    assert_eq!(engine.metrics().scans, 1);

    // A complete download restores cycling.
    download(&mut engine, &[op::END_OF_PROGRAM], &[], 0, 10_000);
    assert!(engine.ready());
    clock.advance(Duration::from_millis(11));
    engine.tick();
    assert!(engine.metrics().scans > 1);
}

#[test]
fn no_program_means_no_scans() {
    let clock = ManualClock::new();
    let mut engine = engine_at_zero(&clock);

    engine.tick();
    clock.advance(Duration::from_millis(100));
    engine.tick();
    assert_eq!(engine.metrics().scans, 0);
    assert_eq!(engine.run_one_scan().unwrap_err(), RuntimeError::NotReady);
}

#[test]
fn clear_program_resets_the_engine() {
    let clock = ManualClock::new();
    let mut engine = engine_at_zero(&clock);
    download(&mut engine, &[op::END_OF_PROGRAM], &[], 2, 10_000);
    assert!(engine.ready());

    engine.clear_program();
    assert!(!engine.ready());
    assert!(engine.program().is_empty());
    assert!(engine.io().is_empty());
    assert_eq!(engine.cycle_interval(), Duration::ZERO);
}
