mod common;

use std::sync::{Arc, Mutex};

use common::{
    download, modbus_point, point, DIG_INPUT, DIG_OUTPUT, MODBUS_COIL, MODBUS_CONTACT, MODBUS_HREG,
};
use ladder_runtime::bytecode::opcodes as op;
use ladder_runtime::io::{MemoryModbus, NullPins, RecordingPins};
use ladder_runtime::Engine;

#[test]
fn write_on_change_issues_one_physical_write() {
    let pins = Arc::new(Mutex::new(RecordingPins::new()));
    let mut engine = Engine::new(Box::new(pins.clone()));
    let code = [op::SET_BIT, 0, op::SET_BIT, 0, op::END_OF_PROGRAM];
    download(&mut engine, &code, &[point(0, DIG_OUTPUT, 2)], 1, 10_000);

    engine.run_one_scan().unwrap();
    assert_eq!(pins.lock().unwrap().write_count(2), 1);

    // Same value next scan: still cached, no second write.
    engine.run_one_scan().unwrap();
    assert_eq!(pins.lock().unwrap().write_count(2), 1);
}

#[test]
fn changed_value_writes_again() {
    let pins = Arc::new(Mutex::new(RecordingPins::new()));
    let mut engine = Engine::new(Box::new(pins.clone()));
    let code = [op::SET_BIT, 0, op::CLEAR_BIT, 0, op::END_OF_PROGRAM];
    download(&mut engine, &code, &[point(0, DIG_OUTPUT, 2)], 1, 10_000);

    engine.run_one_scan().unwrap();
    assert_eq!(pins.lock().unwrap().write_count(2), 2);
}

#[test]
fn bit_read_refreshes_the_cache() {
    let pins = Arc::new(Mutex::new(RecordingPins::new()));
    let mut engine = Engine::new(Box::new(pins.clone()));
    let code = [op::COPY_BIT_TO_BIT, 1, 0, op::END_OF_PROGRAM];
    download(&mut engine, &code, &[point(0, DIG_INPUT, 5)], 2, 10_000);

    pins.lock().unwrap().set_digital(5, true);
    engine.run_one_scan().unwrap();
    assert!(engine.io().point(1).unwrap().bit());

    pins.lock().unwrap().set_digital(5, false);
    engine.run_one_scan().unwrap();
    assert!(!engine.io().point(1).unwrap().bit());
}

#[test]
fn cycle_config_registers_every_modbus_point() {
    let bank = Arc::new(Mutex::new(MemoryModbus::new()));
    let mut engine = Engine::new(Box::new(NullPins)).with_modbus(Box::new(bank.clone()));
    let io = [
        modbus_point(0, MODBUS_COIL, 5),
        modbus_point(1, MODBUS_CONTACT, 6),
        modbus_point(2, MODBUS_HREG, 7),
        point(3, DIG_INPUT, 2),
    ];
    download(&mut engine, &[op::END_OF_PROGRAM], &io, 4, 10_000);

    let bank = bank.lock().unwrap();
    assert_eq!(bank.registered_coils(), &[5]);
    assert_eq!(bank.registered_discrete_inputs(), &[6]);
    assert_eq!(bank.registered_holding_registers(), &[7]);
}

#[test]
fn holding_register_reads_come_from_the_bank() {
    let bank = Arc::new(Mutex::new(MemoryModbus::new()));
    let mut engine = Engine::new(Box::new(NullPins)).with_modbus(Box::new(bank.clone()));
    // w1 = w0 where point 0 is a holding register.
    let code = [op::SET_VARIABLE_TO_VARIABLE, 1, 0, op::END_OF_PROGRAM];
    download(
        &mut engine,
        &code,
        &[modbus_point(0, MODBUS_HREG, 7)],
        2,
        10_000,
    );
    bank.lock().unwrap().set_hreg(7, 1234);

    engine.run_one_scan().unwrap();
    assert_eq!(engine.io().point(1).unwrap().word(), 1234);
}

#[test]
fn holding_register_writes_are_write_on_change() {
    let bank = Arc::new(Mutex::new(MemoryModbus::new()));
    let mut engine = Engine::new(Box::new(NullPins)).with_modbus(Box::new(bank.clone()));
    let code = [
        op::SET_VARIABLE_TO_LITERAL,
        0,
        0xD2,
        0x04, // 1234
        op::SET_VARIABLE_TO_LITERAL,
        0,
        0xD2,
        0x04,
        op::END_OF_PROGRAM,
    ];
    download(
        &mut engine,
        &code,
        &[modbus_point(0, MODBUS_HREG, 7)],
        1,
        10_000,
    );

    engine.run_one_scan().unwrap();
    let bank = bank.lock().unwrap();
    assert_eq!(bank.hreg(7), 1234);
    assert_eq!(bank.hreg_write_count(), 1);
}

#[test]
fn coil_writes_reach_the_bank_once_per_change() {
    let bank = Arc::new(Mutex::new(MemoryModbus::new()));
    let mut engine = Engine::new(Box::new(NullPins)).with_modbus(Box::new(bank.clone()));
    let code = [op::SET_BIT, 0, op::SET_BIT, 0, op::END_OF_PROGRAM];
    download(
        &mut engine,
        &code,
        &[modbus_point(0, MODBUS_COIL, 3)],
        1,
        10_000,
    );

    engine.run_one_scan().unwrap();
    let bank = bank.lock().unwrap();
    assert!(bank.coil(3));
    assert_eq!(bank.coil_write_count(), 1);
}

#[test]
fn absent_modbus_degrades_to_cache_only() {
    let mut engine = Engine::new(Box::new(NullPins));
    // Write then read back a holding-register point with no bank attached.
    let code = [
        op::SET_VARIABLE_TO_LITERAL,
        0,
        7,
        0,
        op::SET_VARIABLE_TO_VARIABLE,
        1,
        0,
        op::COPY_BIT_TO_BIT,
        3,
        2,
        op::END_OF_PROGRAM,
    ];
    let io = [
        modbus_point(0, MODBUS_HREG, 7),
        modbus_point(2, MODBUS_COIL, 3),
    ];
    download(&mut engine, &code, &io, 4, 10_000);

    engine.run_one_scan().unwrap();
    // The cache carries the value; the coil reads false.
    assert_eq!(engine.io().point(1).unwrap().word(), 7);
    assert!(!engine.io().point(3).unwrap().bit());
}

#[test]
fn pending_points_are_pure_cache() {
    let mut engine = Engine::new(Box::new(NullPins));
    let code = [
        op::SET_BIT,
        0,
        op::SET_VARIABLE_TO_LITERAL,
        0,
        99,
        0,
        op::END_OF_PROGRAM,
    ];
    download(&mut engine, &code, &[], 1, 10_000);
    engine.run_one_scan().unwrap();
    // Bit and word caches are independent.
    let p = engine.io().point(0).unwrap();
    assert!(p.bit());
    assert_eq!(p.word(), 99);
}
