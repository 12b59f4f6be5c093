//! Safety-hardening tests: bus failures, slow shutdowns and stuck inputs.
//!
//! All tests use `Result<>` return types and avoid `unwrap`/`expect`.

#![cfg(test)]

mod helpers;

use helpers::{Board, TestResult};
use stepper_fault_monitor::{Command, as5600};
use stepper_hal::{BusErrorKind, HalError};
use stepper_safety::prelude::*;

/// A shutdown slower than the response budget is measured and flagged.
#[test]
fn test_slow_shutdown_raises_response_overrun() -> TestResult {
    let mut board = Board::boot()?;
    board.run(100)?;

    let clock = board.handles.clock.clone();
    board
        .handles
        .motor_spi
        .set_responder(Box::new(move |frame: &[u8]| {
            if frame.first() == Some(&Command::HardHiZ.opcode()) {
                clock.advance_ms(15);
            }
            None
        }));
    board
        .system
        .request_emergency_stop(TriggerSource::SoftwareRequest)?;

    let status = board.system.status();
    assert_eq!(status.state, SafetyState::EmergencyStop);
    assert_eq!(status.last_response_us, 15_000);
    assert_eq!(status.worst_response_us, 15_000);
    assert!(status.active_faults.contains(FaultType::EStopResponseOverrun));
    assert_eq!(board.system.estop().stats().violations, 1);
    assert!(
        board
            .event_kinds()
            .contains(&SafetyEventKind::ResponseMeasured {
                micros: 15_000,
                within_budget: false,
            })
    );
    Ok(())
}

/// STBY still drops when the bridges cannot be commanded.
#[test]
fn test_spi_failure_during_emergency_disable() -> TestResult {
    let mut board = Board::boot()?;
    board.run(100)?;

    board
        .handles
        .motor_spi
        .fail_all(Some(BusErrorKind::ModeFault));
    let result = board
        .system
        .request_emergency_stop(TriggerSource::SoftwareRequest);

    assert_eq!(
        result,
        Err(SafetyError::Shutdown(HalError::spi(BusErrorKind::ModeFault)))
    );
    assert_eq!(board.system.state(), SafetyState::EmergencyStop);
    assert!(!board.drivers_out_of_standby());
    assert!(!board.system.shared().motion_permitted());
    Ok(())
}

/// A dead driver chain ends in Fault, and the watchdog keeps being served
/// while the shutdown path reports errors.
#[test]
fn test_dead_driver_chain_faults_and_keeps_watchdog_alive() -> TestResult {
    let mut board = Board::boot()?;
    board.run(100)?;
    let refreshes = board.handles.watchdog.refresh_count();

    board.handles.motor_spi.fail_all(Some(BusErrorKind::Overrun));
    let mut errors = Vec::new();
    for _ in 0..200 {
        board.handles.clock.advance_ms(1);
        board.system.kick_watchdog();
        if let Err(err) = board.system.tick() {
            errors.push(err);
        }
    }

    let status = board.system.status();
    assert_eq!(status.state, SafetyState::Fault);
    assert!(status.active_faults.contains(FaultType::MotorSpiFailure));
    assert!(!status.motion_permitted);
    assert!(!errors.is_empty());
    assert!(
        errors
            .iter()
            .all(|err| matches!(err, SafetyError::Shutdown(_)))
    );
    assert!(board.handles.watchdog.refresh_count() > refreshes);
    assert_eq!(status.watchdog_status, WatchdogStatus::Running);
    Ok(())
}

/// An e-stop input that cannot be read counts as pressed, with no debounce.
#[test]
fn test_unreadable_estop_channel_stops_immediately() -> TestResult {
    let mut board = Board::boot()?;
    board.run(10)?;

    board.handles.estop_a.fail_reads(true);
    let status = board.run(1)?;

    assert_eq!(status.state, SafetyState::EmergencyStop);
    assert!(
        board
            .event_kinds()
            .contains(&SafetyEventKind::EStopTriggered(TriggerSource::Fault))
    );
    Ok(())
}

/// An encoder that stops answering is a critical fault.
#[test]
fn test_encoder_nack_faults() -> TestResult {
    let mut board = Board::boot()?;
    board.run(100)?;

    board.handles.encoder_i2c.set_nack(as5600::ADDRESS, true);
    let status = board.run(100)?;

    assert_eq!(status.state, SafetyState::Fault);
    assert!(status.active_faults.contains(FaultType::EncoderI2cFailure));
    assert!(board.drivers.control_commands().contains(&Command::HardStop));
    Ok(())
}

/// The driver FLAG line is debounced over consecutive polls.
#[test]
fn test_flag_line_faults_after_debounce() -> TestResult {
    let mut board = Board::boot()?;
    board.run(100)?;

    board.handles.driver_flag.set_level(false);
    let status = board.run(30)?;

    assert_eq!(status.state, SafetyState::Fault);
    assert!(status.active_faults.contains(FaultType::DriverFlagAsserted));
    Ok(())
}

/// A press during the recovery hold stops again and never lets motion through.
#[test]
fn test_press_during_recovery_hold() -> TestResult {
    let mut board = Board::boot()?;
    board.run(10)?;
    board
        .system
        .request_emergency_stop(TriggerSource::SoftwareRequest)?;
    board.run(100)?;
    board.system.request_recovery()?;

    board.run(200)?;
    board.handles.press_estop();
    for _ in 0..400 {
        let status = board.run(1)?;
        assert!(!status.motion_permitted);
        assert!(!board.system.shared().motion_permitted());
    }

    assert_eq!(board.system.state(), SafetyState::EmergencyStop);
    assert!(!board.drivers_out_of_standby());
    assert_eq!(
        board.transitions().last().copied(),
        Some((SafetyState::Recovery, SafetyState::EmergencyStop))
    );
    Ok(())
}

/// The e-stop wins over an active driver fault. Standby hides the driver
/// alarm, so it comes back once recovery powers the drivers up again.
#[test]
fn test_estop_overrides_fault_state() -> TestResult {
    let mut board = Board::boot()?;
    board.run(100)?;
    board.overcurrent(0);
    board.run(20)?;
    assert_eq!(board.system.state(), SafetyState::Fault);

    board.handles.press_estop();
    let status = board.run(20)?;

    assert_eq!(status.state, SafetyState::EmergencyStop);
    assert!(!board.drivers_out_of_standby());
    assert!(!board.system.monitor().drivers_powered());

    board.handles.release_estop();
    board.run(200)?;
    board.system.request_recovery()?;
    let status = board.run(520)?;

    assert_eq!(status.state, SafetyState::Fault);
    assert!(status.active_faults.contains(FaultType::DriverOvercurrent));
    assert_eq!(
        board.transitions().last().copied(),
        Some((SafetyState::Safe, SafetyState::Fault))
    );
    Ok(())
}

/// Before the first publication, readers see a stopped system.
#[test]
fn test_shared_status_starts_fail_safe() {
    let shared = SharedSafetyStatus::new();
    assert_eq!(shared.state(), SafetyState::EmergencyStop);
    assert!(!shared.motion_permitted());
    assert!(shared.estop_triggered());
}
