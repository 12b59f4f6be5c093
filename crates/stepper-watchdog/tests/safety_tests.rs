//! Safety-hardening tests for watchdog supervision.
//!
//! Time is driven through `MockClock`, so every test is deterministic.
//! All tests use `Result<>` return types and avoid `unwrap`/`expect`.

#![cfg(test)]

use stepper_hal::mock::{MockClock, MockWatchdog};
use stepper_hal::{Clock, WatchdogKind};
use stepper_watchdog::prelude::*;

/// A starved watchdog never touches the hardware again on its own.
#[test]
fn test_starved_manager_withholds_refresh() -> Result<(), Box<dyn std::error::Error>> {
    let clock = MockClock::new();
    let hardware = MockWatchdog::new(WatchdogKind::Independent, clock.clone());
    let config = WatchdogConfig::builder().max_missed_kicks(1).build()?;
    let mut manager = WatchdogManager::new(hardware.clone(), config)?;
    manager.start(clock.now())?;

    clock.advance_ms(50);
    assert_eq!(manager.service(clock.now())?, WatchdogTick::Refreshed);
    clock.advance_ms(50);
    assert_eq!(
        manager.service(clock.now())?,
        WatchdogTick::Starved { consecutive: 1 }
    );
    let refreshes = hardware.refresh_count();

    for _ in 0..4 {
        clock.advance_ms(10);
        manager.service(clock.now())?;
    }
    assert_eq!(hardware.refresh_count(), refreshes);
    assert_eq!(manager.status(), WatchdogStatus::Starved);

    clock.advance_ms(11);
    assert_eq!(manager.service(clock.now())?, WatchdogTick::Expired);
    assert!(hardware.expired());
    Ok(())
}

/// An expired watchdog stays expired even if kicks resume.
#[test]
fn test_expiry_is_sticky() -> Result<(), Box<dyn std::error::Error>> {
    let clock = MockClock::new();
    let hardware = MockWatchdog::new(WatchdogKind::Independent, clock.clone());
    let mut manager = WatchdogManager::new(hardware, WatchdogConfig::default())?;
    manager.start(clock.now())?;

    clock.advance_ms(150);
    assert_eq!(manager.service(clock.now())?, WatchdogTick::Expired);

    manager.kick();
    clock.advance_ms(50);
    assert_eq!(manager.service(clock.now())?, WatchdogTick::Expired);
    assert!(!manager.is_healthy());
    Ok(())
}

/// Tripping is allowed from an expired watchdog but only once.
#[test]
fn test_inhibit_after_expiry() -> Result<(), Box<dyn std::error::Error>> {
    let clock = MockClock::new();
    let hardware = MockWatchdog::new(WatchdogKind::Independent, clock.clone());
    let mut manager = WatchdogManager::new(hardware, WatchdogConfig::default())?;
    manager.start(clock.now())?;
    clock.advance_ms(100);
    manager.service(clock.now())?;

    manager.inhibit(clock.now())?;
    assert_eq!(manager.status(), WatchdogStatus::Tripped);
    assert!(matches!(manager.inhibit(clock.now()), Err(_)));
    Ok(())
}

/// A rejected configuration never reaches the peripheral.
#[test]
fn test_invalid_configuration_leaves_hardware_untouched() {
    let clock = MockClock::new();
    let hardware = MockWatchdog::new(WatchdogKind::Independent, clock);
    let config = WatchdogConfig {
        refresh_interval_ms: 150,
        ..WatchdogConfig::default()
    };
    assert!(matches!(WatchdogManager::new(hardware.clone(), config), Err(_)));
    assert!(!hardware.is_started());
}
