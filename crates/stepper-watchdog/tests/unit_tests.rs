//! Unit tests for the watchdog manager.

#![cfg(test)]

use core::time::Duration;
use stepper_hal::mock::{MockClock, MockWatchdog};
use stepper_hal::{WatchdogKind, WatchdogTiming};
use stepper_watchdog::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn iwdg() -> MockWatchdog {
    MockWatchdog::new(WatchdogKind::Independent, MockClock::new())
}

mod lifecycle {
    use super::*;

    #[test]
    fn test_new_manager_is_stopped() -> TestResult {
        let manager = WatchdogManager::new(iwdg(), WatchdogConfig::default())?;
        assert_eq!(manager.status(), WatchdogStatus::Stopped);
        assert!(!manager.is_healthy());
        assert!(manager.timing().is_none());
        Ok(())
    }

    #[test]
    fn test_start_programs_peripheral() -> TestResult {
        let hardware = iwdg();
        let mut manager = WatchdogManager::new(hardware.clone(), WatchdogConfig::default())?;
        manager.start(Duration::ZERO)?;

        assert_eq!(manager.status(), WatchdogStatus::Running);
        assert!(manager.is_healthy());
        assert_eq!(hardware.timing(), manager.timing());
        assert!(matches!(
            hardware.timing(),
            Some(WatchdogTiming::Independent { reload: 799, .. })
        ));
        assert_eq!(manager.metrics().start_count, 1);
        Ok(())
    }

    #[test]
    fn test_cannot_start_twice() -> TestResult {
        let mut manager = WatchdogManager::new(iwdg(), WatchdogConfig::default())?;
        manager.start(Duration::ZERO)?;
        assert_eq!(
            manager.start(Duration::ZERO),
            Err(WatchdogError::invalid_transition("Running", "Running"))
        );
        Ok(())
    }

    #[test]
    fn test_service_before_start_fails() -> TestResult {
        let mut manager = WatchdogManager::new(iwdg(), WatchdogConfig::default())?;
        assert_eq!(
            manager.service(Duration::from_millis(50)),
            Err(WatchdogError::NotRunning)
        );
        assert_eq!(
            manager.refresh_now(Duration::from_millis(50)),
            Err(WatchdogError::NotRunning)
        );
        Ok(())
    }

    #[test]
    fn test_idle_before_due() -> TestResult {
        let mut manager = WatchdogManager::new(iwdg(), WatchdogConfig::default())?;
        manager.start(Duration::ZERO)?;
        assert_eq!(manager.service(Duration::from_millis(49))?, WatchdogTick::Idle);
        assert_eq!(
            manager.time_since_refresh(Duration::from_millis(49)),
            Duration::from_millis(49)
        );
        Ok(())
    }

    #[test]
    fn test_reset_clears_metrics() -> TestResult {
        let mut manager = WatchdogManager::new(iwdg(), WatchdogConfig::default())?;
        manager.start(Duration::ZERO)?;
        manager.service(Duration::from_millis(50))?;
        manager.reset();

        assert_eq!(manager.status(), WatchdogStatus::Stopped);
        assert_eq!(manager.metrics(), WatchdogMetrics::default());
        manager.start(Duration::from_millis(60))?;
        assert_eq!(manager.status(), WatchdogStatus::Running);
        Ok(())
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let wwdg = MockWatchdog::new(WatchdogKind::Window, MockClock::new());
        assert!(matches!(
            WatchdogManager::new(wwdg, WatchdogConfig::default()),
            Err(WatchdogError::InvalidConfiguration(_))
        ));
    }
}

mod display_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_error_messages() {
        assert_snapshot!(
            WatchdogError::invalid_configuration("max_missed_kicks must be at least 1").to_string(),
            @"invalid watchdog configuration: max_missed_kicks must be at least 1"
        );
        assert_snapshot!(
            WatchdogError::Hal(stepper_hal::HalError::NotInitialized).to_string(),
            @"watchdog peripheral: peripheral not initialized"
        );
        assert_snapshot!(
            WatchdogError::TimeoutUnreachable { kind: "WWDG", timeout_ms: 1000 }.to_string(),
            @"no WWDG prescaler can represent a 1000 ms timeout"
        );
    }

    #[test]
    fn test_status_names() {
        assert_snapshot!(WatchdogStatus::Starved.to_string(), @"Starved");
        assert_snapshot!(WatchdogStatus::Tripped.to_string(), @"Tripped");
    }
}
