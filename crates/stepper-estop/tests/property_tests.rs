//! Property-based tests for the e-stop latch.

#![cfg(test)]

use core::time::Duration;
use proptest::prelude::*;
use stepper_estop::prelude::*;
use stepper_estop::Debouncer;
use stepper_hal::mock::MockPin;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_latch_never_clears_without_reset(
        steps in proptest::collection::vec((any::<bool>(), any::<bool>(), 1u64..20), 1..200)
    ) {
        let a = MockPin::new(true);
        let b = MockPin::new(false);
        let mut estop = EmergencyStop::new(a.clone(), Some(b.clone()), EStopConfig::default())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let mut now = 0u64;
        let mut latched = false;
        for (a_pressed, b_pressed, step) in steps {
            a.set_level(!a_pressed);
            b.set_level(b_pressed);
            now += step;
            let event = estop.poll(ms(now));
            prop_assert_ne!(event, EStopEvent::ResetAccepted);
            latched |= matches!(event, EStopEvent::Triggered(_));
            prop_assert_eq!(estop.is_triggered(), latched);
        }
    }

    #[test]
    fn prop_pulse_shorter_than_debounce_is_ignored(
        debounce in 1u64..=100,
        start in 0u64..1_000,
        offset in 0u64..1_000,
    ) {
        let mut debouncer = Debouncer::new(false, ms(debounce));
        let width = offset % debounce;
        prop_assert_eq!(debouncer.update(true, ms(start)), None);
        prop_assert_eq!(debouncer.update(true, ms(start + width)), None);
        prop_assert_eq!(debouncer.update(false, ms(start + debounce + 5)), None);
        prop_assert!(!debouncer.stable());
    }

    #[test]
    fn prop_reset_respects_min_latch(min_latch in 10u32..1_000, elapsed in 0u64..2_000) {
        let config = EStopConfig::builder()
            .min_latch_ms(min_latch)
            .build()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut estop = EmergencyStop::new(MockPin::new(true), Some(MockPin::new(false)), config)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        estop.trigger(TriggerSource::SoftwareRequest, ms(0));

        let result = estop.request_reset(ms(elapsed));
        if elapsed < u64::from(min_latch) {
            prop_assert_eq!(
                result,
                Err(EStopError::ResetRefused(ResetRefusal::LatchTimeNotElapsed))
            );
            prop_assert!(estop.is_triggered());
        } else {
            prop_assert_eq!(result, Ok(EStopEvent::ResetAccepted));
            prop_assert!(!estop.is_triggered());
        }
    }

    #[test]
    fn prop_response_budget(budget in 1u32..50, micros in 0u64..100_000) {
        let config = EStopConfig::builder()
            .max_response_ms(budget)
            .build()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut estop = EmergencyStop::new(MockPin::new(true), Some(MockPin::new(false)), config)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let check = estop.record_response(ms(5), ms(5) + Duration::from_micros(micros));
        prop_assert_eq!(check.micros, micros);
        prop_assert_eq!(check.within_budget, micros <= u64::from(budget) * 1_000);
        prop_assert_eq!(estop.stats().violations, u32::from(!check.within_budget));
    }
}
