//! Property-based tests for watchdog timing and state machine invariants.

#![cfg(test)]

use core::time::Duration;
use proptest::prelude::*;
use stepper_hal::mock::{MockClock, MockWatchdog};
use stepper_hal::{WatchdogKind, WatchdogTiming};
use stepper_watchdog::prelude::*;
use stepper_watchdog::{iwdg_timing, wwdg_timing};

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Starve,
    Recover,
    Expire,
    Trip,
    Reset,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Starve),
        Just(Op::Recover),
        Just(Op::Expire),
        Just(Op::Trip),
        Just(Op::Reset),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_iwdg_timing_fits_registers(timeout_ms in 10u32..=5000) {
        let config = WatchdogConfig { timeout_ms, refresh_interval_ms: 5, ..WatchdogConfig::default() };
        let timing = iwdg_timing(&config);
        prop_assert!(timing.is_ok());
        if let Ok(WatchdogTiming::Independent { prescaler_bits, prescaler_divider, reload, timeout_us, .. }) = timing {
            prop_assert!(prescaler_bits <= 6);
            prop_assert_eq!(u32::from(prescaler_divider), 4u32 << prescaler_bits);
            prop_assert!(reload <= 0x0FFF);
            // Never longer than requested, and short by less than one tick.
            let requested_us = u64::from(timeout_ms) * 1000;
            let tick_us = u64::from(prescaler_divider) * 1_000_000 / 32_000;
            prop_assert!(u64::from(timeout_us) <= requested_us);
            prop_assert!(u64::from(timeout_us) + tick_us > requested_us);
        }
    }

    #[test]
    fn prop_wwdg_timing_covers_timeout(timeout_ms in 10u32..=279) {
        let config = WatchdogConfig {
            kind: WatchdogKind::Window,
            timeout_ms,
            refresh_interval_ms: 5,
            ..WatchdogConfig::default()
        };
        let timing = wwdg_timing(&config);
        prop_assert!(timing.is_ok());
        if let Ok(WatchdogTiming::Window { prescaler_bits, counter, window, timeout_us }) = timing {
            prop_assert!(prescaler_bits <= 7);
            prop_assert!((0x40..=0x7F).contains(&counter));
            prop_assert!(window <= counter && window >= 0x40);
            prop_assert!(u64::from(timeout_us) >= u64::from(timeout_ms) * 1000);
        }
    }

    #[test]
    fn prop_state_only_moves_along_table(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let state = WatchdogState::new();
        for op in ops {
            let before = state.status();
            let result = match op {
                Op::Start => state.start(),
                Op::Starve => state.starve(),
                Op::Recover => state.recover(),
                Op::Expire => state.expire(),
                Op::Trip => state.trip(),
                Op::Reset => {
                    state.reset();
                    Ok(())
                }
            };
            let after = state.status();
            if result.is_ok() {
                prop_assert!(before.can_transition_to(after), "{before} -> {after}");
            } else {
                prop_assert_eq!(before, after);
            }
        }
    }

    #[test]
    fn prop_kicking_every_ms_never_degrades(duration_ms in 1u64..1000) {
        let clock = MockClock::new();
        let hardware = MockWatchdog::new(WatchdogKind::Independent, clock);
        let manager = WatchdogManager::new(hardware, WatchdogConfig::default());
        prop_assert!(manager.is_ok());
        if let Ok(mut manager) = manager {
            prop_assert!(manager.start(Duration::ZERO).is_ok());
            for t in 1..=duration_ms {
                let now = Duration::from_millis(t);
                manager.kick();
                let tick = manager.service(now);
                prop_assert!(matches!(tick, Ok(WatchdogTick::Idle | WatchdogTick::Refreshed)));
            }
            prop_assert_eq!(manager.metrics().refresh_count, duration_ms / 50);
            prop_assert!(manager.is_healthy());
        }
    }

    #[test]
    fn prop_missed_kicks_never_exceed_slots(kicks in proptest::collection::vec(any::<bool>(), 1..30)) {
        let clock = MockClock::new();
        let hardware = MockWatchdog::new(WatchdogKind::Independent, clock);
        let config = WatchdogConfig { timeout_ms: 5000, refresh_interval_ms: 50, max_missed_kicks: 100, ..WatchdogConfig::default() };
        let manager = WatchdogManager::new(hardware, config);
        prop_assert!(manager.is_ok());
        if let Ok(mut manager) = manager {
            prop_assert!(manager.start(Duration::ZERO).is_ok());
            let mut expected_missed = 0u64;
            for (slot, kick) in kicks.iter().enumerate() {
                let slot_ms = (slot as u64 + 1) * 50;
                if *kick {
                    manager.kick();
                } else if slot > 0 {
                    expected_missed += 1;
                }
                prop_assert!(manager.service(Duration::from_millis(slot_ms)).is_ok());
            }
            prop_assert_eq!(manager.metrics().missed_kicks, expected_missed);
        }
    }
}
