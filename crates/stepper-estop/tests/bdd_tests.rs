//! BDD tests for emergency-stop latching and reset.
//!
//! Feature: emergency_stop.feature

#![cfg(test)]

use core::time::Duration;
use stepper_estop::prelude::*;
use stepper_hal::mock::MockPin;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// A dual-channel e-stop wired as on the board: A is an NC loop to ground
/// (active low), B is its complement (active high).
struct Panel {
    a: MockPin,
    b: MockPin,
    estop: EmergencyStop<MockPin>,
}

impl Panel {
    fn new() -> Result<Self, EStopError> {
        Self::with_config(EStopConfig::default())
    }

    fn with_config(config: EStopConfig) -> Result<Self, EStopError> {
        let a = MockPin::new(true);
        let b = MockPin::new(false);
        let estop = EmergencyStop::new(a.clone(), Some(b.clone()), config)?;
        Ok(Self { a, b, estop })
    }

    fn press(&self) {
        self.a.set_level(false);
        self.b.set_level(true);
    }

    fn release(&self) {
        self.a.set_level(true);
        self.b.set_level(false);
    }

    /// Poll every 5 ms over `[from, to]` and collect the non-empty events.
    fn run(&mut self, from: u64, to: u64) -> Vec<(u64, EStopEvent)> {
        (from..=to)
            .step_by(5)
            .map(|t| (t, self.estop.poll(ms(t))))
            .filter(|(_, event)| *event != EStopEvent::None)
            .collect()
    }
}

mod emergency_stop_scenarios {
    use super::*;

    /// Scenario: Pressing the button latches the stop once the debounce time passes
    #[test]
    fn scenario_press_latches_after_debounce() -> TestResult {
        let mut panel = Panel::new()?;
        assert!(panel.run(0, 50).is_empty());

        panel.press();
        let events = panel.run(100, 150);

        assert_eq!(events, vec![(110, EStopEvent::Triggered(TriggerSource::Button))]);
        assert_eq!(
            panel.estop.state(),
            EStopState::Triggered {
                source: TriggerSource::Button,
                at: ms(110),
            }
        );
        assert_eq!(panel.estop.stats().trigger_count, 1);
        Ok(())
    }

    /// Scenario: A contact bounce shorter than the debounce time is ignored
    #[test]
    fn scenario_short_bounce_ignored() -> TestResult {
        let mut panel = Panel::new()?;
        panel.press();
        assert_eq!(panel.estop.poll(ms(0)), EStopEvent::None);
        assert_eq!(panel.estop.poll(ms(5)), EStopEvent::None);
        panel.release();

        assert!(panel.run(6, 100).is_empty());
        assert!(!panel.estop.is_triggered());
        Ok(())
    }

    /// Scenario: Releasing the button leaves the stop latched until a reset
    #[test]
    fn scenario_release_then_reset() -> TestResult {
        let mut panel = Panel::new()?;
        panel.press();
        panel.run(0, 20);
        panel.release();

        let events = panel.run(30, 60);
        assert_eq!(events, vec![(40, EStopEvent::Released)]);
        assert_eq!(panel.estop.state(), EStopState::ResetPending { since: ms(40) });
        assert!(panel.estop.is_triggered());

        // Latched at 10 ms; 100 ms minimum.
        assert_eq!(
            panel.estop.request_reset(ms(60)),
            Err(EStopError::ResetRefused(ResetRefusal::LatchTimeNotElapsed))
        );
        assert_eq!(panel.estop.request_reset(ms(110)), Ok(EStopEvent::ResetAccepted));
        assert_eq!(panel.estop.state(), EStopState::Ready);
        assert!(!panel.estop.is_triggered());
        Ok(())
    }

    /// Scenario: A reset is refused while the button is still held
    #[test]
    fn scenario_reset_refused_while_held() -> TestResult {
        let mut panel = Panel::new()?;
        panel.press();
        panel.run(0, 300);

        assert_eq!(
            panel.estop.request_reset(ms(300)),
            Err(EStopError::ResetRefused(ResetRefusal::InputActive))
        );
        assert!(panel.estop.is_triggered());
        Ok(())
    }

    /// Scenario: Pressing again while a reset is pending re-latches the stop
    #[test]
    fn scenario_press_while_reset_pending_relatches() -> TestResult {
        let mut panel = Panel::new()?;
        panel.press();
        panel.run(0, 20);
        panel.release();
        panel.run(25, 50);
        assert!(matches!(panel.estop.state(), EStopState::ResetPending { .. }));

        panel.press();
        let events = panel.run(200, 220);
        assert_eq!(events, vec![(210, EStopEvent::Triggered(TriggerSource::Button))]);
        assert_eq!(panel.estop.latched_at(), Some(ms(210)));
        assert_eq!(panel.estop.stats().trigger_count, 2);

        // The minimum latch restarts from the second press.
        panel.release();
        panel.run(225, 250);
        assert_eq!(
            panel.estop.request_reset(ms(300)),
            Err(EStopError::ResetRefused(ResetRefusal::LatchTimeNotElapsed))
        );
        assert_eq!(panel.estop.request_reset(ms(310)), Ok(EStopEvent::ResetAccepted));
        Ok(())
    }

    /// Scenario: A broken channel B wire is reported as a channel mismatch
    #[test]
    fn scenario_channel_disagreement_escalates() -> TestResult {
        let mut panel = Panel::new()?;
        // Only channel A opens.
        panel.a.set_level(false);

        let events = panel.run(0, 200);
        assert_eq!(
            events,
            vec![
                (10, EStopEvent::Triggered(TriggerSource::Button)),
                (65, EStopEvent::Triggered(TriggerSource::ChannelMismatch)),
            ]
        );
        assert_eq!(
            panel.estop.state(),
            EStopState::Triggered {
                source: TriggerSource::ChannelMismatch,
                at: ms(10),
            }
        );
        assert_eq!(panel.estop.stats().trigger_count, 1);
        assert_eq!(
            panel.estop.request_reset(ms(200)),
            Err(EStopError::ResetRefused(ResetRefusal::ChannelsDisagree))
        );
        Ok(())
    }

    /// Scenario: A software request latches without any button press
    #[test]
    fn scenario_software_request() -> TestResult {
        let mut panel = Panel::new()?;
        assert_eq!(
            panel.estop.trigger(TriggerSource::SoftwareRequest, ms(0)),
            EStopEvent::Triggered(TriggerSource::SoftwareRequest)
        );
        assert_eq!(
            panel.estop.trigger(TriggerSource::SoftwareRequest, ms(5)),
            EStopEvent::None
        );
        assert!(panel.run(0, 95).is_empty());

        assert_eq!(
            panel.estop.request_reset(ms(99)),
            Err(EStopError::ResetRefused(ResetRefusal::LatchTimeNotElapsed))
        );
        assert_eq!(panel.estop.request_reset(ms(100)), Ok(EStopEvent::ResetAccepted));
        assert_eq!(panel.estop.stats().trigger_count, 1);
        Ok(())
    }

    /// Scenario: Resetting an e-stop that never triggered is refused
    #[test]
    fn scenario_reset_without_trigger() -> TestResult {
        let mut panel = Panel::new()?;
        panel.run(0, 200);
        assert_eq!(
            panel.estop.request_reset(ms(200)),
            Err(EStopError::ResetRefused(ResetRefusal::NotTriggered))
        );
        Ok(())
    }

    /// Scenario: A single-channel installation works without channel B
    #[test]
    fn scenario_single_channel() -> TestResult {
        let config = EStopConfig::builder().dual_channel(false).build()?;
        let a = MockPin::new(true);
        let mut estop: EmergencyStop<MockPin> = EmergencyStop::new(a.clone(), None, config)?;

        a.set_level(false);
        assert_eq!(estop.poll(ms(0)), EStopEvent::None);
        assert_eq!(estop.poll(ms(10)), EStopEvent::Triggered(TriggerSource::Button));
        assert_eq!(
            estop.channel_levels(),
            ChannelLevels {
                a_active: true,
                b_active: None,
            }
        );

        a.set_level(true);
        assert_eq!(estop.poll(ms(20)), EStopEvent::None);
        assert_eq!(estop.poll(ms(30)), EStopEvent::Released);
        assert_eq!(estop.request_reset(ms(110)), Ok(EStopEvent::ResetAccepted));
        Ok(())
    }
}
