//! Named fault scenarios.
//!
//! Every scenario boots a fresh [`SimBoard`], drives it through a fixed
//! script and checks the safety state at each checkpoint. Durations are
//! derived from the active [`SafetyConfig`], so a scenario still lines up
//! with non-default timing.

use crate::board::SimBoard;
use crate::error::{SimError, SimResult};
use crate::report::ScenarioReport;
use clap::ValueEnum;
use core::fmt;
use core::str::FromStr;
use stepper_fault_monitor::MagnetStatus;
use stepper_safety::prelude::{FaultType, SafetyConfig, SafetyState, TriggerSource};

/// Scripted scenarios, named in kebab case on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Scenario {
    /// One second of normal operation.
    Nominal,
    /// Operator presses and releases the e-stop, then recovers.
    EstopButton,
    /// The communication layer requests an e-stop.
    EstopSoftware,
    /// Only one e-stop channel reports a press.
    ChannelMismatch,
    /// One driver flags overcurrent, the alarm clears, then recovery.
    DriverOvercurrent,
    /// The encoder magnet drifts too far away and comes back.
    EncoderMagnetWeak,
    /// The application stops kicking the watchdog.
    WatchdogStarvation,
    /// The previous MCU reset came from the watchdog.
    WatchdogResetBoot,
}

impl Scenario {
    /// Every scenario, in the order `list` prints them.
    pub const ALL: [Scenario; 8] = [
        Scenario::Nominal,
        Scenario::EstopButton,
        Scenario::EstopSoftware,
        Scenario::ChannelMismatch,
        Scenario::DriverOvercurrent,
        Scenario::EncoderMagnetWeak,
        Scenario::WatchdogStarvation,
        Scenario::WatchdogResetBoot,
    ];

    /// Command-line name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Scenario::Nominal => "nominal",
            Scenario::EstopButton => "estop-button",
            Scenario::EstopSoftware => "estop-software",
            Scenario::ChannelMismatch => "channel-mismatch",
            Scenario::DriverOvercurrent => "driver-overcurrent",
            Scenario::EncoderMagnetWeak => "encoder-magnet-weak",
            Scenario::WatchdogStarvation => "watchdog-starvation",
            Scenario::WatchdogResetBoot => "watchdog-reset-boot",
        }
    }

    /// One-line description.
    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Scenario::Nominal => "one second of normal operation",
            Scenario::EstopButton => "e-stop press, release and recovery",
            Scenario::EstopSoftware => "software e-stop request and recovery",
            Scenario::ChannelMismatch => "only channel B reports a press",
            Scenario::DriverOvercurrent => "driver overcurrent, alarm clears, recovery",
            Scenario::EncoderMagnetWeak => "weak encoder magnet warning that clears itself",
            Scenario::WatchdogStarvation => "hung main loop starves the watchdog",
            Scenario::WatchdogResetBoot => "boot after a watchdog reset, acknowledge, recovery",
        }
    }

    /// The final state a successful run ends in.
    #[must_use]
    pub const fn expected_final_state(self) -> SafetyState {
        match self {
            Scenario::WatchdogStarvation => SafetyState::EmergencyStop,
            Scenario::Nominal
            | Scenario::EstopButton
            | Scenario::EstopSoftware
            | Scenario::ChannelMismatch
            | Scenario::DriverOvercurrent
            | Scenario::EncoderMagnetWeak
            | Scenario::WatchdogResetBoot => SafetyState::Safe,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| SimError::UnknownScenario(s.to_owned()))
    }
}

/// Step lengths in milliseconds, derived from the configuration.
#[derive(Debug, Clone, Copy)]
struct Timing {
    warm_up: u64,
    press: u64,
    mismatch: u64,
    latch: u64,
    detect: u64,
    hold: u64,
    warning_clear: u64,
    starvation: u64,
}

impl Timing {
    fn new(config: &SafetyConfig) -> Self {
        let debounce = u64::from(config.estop.debounce_ms);
        let poll = u64::from(config.faults.poll_interval_ms);
        let flag_samples = u64::from(config.faults.flag_debounce_samples);
        let refresh = u64::from(config.watchdog.refresh_interval_ms);
        let missed = u64::from(config.watchdog.max_missed_kicks);
        Self {
            warm_up: 100,
            press: debounce.saturating_add(10),
            mismatch: debounce
                .saturating_add(u64::from(config.estop.discrepancy_ms))
                .saturating_add(20),
            latch: u64::from(config.estop.min_latch_ms).saturating_add(debounce),
            detect: poll.saturating_mul(flag_samples.saturating_add(1)),
            hold: u64::from(config.recovery_hold_ms).saturating_add(1),
            warning_clear: u64::from(config.faults.warning_clear_ms)
                .saturating_add(poll.saturating_mul(2))
                .saturating_add(1),
            starvation: refresh
                .saturating_mul(missed.saturating_add(1))
                .saturating_add(u64::from(config.watchdog.timeout_ms)),
        }
    }
}

/// Run one scenario from a fresh boot.
///
/// # Errors
///
/// Returns an error if a checkpoint fails or the safety system reports an
/// unexpected error.
pub fn run(scenario: Scenario, config: &SafetyConfig) -> SimResult<ScenarioReport> {
    tracing::info!(scenario = %scenario, "scenario started");
    let timing = Timing::new(config);
    let mut board = SimBoard::boot(*config, scenario == Scenario::WatchdogResetBoot)?;

    match scenario {
        Scenario::Nominal => nominal(&mut board),
        Scenario::EstopButton => estop_button(&mut board, timing),
        Scenario::EstopSoftware => estop_software(&mut board, timing),
        Scenario::ChannelMismatch => channel_mismatch(&mut board, timing),
        Scenario::DriverOvercurrent => driver_overcurrent(&mut board, timing),
        Scenario::EncoderMagnetWeak => encoder_magnet_weak(&mut board, timing),
        Scenario::WatchdogStarvation => watchdog_starvation(&mut board, timing),
        Scenario::WatchdogResetBoot => watchdog_reset_boot(&mut board, timing),
    }?;
    board.expect_state("final check", scenario.expected_final_state())?;

    let report = ScenarioReport::from_board(scenario, &board);
    tracing::info!(
        scenario = %scenario,
        state = %report.final_status.state,
        recovered = report.recovered,
        elapsed_ms = report.elapsed_ms,
        "scenario finished"
    );
    Ok(report)
}

/// Run every scenario, stopping at the first failure.
///
/// # Errors
///
/// Returns the first failing scenario's error.
pub fn run_all(config: &SafetyConfig) -> SimResult<Vec<ScenarioReport>> {
    Scenario::ALL
        .into_iter()
        .map(|scenario| run(scenario, config))
        .collect()
}

fn recover(board: &mut SimBoard, step: &'static str) -> SimResult<()> {
    board
        .system_mut()
        .request_recovery()
        .map_err(|e| SimError::safety(step, e))?;
    board.expect_state(step, SafetyState::Recovery)
}

fn hold_until_safe(board: &mut SimBoard, timing: Timing) -> SimResult<()> {
    board.run("recovery hold", timing.hold)?;
    board.expect_state("recovery hold", SafetyState::Safe)?;
    board.expect(
        "recovery hold",
        board.drivers_enabled(),
        "drivers still in standby after recovery",
    )
}

fn nominal(board: &mut SimBoard) -> SimResult<()> {
    let status = board.run("normal operation", 1000)?;
    board.expect_state("normal operation", SafetyState::Safe)?;
    board.expect(
        "normal operation",
        status.motion_permitted,
        "motion not permitted on a healthy board",
    )
}

fn estop_button(board: &mut SimBoard, timing: Timing) -> SimResult<()> {
    board.run("warm-up", timing.warm_up)?;
    board.press_estop();
    board.run("press", timing.press)?;
    board.expect_state("press", SafetyState::EmergencyStop)?;
    board.expect("press", !board.drivers_enabled(), "drivers not in standby")?;

    board.release_estop();
    board.run("release", timing.latch)?;
    recover(board, "reset")?;
    hold_until_safe(board, timing)
}

fn estop_software(board: &mut SimBoard, timing: Timing) -> SimResult<()> {
    board.run("warm-up", timing.warm_up)?;
    board
        .system_mut()
        .request_emergency_stop(TriggerSource::SoftwareRequest)
        .map_err(|e| SimError::safety("software request", e))?;
    board.expect_state("software request", SafetyState::EmergencyStop)?;

    board.run("latch", timing.latch)?;
    recover(board, "reset")?;
    hold_until_safe(board, timing)
}

fn channel_mismatch(board: &mut SimBoard, timing: Timing) -> SimResult<()> {
    board.run("warm-up", timing.warm_up)?;
    board.press_channel_b_only();
    let status = board.run("mismatch", timing.mismatch)?;
    board.expect_state("mismatch", SafetyState::EmergencyStop)?;
    board.expect(
        "mismatch",
        status.active_faults.contains(FaultType::EStopChannelMismatch),
        "channel mismatch fault not raised",
    )?;

    let refused = board.system_mut().request_recovery().is_err();
    board.expect("reset while mismatched", refused, "reset accepted with disagreeing channels")?;

    board.release_estop();
    board.run("channels agree", timing.latch)?;
    recover(board, "reset")?;
    hold_until_safe(board, timing)
}

fn driver_overcurrent(board: &mut SimBoard, timing: Timing) -> SimResult<()> {
    board.run("warm-up", timing.warm_up)?;
    board.overcurrent(0);
    board.run("overcurrent", timing.detect)?;
    board.expect_state("overcurrent", SafetyState::Fault)?;

    board.drivers_idle();
    board.run("alarm cleared", timing.detect)?;
    recover(board, "recovery request")?;
    hold_until_safe(board, timing)
}

fn encoder_magnet_weak(board: &mut SimBoard, timing: Timing) -> SimResult<()> {
    board.run("warm-up", timing.warm_up)?;
    board.set_magnet(MagnetStatus(MagnetStatus::MD | MagnetStatus::ML));
    let status = board.run("weak magnet", timing.detect)?;
    board.expect_state("weak magnet", SafetyState::Warning)?;
    board.expect(
        "weak magnet",
        status.motion_permitted,
        "a warning must not block motion",
    )?;

    board.set_magnet(MagnetStatus::NOMINAL);
    board.run("magnet restored", timing.warning_clear)?;
    board.expect_state("magnet restored", SafetyState::Safe)
}

fn watchdog_starvation(board: &mut SimBoard, timing: Timing) -> SimResult<()> {
    board.run("warm-up", timing.warm_up)?;
    board.run_hung("hung main loop", timing.starvation)?;
    board.expect_state("hung main loop", SafetyState::EmergencyStop)?;
    board.expect(
        "hung main loop",
        board.watchdog_expired(),
        "hardware watchdog did not expire",
    )?;

    let refused = board.system_mut().request_recovery().is_err();
    board.expect(
        "recovery after expiry",
        refused,
        "recovery accepted with an expired watchdog",
    )
}

fn watchdog_reset_boot(board: &mut SimBoard, timing: Timing) -> SimResult<()> {
    board.expect_state("boot", SafetyState::Fault)?;
    board.expect("boot", !board.drivers_enabled(), "drivers powered after a watchdog reset")?;

    board.run("operator review", timing.warm_up)?;
    board
        .system_mut()
        .acknowledge_watchdog_reset()
        .map_err(|e| SimError::safety("acknowledge", e))?;
    recover(board, "recovery request")?;
    hold_until_safe(board, timing)
}
