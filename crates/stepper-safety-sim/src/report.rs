//! Scenario results.

use crate::board::SimBoard;
use crate::scenarios::Scenario;
use core::fmt;
use serde::Serialize;
use stepper_safety::prelude::FaultType;
use stepper_safety::{SafetyEvent, SafetyState, SafetyStatus};

/// Outcome of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: &'static str,
    /// Simulated time from boot to the end of the script.
    pub elapsed_ms: u64,
    /// Status at the end of the script.
    pub final_status: SafetyStatus,
    /// The system left `Safe` and came back.
    pub recovered: bool,
    /// STBY/RST was high at the end.
    pub drivers_enabled: bool,
    /// Events recorded over the whole run, including overwritten ones.
    pub events_recorded: u64,
    /// Retained events, oldest first.
    pub events: Vec<SafetyEvent>,
}

impl ScenarioReport {
    /// Capture the board's final state.
    #[must_use]
    pub fn from_board(scenario: Scenario, board: &SimBoard) -> Self {
        let system = board.system();
        let final_status = system.status();
        Self {
            scenario: scenario.name(),
            elapsed_ms: board.elapsed_ms(),
            final_status,
            recovered: board.left_safe() && final_status.state == SafetyState::Safe,
            drivers_enabled: board.drivers_enabled(),
            events_recorded: system.events().total_recorded(),
            events: system.events().iter().copied().collect(),
        }
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = &self.final_status;
        let motion = if status.motion_permitted {
            "motion permitted"
        } else {
            "motion blocked"
        };
        let faults = if status.active_faults.is_empty() {
            String::from("none")
        } else {
            status
                .active_faults
                .iter()
                .map(FaultType::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };

        writeln!(f, "scenario   {}", self.scenario)?;
        writeln!(f, "elapsed    {} ms", self.elapsed_ms)?;
        writeln!(f, "state      {} ({motion})", status.state)?;
        writeln!(f, "faults     {faults}")?;
        writeln!(f, "watchdog   {:?}", status.watchdog_status)?;
        writeln!(
            f,
            "response   last {} us, worst {} us",
            status.last_response_us, status.worst_response_us
        )?;
        writeln!(f, "recovered  {}", if self.recovered { "yes" } else { "no" })?;
        writeln!(
            f,
            "events     {} recorded, {} retained",
            self.events_recorded,
            self.events.len()
        )?;
        for event in &self.events {
            writeln!(f, "  {event}")?;
        }
        Ok(())
    }
}
