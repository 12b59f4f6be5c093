//! Tests for the scenario library.

#![cfg(test)]

use insta::assert_snapshot;
use stepper_safety::prelude::*;
use stepper_safety_sim::{Scenario, SimError, run, run_all};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_every_scenario_passes_with_defaults() -> TestResult {
    let reports = run_all(&SafetyConfig::default())?;
    assert_eq!(reports.len(), Scenario::ALL.len());
    for (scenario, report) in Scenario::ALL.into_iter().zip(&reports) {
        assert_eq!(report.scenario, scenario.name());
        assert_eq!(report.final_status.state, scenario.expected_final_state());
    }
    Ok(())
}

#[test]
fn test_recovered_flag() -> TestResult {
    let config = SafetyConfig::default();
    let recovered = |scenario| run(scenario, &config).map(|report| report.recovered);

    assert!(!recovered(Scenario::Nominal)?);
    assert!(recovered(Scenario::EstopButton)?);
    assert!(recovered(Scenario::EstopSoftware)?);
    assert!(recovered(Scenario::ChannelMismatch)?);
    assert!(recovered(Scenario::DriverOvercurrent)?);
    assert!(recovered(Scenario::EncoderMagnetWeak)?);
    assert!(!recovered(Scenario::WatchdogStarvation)?);
    assert!(recovered(Scenario::WatchdogResetBoot)?);
    Ok(())
}

#[test]
fn test_estop_report_contents() -> TestResult {
    let report = run(Scenario::EstopButton, &SafetyConfig::default())?;

    assert!(report.drivers_enabled);
    assert!(report.final_status.motion_permitted);
    assert!(report.final_status.worst_response_us <= 10_000);
    let kinds: Vec<_> = report.events.iter().map(|event| event.kind).collect();
    assert!(kinds.contains(&SafetyEventKind::EStopTriggered(TriggerSource::Button)));
    assert!(kinds.contains(&SafetyEventKind::EStopReset));
    assert!(kinds.contains(&SafetyEventKind::RecoveryStarted));
    Ok(())
}

#[test]
fn test_starvation_report_keeps_motion_blocked() -> TestResult {
    let report = run(Scenario::WatchdogStarvation, &SafetyConfig::default())?;

    assert!(!report.drivers_enabled);
    assert!(!report.final_status.motion_permitted);
    assert_eq!(report.final_status.watchdog_status, WatchdogStatus::Expired);
    assert!(
        report
            .final_status
            .active_faults
            .contains(FaultType::WatchdogStarvation)
    );
    Ok(())
}

#[test]
fn test_scenarios_follow_configured_timing() -> TestResult {
    let config = SafetyConfig::builder().recovery_hold_ms(1_000).build()?;
    let report = run(Scenario::EstopSoftware, &config)?;
    let default = run(Scenario::EstopSoftware, &SafetyConfig::default())?;

    assert!(report.recovered);
    assert_eq!(report.elapsed_ms, default.elapsed_ms + 500);
    Ok(())
}

#[test]
fn test_report_serializes() -> TestResult {
    let report = run(Scenario::DriverOvercurrent, &SafetyConfig::default())?;
    let value = serde_json::to_value(&report)?;

    assert_eq!(
        value.get("scenario").and_then(serde_json::Value::as_str),
        Some("driver-overcurrent")
    );
    assert_eq!(
        value.get("recovered").and_then(serde_json::Value::as_bool),
        Some(true)
    );
    assert_eq!(
        value
            .get("final_status")
            .and_then(|status| status.get("state"))
            .and_then(serde_json::Value::as_str),
        Some("Safe")
    );
    assert!(
        value
            .get("events")
            .and_then(serde_json::Value::as_array)
            .is_some_and(|events| !events.is_empty())
    );
    Ok(())
}

#[test]
fn test_scenario_names_parse() -> TestResult {
    for scenario in Scenario::ALL {
        assert_eq!(scenario.name().parse::<Scenario>()?, scenario);
    }
    assert_eq!(
        "meltdown".parse::<Scenario>(),
        Err(SimError::UnknownScenario("meltdown".to_owned()))
    );
    Ok(())
}

#[test]
fn test_nominal_summary() -> TestResult {
    let report = run(Scenario::Nominal, &SafetyConfig::default())?;
    assert_snapshot!(report.to_string().trim_end(), @r"
    scenario   nominal
    elapsed    1000 ms
    state      Safe (motion permitted)
    faults     none
    watchdog   Running
    response   last 0 us, worst 0 us
    recovered  no
    events     0 recorded, 0 retained
    ");
    Ok(())
}

#[test]
fn test_error_messages() {
    assert_snapshot!(
        SimError::UnexpectedState {
            step: "press",
            expected: SafetyState::EmergencyStop,
            actual: SafetyState::Safe,
        }
        .to_string(),
        @"after press: expected EmergencyStop, found Safe"
    );
    assert_snapshot!(
        SimError::safety("reset", SafetyError::WatchdogUnhealthy).to_string(),
        @"safety system error during reset: recovery refused: watchdog is not healthy"
    );
}
