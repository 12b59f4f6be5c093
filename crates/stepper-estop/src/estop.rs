//! The emergency-stop latch.

use crate::config::EStopConfig;
use crate::debounce::Debouncer;
use crate::error::{EStopError, EStopResult, ResetRefusal};
use core::fmt;
use stepper_hal::{ActiveLevel, DigitalInput, HalResult, Timestamp};

/// What latched the e-stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerSource {
    /// A channel was pressed.
    Button,
    /// Requested over the communication layer.
    SoftwareRequest,
    /// The channels disagreed for longer than the discrepancy window.
    ChannelMismatch,
    /// A fault (or an unreadable input) demanded an emergency stop.
    Fault,
}

impl TriggerSource {
    /// Human-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Button => "button",
            TriggerSource::SoftwareRequest => "software request",
            TriggerSource::ChannelMismatch => "channel mismatch",
            TriggerSource::Fault => "fault",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EStopState {
    /// Not triggered.
    Ready,
    /// Latched; the input may still be held.
    Triggered {
        /// What latched it.
        source: TriggerSource,
        /// When the trigger was accepted.
        at: Timestamp,
    },
    /// Latched with the input released, waiting for a reset request.
    ResetPending {
        /// When the release was accepted.
        since: Timestamp,
    },
}

impl EStopState {
    /// Whether the latch is set.
    #[must_use]
    pub const fn is_latched(self) -> bool {
        !matches!(self, EStopState::Ready)
    }

    /// State name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EStopState::Ready => "Ready",
            EStopState::Triggered { .. } => "Triggered",
            EStopState::ResetPending { .. } => "ResetPending",
        }
    }
}

/// Outcome of a poll, trigger or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EStopEvent {
    /// Nothing changed.
    None,
    /// The latch was set, or re-reported with a more specific source.
    Triggered(TriggerSource),
    /// The input was released while latched.
    Released,
    /// A reset request was accepted.
    ResetAccepted,
}

/// Response-time accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponseStats {
    /// Number of times the latch was set.
    pub trigger_count: u32,
    /// Most recent detection-to-disabled time.
    pub last_response_us: u64,
    /// Longest detection-to-disabled time.
    pub worst_response_us: u64,
    /// Responses over budget.
    pub violations: u32,
}

/// One measured response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponseCheck {
    /// Detection-to-disabled time.
    pub micros: u64,
    /// Whether it met `max_response_ms`.
    pub within_budget: bool,
}

/// Debounced channel levels, `true` meaning pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelLevels {
    /// Channel A.
    pub a_active: bool,
    /// Channel B, `None` in single-channel mode.
    pub b_active: Option<bool>,
}

impl ChannelLevels {
    /// Either channel pressed.
    #[must_use]
    pub fn any_active(self) -> bool {
        self.a_active || self.b_active.unwrap_or(false)
    }

    /// Both channels read the same (always true with one channel).
    #[must_use]
    pub fn agree(self) -> bool {
        self.b_active.is_none_or(|b| b == self.a_active)
    }
}

/// Debounced, latched, optionally dual-channel emergency stop.
///
/// ```text
///           press / mismatch / trigger()
/// ┌───────┐ ───────────────────────────► ┌───────────┐
/// │ Ready │                              │ Triggered │◄──┐
/// └───────┘ ◄─────────┐                  └─────┬─────┘   │ press
///                     │ request_reset()        │ release │
///                     │                  ┌─────▼────────┐│
///                     └──────────────────│ ResetPending │┘
///                                        └──────────────┘
/// ```
///
/// `request_reset` is also accepted straight from `Triggered` when the
/// channels never went active (software or fault triggers).
#[derive(Debug)]
pub struct EmergencyStop<A: DigitalInput, B: DigitalInput = A> {
    channel_a: A,
    channel_b: Option<B>,
    config: EStopConfig,
    debounce_a: Debouncer,
    debounce_b: Debouncer,
    state: EStopState,
    latched_at: Option<Timestamp>,
    mismatch_since: Option<Timestamp>,
    mismatch_reported: bool,
    stats: ResponseStats,
}

fn sample_channel<I: DigitalInput + ?Sized>(
    level: ActiveLevel,
    input: &mut I,
    debouncer: &mut Debouncer,
    channel: &'static str,
    now: Timestamp,
) -> (Option<bool>, bool) {
    let sample: HalResult<bool> = level.sample(input);
    match sample {
        Ok(active) => (debouncer.update(active, now), false),
        Err(err) => {
            tracing::warn!(channel, error = %err, "e-stop input unreadable, treating as pressed");
            (debouncer.force(true), true)
        }
    }
}

impl<A: DigitalInput, B: DigitalInput> EmergencyStop<A, B> {
    /// Create the handler. Both channels start out released.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or if dual-channel
    /// mode is configured without channel B.
    pub fn new(channel_a: A, channel_b: Option<B>, config: EStopConfig) -> EStopResult<Self> {
        config.validate()?;
        if config.dual_channel && channel_b.is_none() {
            return Err(EStopError::MissingChannelB);
        }
        let debounce = config.debounce();
        Ok(Self {
            channel_a,
            channel_b: if config.dual_channel { channel_b } else { None },
            config,
            debounce_a: Debouncer::new(false, debounce),
            debounce_b: Debouncer::new(false, debounce),
            state: EStopState::Ready,
            latched_at: None,
            mismatch_since: None,
            mismatch_reported: false,
            stats: ResponseStats::default(),
        })
    }

    /// Sample the inputs and update the latch.
    pub fn poll(&mut self, now: Timestamp) -> EStopEvent {
        let (a_edge, a_failed) = sample_channel(
            self.config.channel_a_active,
            &mut self.channel_a,
            &mut self.debounce_a,
            "A",
            now,
        );
        let (b_edge, b_failed) = match self.channel_b.as_mut() {
            Some(channel_b) => sample_channel(
                self.config.channel_b_active,
                channel_b,
                &mut self.debounce_b,
                "B",
                now,
            ),
            None => (None, false),
        };

        let levels = self.channel_levels();
        let mismatch = self.track_mismatch(levels, now);

        if a_failed || b_failed {
            return self.latch(TriggerSource::Fault, now);
        }
        if mismatch {
            return self.report_mismatch(now);
        }
        if levels.any_active() {
            return self.latch(TriggerSource::Button, now);
        }

        let released = a_edge == Some(false) || b_edge == Some(false);
        if released && matches!(self.state, EStopState::Triggered { .. }) {
            self.state = EStopState::ResetPending { since: now };
            tracing::info!("e-stop input released, reset pending");
            return EStopEvent::Released;
        }
        EStopEvent::None
    }

    fn track_mismatch(&mut self, levels: ChannelLevels, now: Timestamp) -> bool {
        if levels.agree() {
            self.mismatch_since = None;
            self.mismatch_reported = false;
            return false;
        }
        let since = *self.mismatch_since.get_or_insert(now);
        if self.mismatch_reported || now.saturating_sub(since) <= self.config.discrepancy() {
            return false;
        }
        self.mismatch_reported = true;
        true
    }

    fn report_mismatch(&mut self, now: Timestamp) -> EStopEvent {
        match self.state {
            EStopState::Triggered { at, .. } => {
                self.state = EStopState::Triggered {
                    source: TriggerSource::ChannelMismatch,
                    at,
                };
                tracing::error!(
                    levels = ?self.channel_levels(),
                    "e-stop channels disagree beyond the discrepancy window"
                );
                EStopEvent::Triggered(TriggerSource::ChannelMismatch)
            }
            EStopState::Ready | EStopState::ResetPending { .. } => {
                self.latch(TriggerSource::ChannelMismatch, now)
            }
        }
    }

    fn latch(&mut self, source: TriggerSource, now: Timestamp) -> EStopEvent {
        if matches!(self.state, EStopState::Triggered { .. }) {
            return EStopEvent::None;
        }
        self.state = EStopState::Triggered { source, at: now };
        self.latched_at = Some(now);
        self.stats.trigger_count = self.stats.trigger_count.saturating_add(1);
        tracing::error!(source = %source, at_us = now.as_micros(), "emergency stop triggered");
        EStopEvent::Triggered(source)
    }

    /// Latch from software or a fault.
    pub fn trigger(&mut self, source: TriggerSource, now: Timestamp) -> EStopEvent {
        self.latch(source, now)
    }

    /// Ask to clear the latch.
    ///
    /// # Errors
    ///
    /// Returns [`EStopError::ResetRefused`] unless the latch is set, both
    /// channels are released and agree, and `min_latch_ms` has elapsed since
    /// the trigger.
    pub fn request_reset(&mut self, now: Timestamp) -> EStopResult<EStopEvent> {
        let refuse = |reason| {
            tracing::warn!(reason = %reason, "e-stop reset refused");
            Err(EStopError::ResetRefused(reason))
        };
        let Some(latched_at) = self.latched_at.filter(|_| self.state.is_latched()) else {
            return refuse(ResetRefusal::NotTriggered);
        };
        let levels = self.channel_levels();
        if !levels.agree() {
            return refuse(ResetRefusal::ChannelsDisagree);
        }
        if levels.any_active() || self.debounce_a.is_settling() || self.debounce_b.is_settling() {
            return refuse(ResetRefusal::InputActive);
        }
        if now.saturating_sub(latched_at) < self.config.min_latch() {
            return refuse(ResetRefusal::LatchTimeNotElapsed);
        }

        self.state = EStopState::Ready;
        self.latched_at = None;
        self.mismatch_since = None;
        self.mismatch_reported = false;
        tracing::info!(
            latched_us = now.saturating_sub(latched_at).as_micros(),
            "e-stop reset accepted"
        );
        Ok(EStopEvent::ResetAccepted)
    }

    /// Record how long disabling the outputs took.
    pub fn record_response(
        &mut self,
        triggered_at: Timestamp,
        completed_at: Timestamp,
    ) -> ResponseCheck {
        let elapsed = completed_at.saturating_sub(triggered_at);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let within_budget = elapsed <= self.config.max_response();

        self.stats.last_response_us = micros;
        self.stats.worst_response_us = self.stats.worst_response_us.max(micros);
        if within_budget {
            tracing::debug!(response_us = micros, "e-stop response within budget");
        } else {
            self.stats.violations = self.stats.violations.saturating_add(1);
            tracing::error!(
                response_us = micros,
                budget_ms = self.config.max_response_ms,
                "e-stop response exceeded budget"
            );
        }
        ResponseCheck {
            micros,
            within_budget,
        }
    }

    /// Whether the latch is set.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.state.is_latched()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EStopState {
        self.state
    }

    /// When the latch was last set.
    #[must_use]
    pub fn latched_at(&self) -> Option<Timestamp> {
        self.latched_at
    }

    /// Response statistics.
    #[must_use]
    pub fn stats(&self) -> ResponseStats {
        self.stats
    }

    /// Debounced channel levels.
    #[must_use]
    pub fn channel_levels(&self) -> ChannelLevels {
        ChannelLevels {
            a_active: self.debounce_a.stable(),
            b_active: self.channel_b.as_ref().map(|_| self.debounce_b.stable()),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EStopConfig {
        &self.config
    }
}
