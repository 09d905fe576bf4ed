//! Timer state structure and wall-clock reconstruction

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

/// Purpose of the current countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    /// Work is the phase during which distracting domains are blocked
    pub fn is_blocking(self) -> bool {
        matches!(self, Phase::Work)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Break => "break",
        }
    }
}

/// Configured phase lengths.
///
/// `break_seconds: None` selects the single-session variant: the timer stops
/// when the work phase expires instead of alternating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub work_seconds: u64,
    pub break_seconds: Option<u64>,
}

impl PhaseDurations {
    pub fn new(work_seconds: u64, break_seconds: Option<u64>) -> Result<Self> {
        if work_seconds == 0 {
            return Err(GuardError::InvalidDuration("work duration must be positive".to_string()));
        }
        if break_seconds == Some(0) {
            return Err(GuardError::InvalidDuration("break duration must be positive".to_string()));
        }
        Ok(Self { work_seconds, break_seconds })
    }

    /// Work/break cycle given in minutes; a zero or missing break disables the break phase
    pub fn cyclic(work_minutes: u64, break_minutes: Option<u64>) -> Result<Self> {
        let work_seconds = minutes_to_seconds(work_minutes, "work")?;
        let break_seconds = match break_minutes.filter(|m| *m > 0) {
            Some(minutes) => Some(minutes_to_seconds(minutes, "break")?),
            None => None,
        };
        Self::new(work_seconds, break_seconds)
    }

    /// Single fixed-duration session with no break phase
    pub fn session(seconds: u64) -> Result<Self> {
        Self::new(seconds, None)
    }

    pub fn has_break(&self) -> bool {
        self.break_seconds.is_some()
    }

    pub fn for_phase(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_seconds,
            Phase::Break => self.break_seconds.unwrap_or(self.work_seconds),
        }
    }
}

fn minutes_to_seconds(minutes: u64, phase: &str) -> Result<u64> {
    minutes
        .checked_mul(60)
        .ok_or_else(|| GuardError::InvalidDuration(format!("{} duration of {} minutes is too long", phase, minutes)))
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            work_seconds: 25 * 60,
            break_seconds: Some(5 * 60),
        }
    }
}

/// Body of a start command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartRequest {
    Cycle {
        #[serde(rename = "workDurationMinutes")]
        work_duration_minutes: u64,
        #[serde(rename = "breakDurationMinutes", default)]
        break_duration_minutes: Option<u64>,
    },
    Session {
        #[serde(rename = "durationSeconds")]
        duration_seconds: u64,
    },
}

impl StartRequest {
    pub fn durations(&self) -> Result<PhaseDurations> {
        match *self {
            StartRequest::Cycle { work_duration_minutes, break_duration_minutes } => {
                PhaseDurations::cyclic(work_duration_minutes, break_duration_minutes)
            }
            StartRequest::Session { duration_seconds } => PhaseDurations::session(duration_seconds),
        }
    }
}

/// The canonical timer record, persisted after every mutation.
///
/// `remaining_seconds` is exact at `last_persisted_at`; readers reconstruct the
/// live value with [`TimerState::live_remaining`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_running: bool,
    pub phase: Phase,
    pub work_duration_seconds: u64,
    pub break_duration_seconds: Option<u64>,
    pub remaining_seconds: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_persisted_at: DateTime<Utc>,
}

impl TimerState {
    /// Create an idle timer showing the full work duration
    pub fn idle(durations: PhaseDurations, now: DateTime<Utc>) -> Self {
        Self {
            is_running: false,
            phase: Phase::Work,
            work_duration_seconds: durations.work_seconds,
            break_duration_seconds: durations.break_seconds,
            remaining_seconds: durations.work_seconds,
            last_persisted_at: now,
        }
    }

    pub fn durations(&self) -> PhaseDurations {
        PhaseDurations {
            work_seconds: self.work_duration_seconds,
            break_seconds: self.break_duration_seconds,
        }
    }

    /// Whole seconds since the snapshot was taken; a clock that moved backwards counts as zero
    pub fn elapsed_whole_seconds(&self, now: DateTime<Utc>) -> u64 {
        let elapsed_ms = (now - self.last_persisted_at).num_milliseconds();
        if elapsed_ms <= 0 {
            0
        } else {
            (elapsed_ms / 1000) as u64
        }
    }

    /// `max(0, remaining - floor((now - last_persisted_at) / 1s))` while running
    pub fn live_remaining(&self, now: DateTime<Utc>) -> u64 {
        if !self.is_running {
            return self.remaining_seconds;
        }
        self.remaining_seconds.saturating_sub(self.elapsed_whole_seconds(now))
    }

    /// Whether the wall clock was set back past the anchor
    pub fn anchored_after(&self, now: DateTime<Utc>) -> bool {
        now < self.last_persisted_at
    }

    /// Copy of this state brought forward to `now`.
    ///
    /// The anchor moves by whole seconds only, so the projection still satisfies
    /// the reconstruction formula for any later reader. A clock that jumped back
    /// re-anchors at `now` with the remaining time unchanged.
    pub fn projected(&self, now: DateTime<Utc>) -> Self {
        if !self.is_running {
            return self.clone();
        }
        if self.anchored_after(now) {
            return Self {
                last_persisted_at: now,
                ..self.clone()
            };
        }
        let elapsed = self.elapsed_whole_seconds(now).min(self.remaining_seconds);
        Self {
            remaining_seconds: self.remaining_seconds - elapsed,
            last_persisted_at: self.last_persisted_at + Duration::seconds(elapsed as i64),
            ..self.clone()
        }
    }

    /// Blocking rules must exist exactly when this holds
    pub fn blocking_active(&self) -> bool {
        self.is_running && self.phase.is_blocking()
    }
}

/// `MM:SS`, with minutes growing past two digits when needed
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clock_format_pads_both_fields() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(6001), "100:01");
    }

    fn running(remaining: u64, at: DateTime<Utc>) -> TimerState {
        TimerState {
            is_running: true,
            remaining_seconds: remaining,
            ..TimerState::idle(PhaseDurations::default(), at)
        }
    }

    #[test]
    fn snapshot_uses_camel_case_and_epoch_millis() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let state = TimerState::idle(PhaseDurations::default(), at);
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["isRunning"], false);
        assert_eq!(json["phase"], "work");
        assert_eq!(json["workDurationSeconds"], 1500);
        assert_eq!(json["breakDurationSeconds"], 300);
        assert_eq!(json["remainingSeconds"], 1500);
        assert_eq!(json["lastPersistedAt"], 1_700_000_000_123i64);

        let back: TimerState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn idle_state_does_not_count_down() {
        let at = Utc::now();
        let state = TimerState::idle(PhaseDurations::default(), at);
        assert_eq!(state.live_remaining(at + Duration::hours(3)), 1500);
    }

    #[test]
    fn backwards_clock_counts_as_no_elapsed_time() {
        let at = Utc::now();
        let state = running(100, at);
        assert_eq!(state.live_remaining(at - Duration::seconds(30)), 100);
    }

    #[test]
    fn backwards_clock_re_anchors_the_projection() {
        let at = Utc::now();
        let state = running(100, at);
        let earlier = at - Duration::minutes(30);

        let projected = state.projected(earlier);
        assert_eq!(projected.remaining_seconds, 100);
        assert_eq!(projected.last_persisted_at, earlier);
        assert_eq!(projected.live_remaining(earlier + Duration::seconds(10)), 90);
    }

    #[test]
    fn projection_keeps_fractional_seconds_in_the_anchor() {
        let at = Utc::now();
        let state = running(100, at);
        let later = at + Duration::milliseconds(2_700);

        let projected = state.projected(later);
        assert_eq!(projected.remaining_seconds, 98);
        assert_eq!(projected.last_persisted_at, at + Duration::seconds(2));
        assert_eq!(projected.live_remaining(at + Duration::seconds(3)), 97);
    }

    #[test]
    fn start_request_accepts_both_shapes() {
        let cycle: StartRequest =
            serde_json::from_str(r#"{"workDurationMinutes":25,"breakDurationMinutes":5}"#).unwrap();
        assert_eq!(cycle.durations().unwrap(), PhaseDurations::default());

        let session: StartRequest = serde_json::from_str(r#"{"durationSeconds":5}"#).unwrap();
        let durations = session.durations().unwrap();
        assert_eq!(durations.work_seconds, 5);
        assert!(!durations.has_break());
    }

    #[test]
    fn zero_break_minutes_disables_the_break_phase() {
        let durations = PhaseDurations::cyclic(50, Some(0)).unwrap();
        assert_eq!(durations.break_seconds, None);
    }

    #[test]
    fn zero_work_duration_is_rejected() {
        assert!(PhaseDurations::session(0).is_err());
        assert!(PhaseDurations::cyclic(0, Some(5)).is_err());
    }

    #[test]
    fn overflowing_minutes_are_rejected() {
        let huge = u64::MAX / 60 + 1;
        assert!(matches!(PhaseDurations::cyclic(25, Some(huge)), Err(GuardError::InvalidDuration(_))));
        assert!(matches!(PhaseDurations::cyclic(huge, Some(5)), Err(GuardError::InvalidDuration(_))));

        let request: StartRequest =
            serde_json::from_str(r#"{"workDurationMinutes":25,"breakDurationMinutes":307445734561825861}"#).unwrap();
        assert!(request.durations().is_err());
    }

    proptest! {
        #[test]
        fn live_remaining_follows_wall_clock(r in 0u64..100_000, gap in 0i64..200_000, ms in 0i64..1000) {
            let at = Utc::now();
            let state = running(r, at);
            let now = at + Duration::seconds(gap) + Duration::milliseconds(ms);
            prop_assert_eq!(state.live_remaining(now), r.saturating_sub(gap as u64));
        }
    }
}
