//! Countdown status indicator

use serde::{Deserialize, Serialize};

use crate::state::TimerState;

/// Background tint that escalates as the phase nears its end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tint {
    Calm,
    Warning,
    Urgent,
}

impl Tint {
    pub fn for_remaining(remaining_seconds: u64) -> Self {
        match remaining_seconds {
            0..=60 => Tint::Urgent,
            61..=300 => Tint::Warning,
            _ => Tint::Calm,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Tint::Calm => "#1e8e3e",
            Tint::Warning => "#f29900",
            Tint::Urgent => "#d93025",
        }
    }
}

/// Short label plus tint; empty text while idle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub tint: Tint,
    pub color: String,
}

impl Badge {
    pub fn idle() -> Self {
        Self::with_tint(String::new(), Tint::Calm)
    }

    /// Minutes (rounded up) above one minute, seconds at or below it
    pub fn for_remaining(remaining_seconds: u64) -> Self {
        let text = if remaining_seconds > 60 {
            format!("{}m", remaining_seconds.div_ceil(60))
        } else {
            format!("{}s", remaining_seconds)
        };
        Self::with_tint(text, Tint::for_remaining(remaining_seconds))
    }

    pub fn for_state(state: &TimerState) -> Self {
        if state.is_running {
            Self::for_remaining(state.remaining_seconds)
        } else {
            Self::idle()
        }
    }

    fn with_tint(text: String, tint: Tint) -> Self {
        Self {
            text,
            tint,
            color: tint.color().to_string(),
        }
    }
}

impl Default for Badge {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_switches_from_minutes_to_seconds_at_one_minute() {
        assert_eq!(Badge::for_remaining(1500).text, "25m");
        assert_eq!(Badge::for_remaining(61).text, "2m");
        assert_eq!(Badge::for_remaining(60).text, "60s");
        assert_eq!(Badge::for_remaining(0).text, "0s");
    }

    #[test]
    fn tint_escalates_at_five_minutes_and_one_minute() {
        assert_eq!(Badge::for_remaining(301).tint, Tint::Calm);
        assert_eq!(Badge::for_remaining(300).tint, Tint::Warning);
        assert_eq!(Badge::for_remaining(61).tint, Tint::Warning);
        assert_eq!(Badge::for_remaining(60).tint, Tint::Urgent);
        assert_eq!(Badge::for_remaining(60).color, "#d93025");
    }

    #[test]
    fn idle_badge_is_blank() {
        assert_eq!(Badge::idle().text, "");
    }
}
