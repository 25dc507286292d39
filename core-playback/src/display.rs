//! Time formatting for the player screen.

use serde::{Deserialize, Serialize};

/// Render seconds as `HHh MMm SSs`.
///
/// Zero, negative and non-finite inputs render as `00h 00m 00s`. Hours are
/// not wrapped at 24.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.1
    };
    let total = seconds.floor() as u64;
    format!(
        "{:02}h {:02}m {:02}s",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Whether the clock shows elapsed or remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeDisplay {
    Elapsed,
    #[default]
    Remaining,
}

impl TimeDisplay {
    pub fn toggled(self) -> Self {
        match self {
            TimeDisplay::Elapsed => TimeDisplay::Remaining,
            TimeDisplay::Remaining => TimeDisplay::Elapsed,
        }
    }

    /// Seconds to show for the given position.
    pub fn seconds(self, current_time: f64, duration: Option<f64>) -> f64 {
        match (self, duration) {
            (TimeDisplay::Remaining, Some(duration)) => (duration - current_time).max(0.0),
            _ => current_time,
        }
    }

    /// Formatted clock text. Remaining time carries a leading `-`.
    pub fn render(self, current_time: f64, duration: Option<f64>) -> String {
        let text = format_timestamp(self.seconds(current_time, duration));
        match (self, duration) {
            (TimeDisplay::Remaining, Some(_)) => format!("-{}", text),
            _ => text,
        }
    }
}
