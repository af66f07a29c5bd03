// Screen configuration shared by the host and player state machines.
//
// Both screens run the same progression algorithm, so they share one config
// type. `advance_delay` is how long a scored answer stays on screen before the
// question advances; `advance_mode` picks between the timed advance and the
// manual next button.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long feedback is shown before the next question.
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_secs(2);

/// How a screen moves on after an answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceMode {
    /// Advance `advance_delay` after an answer is scored.
    #[default]
    Automatic,
    /// The player presses a next button, which the relay unlocks once an
    /// answer is in.
    Manual,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub advance_delay: Duration,
    pub advance_mode: AdvanceMode,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            advance_delay: DEFAULT_ADVANCE_DELAY,
            advance_mode: AdvanceMode::Automatic,
        }
    }
}

impl ScreenConfig {
    pub fn manual() -> Self {
        Self {
            advance_mode: AdvanceMode::Manual,
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            advance_delay: delay,
            ..Self::default()
        }
    }
}
