// kbc_quiz_game — host and player screen state machines for the KBC quiz.
//
// Both screens are pure reducers with no I/O: relay messages go in through
// `apply`, the passage of time through `tick(now)`, and local player actions
// return the `ClientMessage`s to send. Whatever owns the network connection
// (`kbc_quiz_relay::NetClient` in the integration tests) pumps messages
// between the two.
//
// Module overview:
// - `config.rs`:      `ScreenConfig` (advance delay, automatic/manual mode).
// - `progression.rs`: `ProgressionTimer`, the index-guarded delayed advance,
//                     and the shared `advance` rule.
// - `answers.rs`:     `AnswerLog` (one immutable answer per question),
//                     feedback, option colouring, final tally.
// - `round.rs`:       `Round`, one game's local projection of the session.
// - `host.rs`:        `HostScreen`, the display.
// - `player.rs`:      `PlayerScreen`, the controller.
//
// The host and player each run their own timer; nothing synchronises them
// beyond the relayed messages, so they may advance a few milliseconds apart.

pub mod answers;
pub mod config;
pub mod host;
pub mod player;
pub mod progression;
pub mod round;

pub use answers::{AnswerLog, Feedback, FinalTally, OptionMark, RecordedAnswer};
pub use config::{AdvanceMode, DEFAULT_ADVANCE_DELAY, ScreenConfig};
pub use host::{HostPhase, HostScreen};
pub use player::{PlayerError, PlayerPhase, PlayerScreen};
pub use progression::{Advance, ProgressionTimer, advance};
pub use round::Round;
