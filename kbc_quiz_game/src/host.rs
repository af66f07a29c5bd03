// Host display state machine.
//
// `HostScreen` is a reducer over relay messages: `apply` folds one
// `ServerMessage` into the state, `tick` runs the timed advance, and the
// query methods expose plain data for whatever front-end renders the screen.
// The host never sends anything of its own, so neither method returns
// outgoing messages.
//
// Phase is derived rather than stored:
// - no round, no player seen yet            -> `Idle`
// - no round, a player screen was opened    -> `WaitingForPlayer`
// - a round that is still asking questions  -> `InGame { index }`
// - a round past its last question          -> `Finished`
//
// The disconnect flag is an overlay on top of the phase. While it is set the
// question panel is suppressed (`visible_question` returns `None`), but the
// round keeps running and its tallies are never touched. Only the next
// `GameStarted(Ready)` clears it.
//
// See also: `player.rs` for the other side, `round.rs` for the shared
// scoring and advancement rules.

use std::time::Instant;

use kbc_quiz_protocol::message::{AnswerSubmission, DepartedPeer, GameStart, ServerMessage};
use kbc_quiz_protocol::question::{OPTION_COUNT, Question};

use crate::answers::{Feedback, FinalTally, OptionMark};
use crate::config::{AdvanceMode, ScreenConfig};
use crate::round::Round;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostPhase {
    Idle,
    WaitingForPlayer,
    InGame { index: usize },
    Finished,
}

#[derive(Clone, Debug)]
pub struct HostScreen {
    config: ScreenConfig,
    player_accessed: bool,
    departed: Option<DepartedPeer>,
    round: Option<Round>,
    last_start_error: Option<String>,
}

impl Default for HostScreen {
    fn default() -> Self {
        Self::new(ScreenConfig::default())
    }
}

impl HostScreen {
    pub fn new(config: ScreenConfig) -> Self {
        Self {
            config,
            player_accessed: false,
            departed: None,
            round: None,
            last_start_error: None,
        }
    }

    /// Fold one relay message into the host state.
    pub fn apply(&mut self, msg: &ServerMessage, now: Instant) {
        match msg {
            ServerMessage::PlayerAccessed => {
                self.player_accessed = true;
            }
            ServerMessage::GameStarted(GameStart::Ready {
                questions,
                player_name,
            }) => {
                log::info!(
                    "host: game started for {player_name:?} with {} questions",
                    questions.len()
                );
                self.round = Some(Round::new(
                    questions.clone(),
                    player_name.clone(),
                    self.config.advance_delay,
                ));
                self.departed = None;
                self.last_start_error = None;
            }
            ServerMessage::GameStarted(GameStart::Failed { error }) => {
                log::warn!("host: game failed to start: {error}");
                self.last_start_error = Some(error.clone());
            }
            ServerMessage::AnswerResult(submission) => self.answer_result(submission),
            ServerMessage::MoveToNextQuestion => self.move_to_next_question(now),
            ServerMessage::PlayerDisconnected { peer } => {
                log::info!("host: player disconnected ({peer:?})");
                self.departed = Some(peer.clone());
            }
            ServerMessage::NextButtonState { .. }
            | ServerMessage::Welcome { .. }
            | ServerMessage::Rejected { .. } => {}
        }
    }

    /// Run the timed advance if it is due.
    pub fn tick(&mut self, now: Instant) {
        if let Some(round) = self.round.as_mut() {
            round.tick(now);
        }
    }

    fn answer_result(&mut self, submission: &AnswerSubmission) {
        let Some(round) = self.round.as_mut() else {
            log::debug!("host: answer before any game started, ignoring");
            return;
        };
        round.score(
            submission.current_question_index,
            &submission.selected_answer,
            &submission.player_name,
        );
    }

    fn move_to_next_question(&mut self, now: Instant) {
        let Some(round) = self.round.as_mut() else {
            log::debug!("host: move before any game started, ignoring");
            return;
        };
        match self.config.advance_mode {
            AdvanceMode::Automatic => round.arm_advance(now),
            AdvanceMode::Manual => {
                round.advance_now();
            }
        }
    }

    pub fn phase(&self) -> HostPhase {
        match &self.round {
            Some(round) => match round.current_index() {
                Some(index) => HostPhase::InGame { index },
                None => HostPhase::Finished,
            },
            None if self.player_accessed => HostPhase::WaitingForPlayer,
            None => HostPhase::Idle,
        }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn player_accessed(&self) -> bool {
        self.player_accessed
    }

    pub fn player_name(&self) -> Option<&str> {
        self.round.as_ref().map(Round::player_name)
    }

    pub fn questions(&self) -> &[Question] {
        self.round.as_ref().map_or(&[][..], Round::questions)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.round.as_ref().and_then(Round::current_index)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.round.as_ref().and_then(Round::current_question)
    }

    /// The question to draw, or `None` while the disconnect notice is up.
    pub fn visible_question(&self) -> Option<&Question> {
        if self.departed.is_some() {
            return None;
        }
        self.current_question()
    }

    pub fn option_marks(&self) -> Option<[OptionMark; OPTION_COUNT]> {
        self.round.as_ref().and_then(Round::option_marks)
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.round.as_ref().and_then(Round::feedback)
    }

    pub fn correct_count(&self) -> usize {
        self.round.as_ref().map_or(0, Round::correct_count)
    }

    pub fn is_player_disconnected(&self) -> bool {
        self.departed.is_some()
    }

    pub fn departed_peer(&self) -> Option<&DepartedPeer> {
        self.departed.as_ref()
    }

    /// Final score; only available in `Finished`.
    pub fn tally(&self) -> Option<FinalTally> {
        self.round.as_ref().and_then(Round::tally)
    }

    pub fn last_start_error(&self) -> Option<&str> {
        self.last_start_error.as_deref()
    }

    pub fn is_advance_pending(&self) -> bool {
        self.round.as_ref().is_some_and(Round::is_advance_pending)
    }
}
