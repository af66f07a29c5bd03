// Player controller state machine.
//
// Unlike the host, the player drives the game: it opens the screen, asks for
// a start, and answers. Every local action returns the `ClientMessage`s the
// caller must send, so the state machine stays free of I/O and the order of
// outgoing messages is decided in one place.
//
// Scoring is local. When the player picks an option it is scored against the
// player's own copy of the question immediately; the `AnswerResult` echo from
// the relay is ignored, as is any relayed `MoveToNextQuestion`, since the
// player is the one that emitted them.
//
// Phase is derived the same way the host does it, with `AwaitingStart`
// taking precedence while a start request is outstanding. A failed start
// keeps the player in `AwaitingStart` with the error overlay set; there is no
// automatic retry.

use std::time::Instant;

use kbc_quiz_protocol::message::{AnswerSubmission, ClientMessage, GameStart, ServerMessage};
use kbc_quiz_protocol::question::{OPTION_COUNT, Question};

use crate::answers::{Feedback, FinalTally, OptionMark};
use crate::config::{AdvanceMode, ScreenConfig};
use crate::round::Round;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerPhase {
    Idle,
    AwaitingStart,
    InGame { index: usize },
    Finished,
}

/// A local action the player screen refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    #[error("enter a name to start")]
    MissingName,
    #[error("no question is being asked")]
    NotInGame,
    #[error("question {index} has already been answered")]
    AlreadyAnswered { index: usize },
    #[error("{option:?} is not an option for this question")]
    UnknownOption { option: String },
    #[error("the next button is only used in manual advance mode")]
    ManualAdvanceDisabled,
    #[error("answer question {index} before moving on")]
    NoAnswerYet { index: usize },
    #[error("a game is already in progress")]
    GameInProgress,
}

#[derive(Clone, Debug)]
pub struct PlayerScreen {
    config: ScreenConfig,
    name: String,
    awaiting_start: bool,
    round: Option<Round>,
    error: Option<String>,
    next_disabled: bool,
}

impl Default for PlayerScreen {
    fn default() -> Self {
        Self::new(ScreenConfig::default())
    }
}

impl PlayerScreen {
    pub fn new(config: ScreenConfig) -> Self {
        Self {
            config,
            name: String::new(),
            awaiting_start: false,
            round: None,
            error: None,
            next_disabled: true,
        }
    }

    /// The screen was opened.
    pub fn mount(&self) -> ClientMessage {
        ClientMessage::PlayerAccessed
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the start button should be enabled.
    pub fn can_start(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Ask the relay to start a game under the current name.
    pub fn request_start(&mut self) -> Result<ClientMessage, PlayerError> {
        if matches!(self.phase(), PlayerPhase::InGame { .. }) {
            return Err(PlayerError::GameInProgress);
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PlayerError::MissingName);
        }
        let name = name.to_string();
        self.awaiting_start = true;
        self.error = None;
        Ok(ClientMessage::StartGame { name })
    }

    /// Fold one relay message into the player state.
    pub fn apply(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::GameStarted(GameStart::Ready {
                questions,
                player_name,
            }) => {
                log::info!(
                    "player: game started for {player_name:?} with {} questions",
                    questions.len()
                );
                self.round = Some(Round::new(
                    questions.clone(),
                    player_name.clone(),
                    self.config.advance_delay,
                ));
                self.awaiting_start = false;
                self.error = None;
                self.next_disabled = true;
            }
            ServerMessage::GameStarted(GameStart::Failed { error }) => {
                log::warn!("player: game failed to start: {error}");
                self.error = Some(error.clone());
            }
            ServerMessage::NextButtonState { disabled } => {
                self.next_disabled = *disabled;
            }
            ServerMessage::AnswerResult(_)
            | ServerMessage::MoveToNextQuestion
            | ServerMessage::PlayerAccessed
            | ServerMessage::PlayerDisconnected { .. }
            | ServerMessage::Welcome { .. }
            | ServerMessage::Rejected { .. } => {}
        }
    }

    /// Answer the current question. Returns the messages to send.
    pub fn select_answer(
        &mut self,
        option: &str,
        now: Instant,
    ) -> Result<Vec<ClientMessage>, PlayerError> {
        let mode = self.config.advance_mode;
        let round = self.round.as_mut().ok_or(PlayerError::NotInGame)?;
        let index = round.current_index().ok_or(PlayerError::NotInGame)?;
        let question = round.current_question().ok_or(PlayerError::NotInGame)?;
        if !question.has_option(option) {
            return Err(PlayerError::UnknownOption {
                option: option.into(),
            });
        }
        if round.answers().is_answered(index) {
            return Err(PlayerError::AlreadyAnswered { index });
        }

        let submission = AnswerSubmission {
            question: question.text.clone(),
            selected_answer: option.into(),
            current_question_index: index,
            player_name: round.player_name().into(),
        };
        round.score(index, option, &submission.player_name);

        let follow_up = match mode {
            AdvanceMode::Automatic => {
                round.arm_advance(now);
                ClientMessage::MoveToNextQuestion
            }
            AdvanceMode::Manual => {
                self.next_disabled = false;
                ClientMessage::EnableNextButton
            }
        };
        Ok(vec![ClientMessage::Answer(submission), follow_up])
    }

    /// Manual mode: move on from an answered question.
    pub fn next_question(&mut self) -> Result<Vec<ClientMessage>, PlayerError> {
        if self.config.advance_mode != AdvanceMode::Manual {
            return Err(PlayerError::ManualAdvanceDisabled);
        }
        let round = self.round.as_mut().ok_or(PlayerError::NotInGame)?;
        let index = round.current_index().ok_or(PlayerError::NotInGame)?;
        if !round.answers().is_answered(index) {
            return Err(PlayerError::NoAnswerYet { index });
        }
        round.advance_now();
        self.next_disabled = true;
        Ok(vec![ClientMessage::MoveToNextQuestion])
    }

    /// Run the timed advance if it is due.
    pub fn tick(&mut self, now: Instant) {
        if let Some(round) = self.round.as_mut() {
            round.tick(now);
        }
    }

    /// The screen is going away.
    pub fn unmount(&mut self) -> ClientMessage {
        let name = match &self.round {
            Some(round) => round.player_name().to_string(),
            None => self.name.trim().to_string(),
        };
        ClientMessage::PlayerDisconnected { name }
    }

    pub fn phase(&self) -> PlayerPhase {
        if self.awaiting_start {
            return PlayerPhase::AwaitingStart;
        }
        match self.round.as_ref().map(Round::current_index) {
            Some(Some(index)) => PlayerPhase::InGame { index },
            Some(None) => PlayerPhase::Finished,
            None => PlayerPhase::Idle,
        }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Error banner text from a failed start.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
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

    pub fn option_marks(&self) -> Option<[OptionMark; OPTION_COUNT]> {
        self.round.as_ref().and_then(Round::option_marks)
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.round.as_ref().and_then(Round::feedback)
    }

    pub fn correct_count(&self) -> usize {
        self.round.as_ref().map_or(0, Round::correct_count)
    }

    pub fn tally(&self) -> Option<FinalTally> {
        self.round.as_ref().and_then(Round::tally)
    }

    /// Manual mode gate for the next button.
    pub fn next_disabled(&self) -> bool {
        self.next_disabled
    }

    pub fn is_advance_pending(&self) -> bool {
        self.round.as_ref().is_some_and(Round::is_advance_pending)
    }
}
