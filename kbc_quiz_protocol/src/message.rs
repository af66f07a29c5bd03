// Protocol messages exchanged between the screens and the relay.
//
// Two enums define the full vocabulary:
// - `ClientMessage`: sent by a host or player endpoint to the relay.
// - `ServerMessage`: sent by the relay to endpoints.
//
// Most relay reactions are a straight re-broadcast (`Answer` comes back as
// `AnswerResult` with the same payload), so the payload structs are shared by
// both directions. The fan-out for each event lives in the relay's session;
// the comments below only say what each message means.

use serde::{Deserialize, Serialize};

use crate::question::Question;
use crate::types::{ConnectionId, Role};

/// Bumped whenever a message shape changes. The relay rejects a `Hello` that
/// carries any other version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages sent by an endpoint to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Handshake; must be the first frame on a connection.
    Hello { protocol_version: u32, role: Role },
    /// The player screen was opened.
    PlayerAccessed,
    /// Start (or restart) the game under this display name.
    StartGame { name: String },
    /// The player's one answer for a question.
    Answer(AnswerSubmission),
    /// The sender has already advanced locally; tell everyone else.
    MoveToNextQuestion,
    /// Manual-advance mode: an answer is in, the next button may be used.
    EnableNextButton,
    /// The player screen is going away.
    PlayerDisconnected { name: String },
    /// Endpoint is leaving gracefully.
    Goodbye,
}

/// Messages sent by the relay to an endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted.
    Welcome { connection_id: ConnectionId },
    /// Handshake rejected; the connection is closed afterwards.
    Rejected { reason: String },
    /// A player screen was opened.
    PlayerAccessed,
    /// Result of a start request.
    GameStarted(GameStart),
    /// An answer, exactly as the player submitted it.
    AnswerResult(AnswerSubmission),
    /// Another endpoint advanced past the current question.
    MoveToNextQuestion,
    /// Manual-advance gate for the next button.
    NextButtonState { disabled: bool },
    /// A peer went away.
    PlayerDisconnected { peer: DepartedPeer },
}

/// Outcome of a `StartGame` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameStart {
    /// Fresh question set for everyone.
    Ready {
        questions: Vec<Question>,
        player_name: String,
    },
    /// The question source failed; nothing starts.
    Failed { error: String },
}

impl GameStart {
    pub fn error(&self) -> Option<&str> {
        match self {
            GameStart::Failed { error } => Some(error),
            GameStart::Ready { .. } => None,
        }
    }
}

/// A player's answer to one question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    /// Question text, for display on receivers.
    pub question: String,
    pub selected_answer: String,
    /// Index of the question this answer belongs to. Receivers score against
    /// their own copy of the question at this index.
    pub current_question_index: usize,
    pub player_name: String,
}

/// Identity of a departed peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartedPeer {
    /// The transport connection closed.
    Connection(ConnectionId),
    /// The player screen announced its own departure.
    Name(String),
}
