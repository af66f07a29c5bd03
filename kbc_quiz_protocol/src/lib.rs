// kbc_quiz_protocol — wire protocol between the quiz screens and the relay.
//
// This crate defines the message types, the question model, and the framing
// used by the relay (`kbc_quiz_relay`) and by the host and player endpoints.
// It has no dependency on the screen state machines (`kbc_quiz_game`).
//
// Module overview:
// - `types.rs`:    `ConnectionId` and `Role`.
// - `question.rs`: `Question` and its "correct answer is an option" invariant.
// - `message.rs`:  `ClientMessage` / `ServerMessage` and their payloads
//                  (`GameStart`, `AnswerSubmission`, `DepartedPeer`).
// - `framing.rs`:  4-byte big-endian length prefix + JSON body over any
//                  `Read`/`Write` stream.
//
// JSON keeps frames readable when debugging with a packet capture, and the
// messages are small. No async runtime: framing works on blocking streams.

pub mod framing;
pub mod message;
pub mod question;
pub mod types;

pub use framing::{FrameError, MAX_FRAME_SIZE, read_frame, write_frame};
pub use message::{
    AnswerSubmission, ClientMessage, DepartedPeer, GameStart, PROTOCOL_VERSION, ServerMessage,
};
pub use question::{OPTION_COUNT, Question, QuestionError};
pub use types::{ConnectionId, Role};

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_answer() -> AnswerSubmission {
        AnswerSubmission {
            question: "2. What is the capital of France?".into(),
            selected_answer: "Paris".into(),
            current_question_index: 1,
            player_name: "Alice".into(),
        }
    }

    #[test]
    fn answer_result_carries_the_answer_payload_unchanged() {
        let answer = sample_answer();
        let json = serde_json::to_value(ClientMessage::Answer(answer.clone())).unwrap();
        let echoed = serde_json::to_value(ServerMessage::AnswerResult(answer)).unwrap();
        assert_eq!(json["Answer"], echoed["AnswerResult"]);
    }

    #[test]
    fn failed_start_has_no_questions_field() {
        let msg = ServerMessage::GameStarted(GameStart::Failed {
            error: "question source unavailable".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        let payload = &json["GameStarted"]["Failed"];
        assert_eq!(payload["error"], "question source unavailable");
        assert!(payload.get("questions").is_none());
    }

    #[test]
    fn game_start_error_accessor() {
        let ready = GameStart::Ready {
            questions: vec![],
            player_name: "Alice".into(),
        };
        assert_eq!(ready.error(), None);
        let failed = GameStart::Failed {
            error: "boom".into(),
        };
        assert_eq!(failed.error(), Some("boom"));
    }

    #[test]
    fn departed_peer_variants_survive_the_wire() {
        for peer in [
            DepartedPeer::Connection(ConnectionId(7)),
            DepartedPeer::Name("Alice".into()),
        ] {
            let msg = ServerMessage::PlayerDisconnected { peer };
            let json = serde_json::to_vec(&msg).unwrap();
            let back: ServerMessage = serde_json::from_slice(&json).unwrap();
            assert_eq!(back, msg);
        }
    }

    #[test]
    fn hello_names_the_role() {
        let json = serde_json::to_string(&ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            role: Role::Host,
        })
        .unwrap();
        assert!(json.contains("\"Host\""), "{json}");
    }
}
