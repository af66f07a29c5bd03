// Session state for the quiz relay.
//
// `Session` is the central data structure that `server.rs` drives. It owns
// the connected endpoints, the question source, and the one canonical game
// snapshot (question set, progress, player name). All mutation happens
// through methods called from the server's single-threaded main loop, so
// each inbound event is handled to completion before the next one and no
// internal locking is needed.
//
// Fan-out rules, per inbound event:
// - `PlayerAccessed`, `GameStarted`, `AnswerResult`, `NextButtonState`: every
//   connection, sender included.
// - `MoveToNextQuestion`: every connection except the sender, which has
//   already advanced locally.
// - `PlayerDisconnected`: every surviving connection (the departed one is
//   gone, or is the sender of its own unmount notice).
//
// The relay never scores answers. It only tracks how far the game has
// progressed so its snapshot stays meaningful; the screens run their own
// progression and are not reconciled against it.
//
// Writing to endpoints: each endpoint has its own writer thread fed by a
// bounded outbox (`mpsc::sync_channel`). Broadcasting only enqueues, so the
// main loop never waits on a socket. An endpoint whose outbox fills up has
// stopped reading; it is shut down and removed like any other departure, and
// everyone else keeps being served. A write error on one connection ends its
// writer thread; the reader thread for that connection will hit the broken
// pipe and report a disconnect.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread;

use kbc_quiz_protocol::framing::write_frame;
use kbc_quiz_protocol::message::{
    AnswerSubmission, DepartedPeer, GameStart, PROTOCOL_VERSION, ServerMessage,
};
use kbc_quiz_protocol::question::Question;
use kbc_quiz_protocol::types::{ConnectionId, Role};
use serde::Serialize;

use crate::source::{QuestionSource, SourceError};

/// The relay's canonical view of the running game. Replaced wholesale by the
/// next successful start.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub questions: Vec<Question>,
    /// Index of the question currently being asked.
    pub current_index: usize,
    pub player_name: String,
    /// Set once the last question has been answered.
    pub finished: bool,
}

impl SessionSnapshot {
    fn new(questions: Vec<Question>, player_name: String) -> Self {
        Self {
            questions,
            current_index: 0,
            player_name,
            finished: false,
        }
    }

    /// An answer for `index` means the game has moved past it. Replayed or
    /// stale answers never move progress backwards.
    fn record_answer(&mut self, index: usize) {
        if index >= self.questions.len() {
            return;
        }
        if index + 1 < self.questions.len() {
            self.current_index = self.current_index.max(index + 1);
        } else {
            self.finished = true;
        }
    }
}

struct Endpoint {
    role: Role,
    /// Kept for shutdown; the writer thread owns its own clone.
    stream: TcpStream,
    outbox: SyncSender<ServerMessage>,
}

/// Drain an endpoint's outbox onto its socket. Ends when the session drops
/// the sender or a write fails.
fn writer_loop(id: ConnectionId, stream: TcpStream, outbox: Receiver<ServerMessage>) {
    let mut writer = BufWriter::new(stream);
    for msg in outbox {
        if let Err(e) = write_frame(&mut writer, &msg) {
            log::debug!("write to {id} failed: {e}");
            break;
        }
    }
}

/// Relay session for the single quiz room.
pub struct Session {
    endpoints: BTreeMap<ConnectionId, Endpoint>,
    next_connection_id: u32,
    max_connections: usize,
    outbox_capacity: usize,
    question_count: usize,
    source: Box<dyn QuestionSource>,
    snapshot: Option<SessionSnapshot>,
}

impl Session {
    /// `outbox_capacity` is how many messages may queue for one endpoint
    /// before it counts as stalled and is dropped.
    pub fn new(
        source: Box<dyn QuestionSource>,
        question_count: usize,
        max_connections: usize,
        outbox_capacity: usize,
    ) -> Self {
        Self {
            endpoints: BTreeMap::new(),
            next_connection_id: 0,
            max_connections,
            outbox_capacity,
            question_count,
            source,
            snapshot: None,
        }
    }

    /// Register a connection that sent `Hello`. Sends `Welcome` and returns
    /// the assigned ID, or returns the rejection reason. The caller owns
    /// telling a rejected endpoint why.
    pub fn add_connection(
        &mut self,
        role: Role,
        protocol_version: u32,
        stream: TcpStream,
    ) -> Result<ConnectionId, String> {
        if protocol_version != PROTOCOL_VERSION {
            return Err("protocol version mismatch".into());
        }
        if self.endpoints.len() >= self.max_connections {
            return Err("relay is full".into());
        }

        let write_half = stream
            .try_clone()
            .map_err(|e| format!("could not clone stream: {e}"))?;

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        let (outbox, rx) = mpsc::sync_channel(self.outbox_capacity);
        thread::spawn(move || writer_loop(id, write_half, rx));
        self.endpoints.insert(
            id,
            Endpoint {
                role,
                stream,
                outbox,
            },
        );
        log::info!("{role} connected as {id}");

        self.send_to(id, &ServerMessage::Welcome { connection_id: id });
        Ok(id)
    }

    /// Drop a connection and tell everyone left behind.
    pub fn remove_connection(&mut self, id: ConnectionId) {
        let Some(endpoint) = self.endpoints.remove(&id) else {
            return;
        };
        log::info!("{} {id} disconnected", endpoint.role);
        endpoint.stream.shutdown(Shutdown::Both).ok();
        self.broadcast(&ServerMessage::PlayerDisconnected {
            peer: DepartedPeer::Connection(id),
        });
    }

    /// A player screen was opened.
    pub fn player_accessed(&mut self, from: ConnectionId) {
        log::debug!("player screen opened on {from}");
        self.broadcast(&ServerMessage::PlayerAccessed);
    }

    /// Fetch a fresh question set and start (or restart) the game for
    /// everyone. A source failure is reported as `GameStart::Failed` and
    /// leaves the previous snapshot in place.
    pub fn start_game(&mut self, from: ConnectionId, name: String) {
        let name = name.trim().to_string();
        if name.is_empty() {
            log::warn!("ignoring start request without a name from {from}");
            return;
        }

        let outcome = match self.fetch_questions() {
            Ok(questions) => {
                log::info!(
                    "starting game for {name:?} with {} questions",
                    questions.len()
                );
                self.snapshot = Some(SessionSnapshot::new(questions.clone(), name.clone()));
                GameStart::Ready {
                    questions,
                    player_name: name,
                }
            }
            Err(e) => {
                log::warn!("could not start game for {name:?}: {e}");
                GameStart::Failed {
                    error: e.to_string(),
                }
            }
        };
        self.broadcast(&ServerMessage::GameStarted(outcome));
    }

    /// Re-broadcast an answer verbatim. No correctness check happens here.
    pub fn answer(&mut self, from: ConnectionId, submission: AnswerSubmission) {
        log::debug!(
            "answer from {from} for question {}: {:?}",
            submission.current_question_index,
            submission.selected_answer
        );
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.record_answer(submission.current_question_index);
        }
        self.broadcast(&ServerMessage::AnswerResult(submission));
    }

    /// The sender already advanced; everyone else should follow.
    pub fn move_to_next_question(&mut self, from: ConnectionId) {
        self.broadcast_except(from, &ServerMessage::MoveToNextQuestion);
    }

    /// Manual-advance mode: unlock the next button everywhere.
    pub fn enable_next_button(&mut self, _from: ConnectionId) {
        self.broadcast(&ServerMessage::NextButtonState { disabled: false });
    }

    /// The player screen announced it is going away.
    pub fn player_disconnect_notice(&mut self, from: ConnectionId, name: String) {
        log::info!("player {name:?} on {from} left the game");
        self.broadcast_except(
            from,
            &ServerMessage::PlayerDisconnected {
                peer: DepartedPeer::Name(name),
            },
        );
    }

    /// Shut down every connection. Unblocks their reader threads.
    pub fn close_all(&mut self) {
        for (id, endpoint) in std::mem::take(&mut self.endpoints) {
            log::debug!("closing {id}");
            endpoint.stream.shutdown(Shutdown::Both).ok();
        }
    }

    /// Returns the number of connected endpoints.
    pub fn connection_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn role_of(&self, id: ConnectionId) -> Option<Role> {
        self.endpoints.get(&id).map(|e| e.role)
    }

    /// The current game, if one has been started.
    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        self.snapshot.as_ref()
    }

    fn fetch_questions(&mut self) -> Result<Vec<Question>, SourceError> {
        let questions = self.source.fetch(self.question_count)?;
        if questions.is_empty() {
            return Err(SourceError::Empty);
        }
        for (index, question) in questions.iter().enumerate() {
            question
                .validate()
                .map_err(|source| SourceError::InvalidQuestion { index, source })?;
        }
        Ok(questions)
    }

    fn send_to(&mut self, id: ConnectionId, msg: &ServerMessage) {
        self.deliver(vec![id], msg);
    }

    fn broadcast(&mut self, msg: &ServerMessage) {
        let ids: Vec<ConnectionId> = self.endpoints.keys().copied().collect();
        self.deliver(ids, msg);
    }

    fn broadcast_except(&mut self, excluded: ConnectionId, msg: &ServerMessage) {
        let ids: Vec<ConnectionId> = self
            .endpoints
            .keys()
            .copied()
            .filter(|id| *id != excluded)
            .collect();
        self.deliver(ids, msg);
    }

    /// Queue `msg` for each of `ids`. Endpoints whose outbox is full are
    /// removed once the message has gone to everyone else.
    fn deliver(&mut self, ids: Vec<ConnectionId>, msg: &ServerMessage) {
        let mut stalled = Vec::new();
        for id in ids {
            let Some(endpoint) = self.endpoints.get(&id) else {
                continue;
            };
            match endpoint.outbox.try_send(msg.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("{id} is not reading; dropping it");
                    stalled.push(id);
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::debug!("writer for {id} has exited; skipping");
                }
            }
        }
        for id in stalled {
            self.remove_connection(id);
        }
    }
}
