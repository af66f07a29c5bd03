// TCP server and main event loop for the quiz relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and hands each one to a handshake thread.
// - **Handshake threads** (one per fresh connection): wait up to
//   `HANDSHAKE_TIMEOUT` for `Hello`, then send `InternalEvent::Hello` to the
//   main thread. A connection that never says hello only costs its own
//   thread.
// - **Reader threads** (one per endpoint): call `framing::read_frame()` in a
//   loop and send `InternalEvent::MessageFrom` to the main thread. On error,
//   EOF or `Goodbye`, send `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Session`, receives events from the channel,
//   and dispatches them one at a time. `recv_timeout` keeps it waking up so
//   it notices a stop request even when the room is idle.
//
// Only the main thread queues outbound messages (via
// `Session::broadcast`/`send_to`); each endpoint's writer thread drains its
// own queue. Reader threads only read. Because every broadcast is issued
// from the one main thread, each endpoint sees relayed messages in the
// order the relay processed them.
//
// Shutdown: `RelayHandle::stop` clears the `keep_running` flag; the main
// thread breaks out of its loop and shuts down every connection, which
// unblocks the reader threads.
//
// See also: `session.rs` for the fan-out rules, `client.rs` for the
// endpoint side of the handshake.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use kbc_quiz_protocol::framing::{read_frame, write_frame};
use kbc_quiz_protocol::message::{ClientMessage, ServerMessage};
use kbc_quiz_protocol::types::{ConnectionId, Role};

use crate::session::Session;
use crate::source::QuestionSource;

/// How long the main loop waits for an event before re-checking the stop flag.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// How long a fresh connection has to send its `Hello`.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    Hello {
        stream: TcpStream,
        reader: BufReader<TcpStream>,
        role: Role,
        protocol_version: u32,
    },
    MessageFrom {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Block until the relay exits on its own. Used by the binary, which
    /// runs until killed.
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("relay main thread panicked");
            }
        }
    }
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Interface to bind.
    pub bind: String,
    /// Port to listen on; 0 lets the OS pick.
    pub port: u16,
    /// Questions requested from the source per game.
    pub question_count: usize,
    pub max_connections: usize,
    /// Messages that may queue for one endpoint before it is dropped as
    /// not reading.
    pub outbox_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
            question_count: 5,
            max_connections: 8,
            outbox_capacity: 256,
        }
    }
}

/// Start the relay server on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used
/// to let the OS pick a free port).
pub fn start_relay(
    config: RelayConfig,
    source: Box<dyn QuestionSource>,
) -> std::io::Result<(RelayHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.bind.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let session = Session::new(
        source,
        config.question_count,
        config.max_connections,
        config.outbox_capacity,
    );
    let thread = thread::Builder::new()
        .name("kbc-relay".into())
        .spawn(move || run_relay(listener, session, keep_running_clone))?;

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, mut session: Session, keep_running: Arc<AtomicBool>) {
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Non-blocking so the accept thread can check keep_running periodically.
    if let Err(e) = listener.set_nonblocking(true) {
        log::error!("could not make listener non-blocking: {e}");
        return;
    }

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    log::debug!("accepted connection from {peer}");
                    stream.set_nonblocking(false).ok();
                    let tx_handshake = tx_listener.clone();
                    thread::spawn(move || handshake(stream, tx_handshake));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    log::error!("accept failed: {e}");
                    break;
                }
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(IDLE_POLL) {
            Ok(event) => {
                handle_event(&mut session, event, &tx, &keep_running);
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut session, event, &tx, &keep_running);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("relay shutting down");
    session.close_all();
}

/// Dispatch a single event to the session.
fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::Hello {
            stream,
            reader,
            role,
            protocol_version,
        } => {
            handle_hello(session, stream, reader, role, protocol_version, tx, keep_running);
        }
        InternalEvent::MessageFrom {
            connection_id,
            message,
        } => {
            handle_message(session, connection_id, message);
        }
        InternalEvent::Disconnected { connection_id } => {
            session.remove_connection(connection_id);
        }
    }
}

/// Handshake thread for a fresh connection: wait for `Hello` and pass the
/// connection on to the main loop. Anything else drops the connection.
fn handshake(stream: TcpStream, tx: Sender<InternalEvent>) {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();

    let mut reader = match stream.try_clone() {
        Ok(s) => BufReader::new(s),
        Err(e) => {
            log::warn!("could not clone stream for handshake: {e}");
            return;
        }
    };

    let hello: ClientMessage = match read_frame(&mut reader) {
        Ok(msg) => msg,
        Err(e) => {
            log::warn!("handshake failed: {e}");
            return;
        }
    };

    let ClientMessage::Hello {
        protocol_version,
        role,
    } = hello
    else {
        log::warn!("expected Hello as first message, got {hello:?}");
        return;
    };

    // The long-lived reader loop blocks indefinitely.
    stream.set_read_timeout(None).ok();

    let event = InternalEvent::Hello {
        stream,
        reader,
        role,
        protocol_version,
    };
    if tx.send(event).is_err() {
        log::debug!("relay stopped before {role} handshake completed");
    }
}

/// Admit a connection that has said hello: add the endpoint to the session
/// and spawn its reader thread, or tell it why it was rejected.
fn handle_hello(
    session: &mut Session,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    role: Role,
    protocol_version: u32,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let session_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            log::warn!("could not clone stream for writing: {e}");
            return;
        }
    };

    match session.add_connection(role, protocol_version, session_stream) {
        Ok(connection_id) => {
            let tx_reader = tx.clone();
            let keep_running_reader = keep_running.clone();
            thread::spawn(move || {
                reader_loop(reader, connection_id, tx_reader, keep_running_reader);
            });
        }
        Err(reason) => {
            log::info!("rejected {role} connection: {reason}");
            thread::spawn(move || {
                let mut writer = BufWriter::new(stream);
                if let Err(e) = write_frame(&mut writer, &ServerMessage::Rejected { reason }) {
                    log::debug!("rejection not delivered: {e}");
                }
            });
        }
    }
}

/// Reader loop for a single endpoint. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    connection_id: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_frame::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Goodbye) => {
                log::debug!("{connection_id} said goodbye");
                break;
            }
            Ok(message) => {
                let event = InternalEvent::MessageFrom {
                    connection_id,
                    message,
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            Err(e) => {
                if !e.is_eof() {
                    log::debug!("read from {connection_id} failed: {e}");
                }
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { connection_id });
}

/// Handle an endpoint message that isn't Hello or Goodbye (those are handled
/// during connection setup and in the reader loop respectively).
fn handle_message(session: &mut Session, from: ConnectionId, message: ClientMessage) {
    match message {
        ClientMessage::PlayerAccessed => session.player_accessed(from),
        ClientMessage::StartGame { name } => session.start_game(from, name),
        ClientMessage::Answer(submission) => session.answer(from, submission),
        ClientMessage::MoveToNextQuestion => session.move_to_next_question(from),
        ClientMessage::EnableNextButton => session.enable_next_button(from),
        ClientMessage::PlayerDisconnected { name } => session.player_disconnect_notice(from, name),
        ClientMessage::Hello { .. } => {
            log::warn!("ignoring repeated Hello from {from}");
        }
        ClientMessage::Goodbye => {}
    }
}
