// TCP client for connecting a quiz screen to the relay.
//
// Provides a non-blocking interface for a screen's main loop to talk to the
// relay. Architecture:
// - `connect()` performs TCP connect + Hello handshake on the calling thread,
//   then spawns a background reader thread.
// - The reader thread calls `read_frame()` in a loop and pushes each
//   `ServerMessage` into an `mpsc` channel.
// - The owning thread holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox non-blocking, returning all queued messages.
//
// The screen state machines in `kbc_quiz_game` never touch the network: the
// caller feeds `poll()` output into `apply()` and sends whatever the screens
// return through `send_all()`.
//
// This module lives in the relay crate because it is purely std TCP +
// protocol framing + mpsc, which makes it usable from the integration tests
// without any extra crate.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kbc_quiz_protocol::framing::{FrameError, read_frame, write_frame};
use kbc_quiz_protocol::message::{ClientMessage, PROTOCOL_VERSION, ServerMessage};
use kbc_quiz_protocol::types::{ConnectionId, Role};

/// Information returned by a successful `connect()` handshake.
#[derive(Clone, Debug)]
pub struct WelcomeInfo {
    pub connection_id: ConnectionId,
}

/// Why `connect()` or a send failed.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    #[error("handshake failed: {0}")]
    Handshake(#[source] FrameError),
    #[error("rejected by relay: {0}")]
    Rejected(String),
    #[error("unexpected handshake response: {0:?}")]
    UnexpectedResponse(Box<ServerMessage>),
    #[error("send failed: {0}")]
    Send(#[source] FrameError),
    #[error("socket error: {0}")]
    Socket(#[source] io::Error),
}

/// TCP client for relay communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: JoinHandle<()>,
    connection_id: ConnectionId,
    role: Role,
}

impl NetClient {
    /// Connect to a relay, perform the Hello handshake, and spawn a reader
    /// thread. Returns the client and welcome info on success.
    pub fn connect(addr: &str, role: Role) -> Result<(Self, WelcomeInfo), ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .map_err(ClientError::Socket)?;

        let reader_stream = stream.try_clone().map_err(ClientError::Socket)?;
        let mut writer = BufWriter::new(stream);

        let hello = ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            role,
        };
        write_frame(&mut writer, &hello).map_err(ClientError::Handshake)?;

        let mut reader = BufReader::new(reader_stream);
        let response: ServerMessage = read_frame(&mut reader).map_err(ClientError::Handshake)?;

        let welcome = match response {
            ServerMessage::Welcome { connection_id } => WelcomeInfo { connection_id },
            ServerMessage::Rejected { reason } => return Err(ClientError::Rejected(reason)),
            other => return Err(ClientError::UnexpectedResponse(Box::new(other))),
        };

        // Clear read timeout for the long-lived reader loop.
        reader
            .get_ref()
            .set_read_timeout(None)
            .map_err(ClientError::Socket)?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || reader_loop(reader, tx));
        log::debug!("{role} connected to {addr} as {}", welcome.connection_id);

        Ok((
            Self {
                writer,
                inbox: rx,
                _reader_thread: reader_thread,
                connection_id: welcome.connection_id,
                role,
            },
            welcome,
        ))
    }

    /// Send one message to the relay.
    pub fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        write_frame(&mut self.writer, msg).map_err(ClientError::Send)
    }

    /// Send messages in order, stopping at the first failure.
    pub fn send_all(&mut self, msgs: &[ClientMessage]) -> Result<(), ClientError> {
        msgs.iter().try_for_each(|msg| self.send(msg))
    }

    /// Send Goodbye. The relay closes the connection afterwards.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.send(&ClientMessage::Goodbye) {
            log::debug!("goodbye not delivered: {e}");
        }
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        self.inbox.try_iter().collect()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    loop {
        match read_frame::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Owner dropped the client.
                }
            }
            Err(e) => {
                if !e.is_eof() {
                    log::debug!("relay connection closed: {e}");
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;
    use crate::server::{RelayConfig, start_relay};
    use crate::source::StaticQuestionSource;

    fn poll_until(client: &NetClient, mut pred: impl FnMut(&ServerMessage) -> bool) -> ServerMessage {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            for msg in client.poll() {
                if pred(&msg) {
                    return msg;
                }
            }
            assert!(Instant::now() < deadline, "timed out waiting for message");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn connect_and_exchange() {
        let config = RelayConfig {
            port: 0,
            ..RelayConfig::default()
        };
        let (handle, addr) =
            start_relay(config, Box::new(StaticQuestionSource::kbc_default())).unwrap();
        let addr = addr.to_string();

        let (host, host_welcome) = NetClient::connect(&addr, Role::Host).unwrap();
        let (mut player, player_welcome) = NetClient::connect(&addr, Role::Player).unwrap();
        assert_ne!(host_welcome.connection_id, player_welcome.connection_id);
        assert_eq!(player.role(), Role::Player);
        assert_eq!(player.connection_id(), player_welcome.connection_id);

        player
            .send_all(&[
                ClientMessage::PlayerAccessed,
                ClientMessage::StartGame {
                    name: "Alice".into(),
                },
            ])
            .unwrap();

        poll_until(&host, |m| matches!(m, ServerMessage::PlayerAccessed));
        let started = poll_until(&host, |m| matches!(m, ServerMessage::GameStarted(_)));
        match started {
            ServerMessage::GameStarted(start) => assert_eq!(start.error(), None),
            other => panic!("expected GameStarted, got {other:?}"),
        }

        player.disconnect();
        let gone = poll_until(&host, |m| matches!(m, ServerMessage::PlayerDisconnected { .. }));
        assert_eq!(
            gone,
            ServerMessage::PlayerDisconnected {
                peer: kbc_quiz_protocol::DepartedPeer::Connection(player_welcome.connection_id),
            }
        );

        handle.stop();
    }

    #[test]
    fn rejected_handshake_surfaces_reason() {
        // A fake relay that rejects everyone.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let _hello: ClientMessage = read_frame(&mut reader).unwrap();
            let mut writer = BufWriter::new(stream);
            write_frame(
                &mut writer,
                &ServerMessage::Rejected {
                    reason: "relay is full".into(),
                },
            )
            .unwrap();
        });

        match NetClient::connect(&addr, Role::Player) {
            Err(ClientError::Rejected(reason)) => assert_eq!(reason, "relay is full"),
            Err(other) => panic!("expected Rejected, got {other}"),
            Ok(_) => panic!("expected Rejected, got a connection"),
        }
        server.join().unwrap();
    }

    #[test]
    fn connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(matches!(
            NetClient::connect(&addr, Role::Host),
            Err(ClientError::Connect(_))
        ));
    }
}
