// Length-delimited JSON framing over TCP.
//
// Each frame is a 4-byte big-endian length prefix followed by a JSON body.
// `write_frame` / `read_frame` do the serde work as well as the framing, so
// the relay, the client and the tests all speak through the same two calls
// and get one error type back.
//
// `MAX_FRAME_SIZE` bounds the allocation a malformed or hostile length prefix
// can cause. The largest real frame is a `GameStarted` carrying a question
// set, which is a few kilobytes.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Maximum allowed frame body size (1 MiB).
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Failure to read or write a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame too large: {len} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge { len: u64 },
    #[error("malformed frame body: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FrameError {
    /// True when the peer closed the stream (cleanly or mid-frame).
    pub fn is_eof(&self) -> bool {
        matches!(self, FrameError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }

    /// True when a socket read timeout expired before a frame arrived.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(e)
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        )
    }
}

/// Serialize `msg` to JSON and write it as one frame, then flush.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), FrameError> {
    let body = serde_json::to_vec(msg)?;
    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or(FrameError::TooLarge {
            len: body.len() as u64,
        })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame and deserialize its JSON body.
///
/// A stream that closes before or during a frame yields an `Io` error with
/// kind `UnexpectedEof` (see `FrameError::is_eof`).
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, FrameError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            len: u64::from(len),
        });
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::message::{ClientMessage, ServerMessage};

    #[test]
    fn frames_are_read_back_in_order() {
        let sent = vec![
            ClientMessage::PlayerAccessed,
            ClientMessage::StartGame {
                name: "Alice".into(),
            },
            ClientMessage::MoveToNextQuestion,
        ];
        let mut wire = Vec::new();
        for msg in &sent {
            write_frame(&mut wire, msg).unwrap();
        }

        let mut cursor = Cursor::new(wire);
        for expected in &sent {
            let got: ClientMessage = read_frame(&mut cursor).unwrap();
            assert_eq!(&got, expected);
        }
    }

    #[test]
    fn length_prefix_is_big_endian_body_length() {
        let mut wire = Vec::new();
        write_frame(&mut wire, &ServerMessage::MoveToNextQuestion).unwrap();
        let body_len = u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]) as usize;
        assert_eq!(body_len, wire.len() - 4);
    }

    #[test]
    fn rejects_oversized_write() {
        let msg = ClientMessage::StartGame {
            name: "x".repeat(MAX_FRAME_SIZE as usize + 1),
        };
        let mut wire = Vec::new();
        let err = write_frame(&mut wire, &msg).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
        assert!(wire.is_empty(), "nothing should be written");
    }

    #[test]
    fn rejects_oversized_read() {
        let fake_len = (MAX_FRAME_SIZE + 1).to_be_bytes();
        let mut cursor = Cursor::new(fake_len.to_vec());
        let err = read_frame::<_, ClientMessage>(&mut cursor).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
    }

    #[test]
    fn truncated_prefix_is_eof() {
        let mut cursor = Cursor::new(vec![0u8, 1]);
        let err = read_frame::<_, ClientMessage>(&mut cursor).unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn malformed_body_is_json_error() {
        let body = b"{not json";
        let mut wire = (body.len() as u32).to_be_bytes().to_vec();
        wire.extend_from_slice(body);
        let mut cursor = Cursor::new(wire);
        let err = read_frame::<_, ClientMessage>(&mut cursor).unwrap_err();
        assert!(matches!(err, FrameError::Json(_)));
        assert!(!err.is_eof());
    }
}
