// kbc_quiz_relay — broadcast relay for the KBC quiz screens.
//
// The relay is a thin message broker: it accepts TCP connections from one
// host display and one player controller, fetches a question set when the
// player starts a game, and fans every other event out to the connected
// screens. It never scores answers; each screen scores against its own copy
// of the questions.
//
// Module overview:
// - `session.rs`:  Session state: connected endpoints, the canonical game
//                  snapshot, and the per-event fan-out rules. The core data
//                  structure that `server.rs` drives.
// - `server.rs`:   TCP listener, reader threads (one per endpoint), and the
//                  main event loop. Uses `std::net` with a thread-per-reader
//                  architecture and an `mpsc` channel to funnel events into
//                  the single-threaded `Session`.
// - `source.rs`:   `QuestionSource` trait with the built-in and JSON-file
//                  question sets.
// - `client.rs`:   `NetClient`, the endpoint side of the connection, used by
//                  the screens and the integration tests.
//
// Dependencies: `kbc_quiz_protocol` (shared message types and framing).
// No dependency on the screen state machines.
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in a
// process via the library API (`start_relay`).

pub mod client;
pub mod server;
pub mod session;
pub mod source;

pub use client::{ClientError, NetClient, WelcomeInfo};
pub use server::{RelayConfig, RelayHandle, start_relay};
pub use session::{Session, SessionSnapshot};
pub use source::{JsonFileQuestionSource, QuestionSource, SourceError, StaticQuestionSource};
