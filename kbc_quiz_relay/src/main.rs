// CLI entry point for the KBC quiz relay.
//
// Starts a standalone relay that the host and player screens connect to.
// See `server.rs` for the networking architecture and `session.rs` for the
// fan-out rules.
//
// Usage:
//   relay [OPTIONS]
//     --bind <ADDR>            Interface to bind (default: 127.0.0.1)
//     -p, --port <PORT>        Listen port (default: 3000, env PORT)
//     --question-count <N>     Questions per game (default: 5)
//     --max-connections <N>    Connection cap (default: 8)
//     --outbox-capacity <N>    Queued messages before a stalled endpoint
//                              is dropped (default: 256)
//     --questions <PATH>       JSON question file (default: built-in set)
//
// Logging goes through `env_logger`; set `RUST_LOG=debug` for per-message
// traces.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use kbc_quiz_relay::server::{RelayConfig, start_relay};
use kbc_quiz_relay::source::{JsonFileQuestionSource, QuestionSource, StaticQuestionSource};

#[derive(Parser, Debug)]
#[command(name = "relay", about = "Broadcast relay for the KBC quiz screens")]
struct Args {
    /// Interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Number of questions fetched for each game.
    #[arg(long, default_value_t = 5)]
    question_count: usize,

    /// Maximum simultaneous connections.
    #[arg(long, default_value_t = 8)]
    max_connections: usize,

    /// Messages queued for one endpoint before it is dropped as not reading.
    #[arg(long, default_value_t = 256)]
    outbox_capacity: usize,

    /// Read questions from this JSON file instead of the built-in set.
    #[arg(long, value_name = "PATH")]
    questions: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let source: Box<dyn QuestionSource> = match args.questions {
        Some(path) => {
            log::info!("loading questions from {}", path.display());
            Box::new(JsonFileQuestionSource::new(path))
        }
        None => Box::new(StaticQuestionSource::kbc_default()),
    };

    let config = RelayConfig {
        bind: args.bind,
        port: args.port,
        question_count: args.question_count,
        max_connections: args.max_connections,
        outbox_capacity: args.outbox_capacity,
    };
    let (handle, addr) = start_relay(config, source).context("failed to start relay")?;

    log::info!("relay listening on {addr}");
    handle.wait();
    Ok(())
}
