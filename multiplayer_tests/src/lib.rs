// Test-only screen clients for end-to-end integration tests.
//
// Wraps the real `NetClient` (from `kbc_quiz_relay::client`) together with a
// real `HostScreen` or `PlayerScreen` (from `kbc_quiz_game`) to provide a
// synchronous, test-friendly API for exercising the full pipeline:
// player action -> relay fan-out -> host/player reducers -> timed advance.
//
// The only test-specific code here is the synchronous polling wrappers
// (blocking loops around `NetClient::poll()` plus `tick`). All networking
// and game logic uses the same code paths a real front-end would.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use kbc_quiz_game::config::ScreenConfig;
use kbc_quiz_game::host::HostScreen;
use kbc_quiz_game::player::PlayerScreen;
use kbc_quiz_protocol::message::ClientMessage;
use kbc_quiz_protocol::types::Role;
use kbc_quiz_relay::client::NetClient;
use kbc_quiz_relay::server::{RelayConfig, RelayHandle, start_relay};
use kbc_quiz_relay::source::QuestionSource;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Start a relay on a random localhost port.
pub fn start_test_relay(
    question_count: usize,
    source: Box<dyn QuestionSource>,
) -> (RelayHandle, SocketAddr) {
    let config = RelayConfig {
        port: 0,
        question_count,
        ..RelayConfig::default()
    };
    start_relay(config, source).expect("start_relay failed")
}

/// Pump `step` until `done` holds or the poll timeout expires.
fn wait_for<S>(what: &str, state: &mut S, step: impl Fn(&mut S), done: impl Fn(&S) -> bool) {
    let start = Instant::now();
    loop {
        step(state);
        if done(state) {
            return;
        }
        assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
        thread::sleep(POLL_INTERVAL);
    }
}

/// A host display wired to a live relay.
pub struct TestHost {
    client: NetClient,
    pub screen: HostScreen,
}

impl TestHost {
    pub fn connect(addr: SocketAddr, config: ScreenConfig) -> Self {
        let (client, _) =
            NetClient::connect(&addr.to_string(), Role::Host).expect("host connect failed");
        Self {
            client,
            screen: HostScreen::new(config),
        }
    }

    /// Apply everything the relay has sent, then run the timer.
    pub fn pump(&mut self) {
        let now = Instant::now();
        for msg in self.client.poll() {
            log::debug!("host <- {msg:?}");
            self.screen.apply(&msg, now);
        }
        self.screen.tick(Instant::now());
    }

    /// Blocking pump until `cond` holds for the host screen.
    pub fn poll_until(&mut self, what: &str, cond: impl Fn(&HostScreen) -> bool) {
        wait_for(what, self, Self::pump, |host| cond(&host.screen));
    }
}

/// A player controller wired to a live relay.
pub struct TestPlayer {
    client: NetClient,
    pub screen: PlayerScreen,
}

impl TestPlayer {
    pub fn connect(addr: SocketAddr, config: ScreenConfig) -> Self {
        let (client, _) =
            NetClient::connect(&addr.to_string(), Role::Player).expect("player connect failed");
        Self {
            client,
            screen: PlayerScreen::new(config),
        }
    }

    fn send_all(&mut self, msgs: &[ClientMessage]) {
        self.client.send_all(msgs).expect("send failed");
    }

    /// Open the screen.
    pub fn mount(&mut self) {
        let msg = self.screen.mount();
        self.send_all(&[msg]);
    }

    /// Enter a name and press start.
    pub fn start(&mut self, name: &str) {
        self.screen.set_name(name);
        let msg = self.screen.request_start().expect("request_start failed");
        self.send_all(&[msg]);
    }

    /// Pick an option for the current question.
    pub fn answer(&mut self, option: &str) {
        let msgs = self
            .screen
            .select_answer(option, Instant::now())
            .expect("select_answer failed");
        self.send_all(&msgs);
    }

    /// Press the manual next button.
    pub fn next(&mut self) {
        let msgs = self.screen.next_question().expect("next_question failed");
        self.send_all(&msgs);
    }

    /// Send the screen's unmount notice but keep the connection open.
    pub fn send_unmount_notice(&mut self) {
        let msg = self.screen.unmount();
        self.send_all(&[msg]);
    }

    /// Say Goodbye and close the socket, skipping the unmount notice.
    pub fn drop_connection(mut self) {
        self.client.disconnect();
    }

    pub fn pump(&mut self) {
        for msg in self.client.poll() {
            log::debug!("player <- {msg:?}");
            self.screen.apply(&msg);
        }
        self.screen.tick(Instant::now());
    }

    /// Blocking pump until `cond` holds for the player screen.
    pub fn poll_until(&mut self, what: &str, cond: impl Fn(&PlayerScreen) -> bool) {
        wait_for(what, self, Self::pump, |player| cond(&player.screen));
    }
}
