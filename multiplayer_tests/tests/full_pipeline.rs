// End-to-end integration tests for the quiz pipeline.
//
// Each test starts a real relay server, connects a real host screen and a
// real player screen (via `TestHost` / `TestPlayer`), and verifies the full
// path: player action -> relay -> both reducers -> timed advance -> identical
// state on both sides.
//
// Screens run with a short advance delay so the timed transitions happen
// within the poll timeout.

use std::time::Duration;

use kbc_quiz_game::config::ScreenConfig;
use kbc_quiz_game::host::HostPhase;
use kbc_quiz_game::player::PlayerPhase;
use kbc_quiz_protocol::question::Question;
use kbc_quiz_relay::server::RelayHandle;
use kbc_quiz_relay::source::{QuestionSource, SourceError, StaticQuestionSource};
use multiplayer_tests::{TestHost, TestPlayer, start_test_relay};

const TEST_DELAY: Duration = Duration::from_millis(100);

/// The options picked in the main scenario; the third one is wrong.
const ALICE_ANSWERS: [&str; 5] = ["4", "Paris", "Mark Twain", "Jupiter", "100°C"];

struct DownSource;

impl QuestionSource for DownSource {
    fn fetch(&mut self, _count: usize) -> Result<Vec<Question>, SourceError> {
        Err(SourceError::Unavailable("trivia provider timed out".into()))
    }
}

fn start_session(
    question_count: usize,
    config: ScreenConfig,
) -> (RelayHandle, std::net::SocketAddr, TestHost, TestPlayer) {
    let (handle, addr) =
        start_test_relay(question_count, Box::new(StaticQuestionSource::kbc_default()));
    let host = TestHost::connect(addr, config.clone());
    let player = TestPlayer::connect(addr, config);
    (handle, addr, host, player)
}

/// Mount the player, start as `name`, and wait until both screens are on
/// the first question.
fn begin(host: &mut TestHost, player: &mut TestPlayer, name: &str) {
    player.mount();
    player.start(name);
    host.poll_until("host on question 0", |h| {
        h.phase() == HostPhase::InGame { index: 0 } && h.player_name() == Some(name)
    });
    player.poll_until("player on question 0", |p| {
        p.phase() == PlayerPhase::InGame { index: 0 }
    });
}

/// Answer the current question and wait until both screens have moved on.
fn answer_and_advance(host: &mut TestHost, player: &mut TestPlayer, index: usize, option: &str) {
    player.answer(option);
    let total = player.screen.questions().len();
    let (host_next, player_next) = if index + 1 < total {
        (
            HostPhase::InGame { index: index + 1 },
            PlayerPhase::InGame { index: index + 1 },
        )
    } else {
        (HostPhase::Finished, PlayerPhase::Finished)
    };
    host.poll_until("host to advance", |h| h.phase() == host_next);
    player.poll_until("player to advance", |p| p.phase() == player_next);
}

#[test]
fn full_game_ends_with_identical_tallies() {
    let (handle, _addr, mut host, mut player) = start_session(5, ScreenConfig::with_delay(TEST_DELAY));

    // Opening the player screen flips the host to waiting.
    player.mount();
    host.poll_until("WaitingForPlayer", |h| h.phase() == HostPhase::WaitingForPlayer);

    // Both sides get the same five questions.
    player.start("Alice");
    host.poll_until("host in game", |h| h.phase() == HostPhase::InGame { index: 0 });
    player.poll_until("player in game", |p| {
        p.phase() == PlayerPhase::InGame { index: 0 }
    });
    assert_eq!(host.screen.questions().len(), 5);
    assert_eq!(host.screen.questions(), player.screen.questions());
    assert_eq!(host.screen.player_name(), Some("Alice"));

    // First answer is correct on both sides before anyone advances.
    player.answer(ALICE_ANSWERS[0]);
    assert_eq!(player.screen.correct_count(), 1);
    assert!(player.screen.feedback().unwrap().is_positive());
    host.poll_until("host to score the first answer", |h| h.correct_count() == 1);
    assert!(host.screen.feedback().unwrap().is_positive());
    host.poll_until("host on question 1", |h| h.phase() == HostPhase::InGame { index: 1 });
    player.poll_until("player on question 1", |p| {
        p.phase() == PlayerPhase::InGame { index: 1 }
    });

    for (index, option) in ALICE_ANSWERS.iter().enumerate().skip(1) {
        answer_and_advance(&mut host, &mut player, index, option);
    }

    let host_tally = host.screen.tally().unwrap();
    let player_tally = player.screen.tally().unwrap();
    assert_eq!(host_tally, player_tally);
    assert_eq!(host_tally.total_questions, 5);
    assert_eq!(host_tally.correct_count, 4);
    assert_eq!(host_tally.to_string(), "4/5");

    handle.stop();
}

#[test]
fn host_keeps_scoring_behind_disconnect_notice() {
    let (handle, _addr, mut host, mut player) = start_session(5, ScreenConfig::with_delay(TEST_DELAY));
    begin(&mut host, &mut player, "Alice");
    answer_and_advance(&mut host, &mut player, 0, ALICE_ANSWERS[0]);

    player.send_unmount_notice();
    host.poll_until("disconnect flag", |h| h.is_player_disconnected());
    assert!(host.screen.visible_question().is_none());

    for (index, option) in ALICE_ANSWERS.iter().enumerate().skip(1) {
        answer_and_advance(&mut host, &mut player, index, option);
    }
    assert!(host.screen.is_player_disconnected());
    assert_eq!(host.screen.tally(), player.screen.tally());

    handle.stop();
}

#[test]
fn dropped_player_is_flagged_and_a_new_player_restarts() {
    let (handle, addr, mut host, mut player) = start_session(5, ScreenConfig::with_delay(TEST_DELAY));
    begin(&mut host, &mut player, "Alice");
    answer_and_advance(&mut host, &mut player, 0, ALICE_ANSWERS[0]);

    player.drop_connection();
    host.poll_until("disconnect flag", |h| h.is_player_disconnected());
    assert!(host.screen.visible_question().is_none());
    assert_eq!(host.screen.phase(), HostPhase::InGame { index: 1 });
    assert_eq!(host.screen.correct_count(), 1);

    // A fresh controller starts over; the host fully resets.
    let mut bob = TestPlayer::connect(addr, ScreenConfig::with_delay(TEST_DELAY));
    begin(&mut host, &mut bob, "Bob");
    assert!(!host.screen.is_player_disconnected());
    assert!(host.screen.visible_question().is_some());
    assert_eq!(host.screen.correct_count(), 0);

    handle.stop();
}

#[test]
fn failed_start_shows_error_and_host_keeps_waiting() {
    let (handle, addr) = start_test_relay(5, Box::new(DownSource));
    let mut host = TestHost::connect(addr, ScreenConfig::default());
    let mut player = TestPlayer::connect(addr, ScreenConfig::default());

    player.mount();
    host.poll_until("WaitingForPlayer", |h| h.phase() == HostPhase::WaitingForPlayer);
    player.start("Alice");

    player.poll_until("start error", |p| p.error().is_some());
    assert_eq!(player.screen.phase(), PlayerPhase::AwaitingStart);
    assert!(
        player.screen.error().unwrap().contains("trivia provider timed out"),
        "{:?}",
        player.screen.error()
    );

    host.poll_until("host start error", |h| h.last_start_error().is_some());
    assert_eq!(host.screen.phase(), HostPhase::WaitingForPlayer);

    handle.stop();
}

#[test]
fn disconnect_after_finish_keeps_tallies() {
    let (handle, _addr, mut host, mut player) = start_session(2, ScreenConfig::with_delay(TEST_DELAY));
    begin(&mut host, &mut player, "Alice");
    answer_and_advance(&mut host, &mut player, 0, "4");
    answer_and_advance(&mut host, &mut player, 1, "London");

    let before = host.screen.tally().unwrap();
    assert_eq!(before.total_questions, 2);
    assert_eq!(before.correct_count, 1);

    player.drop_connection();
    host.poll_until("disconnect flag", |h| h.is_player_disconnected());
    assert_eq!(host.screen.phase(), HostPhase::Finished);
    assert_eq!(host.screen.tally(), Some(before));

    handle.stop();
}

#[test]
fn manual_mode_advances_on_next_button() {
    let (handle, _addr, mut host, mut player) = start_session(5, ScreenConfig::manual());
    begin(&mut host, &mut player, "Alice");

    player.answer("4");
    player.poll_until("next button unlocked", |p| !p.next_disabled());
    host.poll_until("host to score", |h| h.correct_count() == 1);
    // Nothing moves until the button is pressed.
    assert_eq!(host.screen.phase(), HostPhase::InGame { index: 0 });

    player.next();
    assert_eq!(player.screen.phase(), PlayerPhase::InGame { index: 1 });
    host.poll_until("host on question 1", |h| h.phase() == HostPhase::InGame { index: 1 });

    handle.stop();
}
