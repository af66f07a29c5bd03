// Progression timer: the delayed "advance to the next question" transition.
//
// Each screen arms its own timer when an answer is scored (or when the relay
// forwards a `MoveToNextQuestion`). The timer remembers the question index it
// was armed for; when it fires, the advance only happens if the screen is
// still on that index. Moving on by any other route (a restart, a manual
// advance) therefore cancels an older timer without any explicit bookkeeping.
//
// Time is never read from the clock here. Callers pass `now` into `arm` and
// `fire_due`, which keeps the host and player reducers deterministic under
// test. The host and player timers are independent and are expected to fire
// at slightly different moments.

use std::time::{Duration, Instant};

/// Where the game goes after the question at some index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Finished,
}

/// The advancement rule shared by both screens.
pub fn advance(index: usize, total: usize) -> Advance {
    if index + 1 < total {
        Advance::Next(index + 1)
    } else {
        Advance::Finished
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingAdvance {
    armed_index: usize,
    deadline: Instant,
}

/// One-shot, index-guarded delay before advancing.
#[derive(Clone, Debug)]
pub struct ProgressionTimer {
    delay: Duration,
    pending: Option<PendingAdvance>,
}

impl ProgressionTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm for `index`. Replaces whatever was pending.
    pub fn arm(&mut self, index: usize, now: Instant) {
        self.pending = Some(PendingAdvance {
            armed_index: index,
            deadline: now + self.delay,
        });
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_index(&self) -> Option<usize> {
        self.pending.map(|p| p.armed_index)
    }

    /// When the pending advance is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// If the deadline has passed, consume the pending arm. Returns the armed
    /// index when it still matches `current_index`, `None` when nothing is
    /// due or the arm has gone stale.
    pub fn fire_due(&mut self, now: Instant, current_index: usize) -> Option<usize> {
        let pending = self.pending?;
        if now < pending.deadline {
            return None;
        }
        self.pending = None;
        if pending.armed_index != current_index {
            log::debug!(
                "dropping stale advance armed for question {} (now on {current_index})",
                pending.armed_index
            );
            return None;
        }
        Some(pending.armed_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(2);

    #[test]
    fn advance_moves_to_next_then_finishes() {
        assert_eq!(advance(0, 5), Advance::Next(1));
        assert_eq!(advance(3, 5), Advance::Next(4));
        assert_eq!(advance(4, 5), Advance::Finished);
        assert_eq!(advance(0, 1), Advance::Finished);
    }

    #[test]
    fn fires_only_after_delay() {
        let t0 = Instant::now();
        let mut timer = ProgressionTimer::new(DELAY);
        timer.arm(0, t0);
        assert_eq!(timer.fire_due(t0 + Duration::from_millis(1999), 0), None);
        assert!(timer.is_pending());
        assert_eq!(timer.fire_due(t0 + DELAY, 0), Some(0));
        assert!(!timer.is_pending());
        // One-shot.
        assert_eq!(timer.fire_due(t0 + DELAY * 2, 0), None);
    }

    #[test]
    fn stale_arm_is_consumed_without_firing() {
        let t0 = Instant::now();
        let mut timer = ProgressionTimer::new(DELAY);
        timer.arm(1, t0);
        assert_eq!(timer.fire_due(t0 + DELAY, 2), None);
        assert!(!timer.is_pending());
    }

    #[test]
    fn rearm_replaces_pending() {
        let t0 = Instant::now();
        let mut timer = ProgressionTimer::new(DELAY);
        timer.arm(0, t0);
        timer.arm(0, t0 + Duration::from_secs(1));
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_secs(3)));
        assert_eq!(timer.fire_due(t0 + DELAY, 0), None);
        assert_eq!(timer.fire_due(t0 + Duration::from_secs(3), 0), Some(0));
    }

    #[test]
    fn cancel_clears() {
        let t0 = Instant::now();
        let mut timer = ProgressionTimer::new(DELAY);
        timer.arm(3, t0);
        assert_eq!(timer.pending_index(), Some(3));
        timer.cancel();
        assert_eq!(timer.fire_due(t0 + DELAY, 3), None);
    }
}
