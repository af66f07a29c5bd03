// One game's worth of local state: a screen's projection of the session.
//
// A `Round` is created from a `GameStarted(Ready)` payload and thrown away by
// the next one, which is how a restart replaces counters and recorded answers
// instead of merging with them. Both screens wrap a `Round` and add their own
// presence or input state on top; the scoring and advancement rules live here
// so the host and the player cannot drift apart in how they apply them.

use std::time::{Duration, Instant};

use kbc_quiz_protocol::question::{OPTION_COUNT, Question};

use crate::answers::{AnswerLog, Feedback, FinalTally, OptionMark};
use crate::progression::{Advance, ProgressionTimer, advance};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    Asking(usize),
    Finished,
}

#[derive(Clone, Debug)]
pub struct Round {
    questions: Vec<Question>,
    player_name: String,
    position: Position,
    answers: AnswerLog,
    feedback: Option<Feedback>,
    timer: ProgressionTimer,
}

impl Round {
    /// Start at question 0. An empty question set is finished immediately.
    pub fn new(questions: Vec<Question>, player_name: String, advance_delay: Duration) -> Self {
        let position = if questions.is_empty() {
            Position::Finished
        } else {
            Position::Asking(0)
        };
        Self {
            questions,
            player_name,
            position,
            answers: AnswerLog::new(),
            feedback: None,
            timer: ProgressionTimer::new(advance_delay),
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Index of the question being asked; `None` once finished.
    pub fn current_index(&self) -> Option<usize> {
        match self.position {
            Position::Asking(index) => Some(index),
            Position::Finished => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.position == Position::Finished
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    pub fn answers(&self) -> &AnswerLog {
        &self.answers
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn correct_count(&self) -> usize {
        self.answers.correct_count()
    }

    /// Colouring for the current question's buttons.
    pub fn option_marks(&self) -> Option<[OptionMark; OPTION_COUNT]> {
        let index = self.current_index()?;
        let question = self.questions.get(index)?;
        Some(self.answers.option_marks(index, question))
    }

    pub fn tally(&self) -> Option<FinalTally> {
        self.is_finished().then(|| FinalTally {
            total_questions: self.questions.len(),
            correct_count: self.answers.correct_count(),
        })
    }

    pub fn is_advance_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Score `selected` against this round's own copy of the question at
    /// `index` and record it. Returns the correctness when the answer was
    /// newly recorded; `None` when it was a duplicate, out of range, or the
    /// round is over. Feedback only changes for the current question.
    pub fn score(&mut self, index: usize, selected: &str, player_name: &str) -> Option<bool> {
        if self.is_finished() {
            log::debug!("ignoring answer for question {index}: round is finished");
            return None;
        }
        let Some(question) = self.questions.get(index) else {
            log::debug!("ignoring answer for out-of-range question {index}");
            return None;
        };
        let correct = question.is_correct(selected);
        if !self.answers.record(index, selected, correct) {
            log::debug!("question {index} already answered; keeping the first answer");
            return None;
        }
        if self.current_index() == Some(index) {
            self.feedback = Some(Feedback::for_answer(correct, player_name));
        } else {
            log::debug!("stale answer for question {index} recorded without feedback");
        }
        Some(correct)
    }

    /// Schedule an advance from the current question.
    pub fn arm_advance(&mut self, now: Instant) {
        if let Some(index) = self.current_index() {
            self.timer.arm(index, now);
        }
    }

    /// Advance right away, dropping any pending timer.
    pub fn advance_now(&mut self) -> bool {
        self.timer.cancel();
        let Position::Asking(index) = self.position else {
            return false;
        };
        self.feedback = None;
        self.position = match advance(index, self.questions.len()) {
            Advance::Next(next) => Position::Asking(next),
            Advance::Finished => Position::Finished,
        };
        log::debug!("advanced past question {index} to {:?}", self.position);
        true
    }

    /// Run the timed advance if it is due. Returns whether the round moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Position::Asking(index) = self.position else {
            self.timer.cancel();
            return false;
        };
        match self.timer.fire_due(now, index) {
            Some(_) => self.advance_now(),
            None => false,
        }
    }
}
