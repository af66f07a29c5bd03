// Answer history and scoring results for one game.
//
// `AnswerLog` keeps at most one answer per question index. The first answer
// recorded for an index is final: later answers for the same index (a double
// tap, a replayed `AnswerResult`) are dropped, so option colouring and the
// correct-answer count can never change after the fact.
//
// `Feedback` is the transient "correct / wrong" banner for the current
// question, `OptionMark` is the per-button colouring, and `FinalTally` is what
// both screens show once the game is over.

use std::collections::BTreeMap;
use std::fmt;

use kbc_quiz_protocol::question::{OPTION_COUNT, Question};
use serde::Serialize;

/// An answer as recorded for one question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordedAnswer {
    pub selected: String,
    pub correct: bool,
}

/// Banner shown for the current question after it has been answered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Feedback {
    Correct { player_name: String },
    Wrong { player_name: String },
}

impl Feedback {
    pub fn for_answer(correct: bool, player_name: impl Into<String>) -> Self {
        let player_name = player_name.into();
        if correct {
            Feedback::Correct { player_name }
        } else {
            Feedback::Wrong { player_name }
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Feedback::Correct { .. })
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Correct { player_name } => write!(f, "Correct answer by {player_name}!"),
            Feedback::Wrong { player_name } => write!(f, "Wrong answer by {player_name}!"),
        }
    }
}

/// Colouring for one option button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OptionMark {
    Unselected,
    SelectedCorrect,
    SelectedWrong,
}

/// Final score, identical on both screens for the same game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FinalTally {
    pub total_questions: usize,
    pub correct_count: usize,
}

impl fmt::Display for FinalTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct_count, self.total_questions)
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnswerLog {
    answers: BTreeMap<usize, RecordedAnswer>,
    correct_count: usize,
}

impl AnswerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the answer for `index` unless one is already there. Returns
    /// whether it was recorded.
    pub fn record(&mut self, index: usize, selected: impl Into<String>, correct: bool) -> bool {
        if self.answers.contains_key(&index) {
            return false;
        }
        self.answers.insert(
            index,
            RecordedAnswer {
                selected: selected.into(),
                correct,
            },
        );
        if correct {
            self.correct_count += 1;
        }
        true
    }

    pub fn get(&self, index: usize) -> Option<&RecordedAnswer> {
        self.answers.get(&index)
    }

    pub fn is_answered(&self, index: usize) -> bool {
        self.answers.contains_key(&index)
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    /// Number of questions answered so far.
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Button colouring for `question`, which sits at `index`.
    pub fn option_marks(&self, index: usize, question: &Question) -> [OptionMark; OPTION_COUNT] {
        let Some(answer) = self.answers.get(&index) else {
            return [OptionMark::Unselected; OPTION_COUNT];
        };
        question.options.each_ref().map(|option| {
            if *option != answer.selected {
                OptionMark::Unselected
            } else if answer.correct {
                OptionMark::SelectedCorrect
            } else {
                OptionMark::SelectedWrong
            }
        })
    }

    pub fn clear(&mut self) {
        self.answers.clear();
        self.correct_count = 0;
    }
}
