// Quiz questions as they travel over the wire.
//
// A `Question` is immutable once a question source has produced it: the relay
// clones it into every `GameStarted` payload and each screen keeps its own
// copy. The one structural invariant is that `correct_answer` is exactly one
// of the four `options`. `Question::new` enforces it at construction;
// questions that arrive through serde (question files, the wire) are checked
// with `Question::validate` by whoever accepts them.
//
// The serde field names accept the older `question` / `correctAnswer` keys as
// aliases so question files written for the browser version still load.

use serde::{Deserialize, Serialize};

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

const OPTION_LABELS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D'];

/// A single multiple-choice question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(alias = "question")]
    pub text: String,
    pub options: [String; OPTION_COUNT],
    #[serde(alias = "correctAnswer")]
    pub correct_answer: String,
}

/// Structural problems with a question.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,
    #[error("option {index} is empty")]
    EmptyOption { index: usize },
    #[error("correct answer {answer:?} is not one of the options")]
    AnswerNotAnOption { answer: String },
}

impl Question {
    /// Build a question, checking that the correct answer is one of the options.
    pub fn new<S: Into<String>>(
        text: impl Into<String>,
        options: [S; OPTION_COUNT],
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let question = Self {
            text: text.into(),
            options: options.map(Into::into),
            correct_answer: correct_answer.into(),
        };
        question.validate()?;
        Ok(question)
    }

    /// Re-check the invariants on a question that did not come through `new`.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if !self.has_option(&self.correct_answer) {
            return Err(QuestionError::AnswerNotAnOption {
                answer: self.correct_answer.clone(),
            });
        }
        Ok(())
    }

    /// Exact comparison against the correct answer. Every endpoint scores
    /// answers with this, so the result is identical everywhere.
    pub fn is_correct(&self, selected: &str) -> bool {
        self.correct_answer == selected
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.option_index(option).is_some()
    }

    /// Position of `option` in the option list.
    pub fn option_index(&self, option: &str) -> Option<usize> {
        self.options.iter().position(|o| o == option)
    }

    /// Display label for the option at `index`: "A", "B", "C", "D". `None`
    /// past the last option.
    pub fn option_label(index: usize) -> Option<char> {
        OPTION_LABELS.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_answer_among_options() {
        let q = Question::new(
            "What is the capital of France?",
            ["Paris", "London", "Berlin", "Madrid"],
            "Paris",
        )
        .unwrap();
        assert_eq!(q.option_index("Paris"), Some(0));
        assert!(q.is_correct("Paris"));
        assert!(!q.is_correct("London"));
    }

    #[test]
    fn new_rejects_answer_outside_options() {
        let err = Question::new("2 + 2?", ["3", "4", "5", "6"], "22").unwrap_err();
        assert_eq!(
            err,
            QuestionError::AnswerNotAnOption {
                answer: "22".into()
            }
        );
    }

    #[test]
    fn correctness_is_exact_match() {
        let q = Question::new("Boiling point?", ["0°C", "50°C", "100°C", "200°C"], "100°C")
            .unwrap();
        assert!(q.is_correct("100°C"));
        assert!(!q.is_correct("100°c"));
        assert!(!q.is_correct(" 100°C"));
    }

    #[test]
    fn validate_catches_blank_text_and_options() {
        let mut q = Question::new("Q", ["a", "b", "c", "d"], "a").unwrap();
        q.text = "   ".into();
        assert_eq!(q.validate(), Err(QuestionError::EmptyText));

        let mut q = Question::new("Q", ["a", "b", "c", "d"], "a").unwrap();
        q.options[2] = String::new();
        assert_eq!(q.validate(), Err(QuestionError::EmptyOption { index: 2 }));
    }

    #[test]
    fn deserializes_browser_question_format() {
        let json = r#"{
            "question": "4. What is the largest planet in our Solar System?",
            "options": ["Earth", "Mars", "Jupiter", "Saturn"],
            "correctAnswer": "Jupiter"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.correct_answer, "Jupiter");
        assert!(q.validate().is_ok());
    }

    #[test]
    fn deserialize_rejects_wrong_option_count() {
        let json = r#"{"text": "Q", "options": ["a", "b", "c"], "correct_answer": "a"}"#;
        assert!(serde_json::from_str::<Question>(json).is_err());
    }

    #[test]
    fn option_labels() {
        assert_eq!(Question::option_label(0), Some('A'));
        assert_eq!(Question::option_label(3), Some('D'));
        assert_eq!(Question::option_label(OPTION_COUNT), None);
        assert_eq!(Question::option_label(300), None);
    }
}
