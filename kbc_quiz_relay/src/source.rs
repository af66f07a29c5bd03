// Question sources consulted by the relay when a game starts.
//
// `QuestionSource` is the seam between the relay and wherever questions come
// from. The relay calls `fetch` once per accepted `StartGame` on its main
// thread and hands the result to every endpoint by value. A failed fetch is
// never propagated across the wire as-is: the session turns the error's
// `Display` text into a `GameStart::Failed` payload, which the player shows in
// its error banner.
//
// Two implementations ship with the relay:
// - `StaticQuestionSource`: a fixed in-memory list, `kbc_default()` being the
//   five built-in questions.
// - `JsonFileQuestionSource`: re-reads a JSON array from disk on every fetch,
//   so an operator can swap the question set between games without a restart.

use std::fs;
use std::io;
use std::path::PathBuf;

use kbc_quiz_protocol::question::{Question, QuestionError};

/// Anything that can produce an ordered list of questions.
pub trait QuestionSource: Send {
    /// Return up to `count` questions, in the order they should be asked.
    fn fetch(&mut self, count: usize) -> Result<Vec<Question>, SourceError>;
}

/// Why a question fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("question source unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read questions from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse questions: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question {index} is invalid: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },
    #[error("question source returned no questions")]
    Empty,
}

/// A fixed list of questions.
#[derive(Clone, Debug)]
pub struct StaticQuestionSource {
    questions: Vec<Question>,
}

impl StaticQuestionSource {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// The five questions the game ships with.
    pub fn kbc_default() -> Self {
        Self::new(vec![
            fixed("1. What is 2 + 2?", ["3", "4", "5", "6"], "4"),
            fixed(
                "2. What is the capital of France?",
                ["Paris", "London", "Berlin", "Madrid"],
                "Paris",
            ),
            fixed(
                "3. Who wrote \"Romeo and Juliet\"?",
                [
                    "Mark Twain",
                    "Charles Dickens",
                    "William Shakespeare",
                    "Jane Austen",
                ],
                "William Shakespeare",
            ),
            fixed(
                "4. What is the largest planet in our Solar System?",
                ["Earth", "Mars", "Jupiter", "Saturn"],
                "Jupiter",
            ),
            fixed(
                "5. What is the boiling point of water?",
                ["0°C", "50°C", "100°C", "200°C"],
                "100°C",
            ),
        ])
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionSource for StaticQuestionSource {
    fn fetch(&mut self, count: usize) -> Result<Vec<Question>, SourceError> {
        Ok(self.questions.iter().take(count).cloned().collect())
    }
}

/// Built-in fixture questions are known-good, so they skip `Question::new`.
fn fixed(text: &str, options: [&str; 4], correct_answer: &str) -> Question {
    Question {
        text: text.into(),
        options: options.map(String::from),
        correct_answer: correct_answer.into(),
    }
}

/// Questions loaded from a JSON file (an array of `Question` objects).
#[derive(Clone, Debug)]
pub struct JsonFileQuestionSource {
    path: PathBuf,
}

impl JsonFileQuestionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuestionSource for JsonFileQuestionSource {
    fn fetch(&mut self, count: usize) -> Result<Vec<Question>, SourceError> {
        let text = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut questions: Vec<Question> = serde_json::from_str(&text)?;
        questions.truncate(count);
        Ok(questions)
    }
}
