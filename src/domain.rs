//! Domain models: questions, quizzes, difficulty, and question shape validation.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Every generated question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// How hard the generated questions should be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl FromStr for Difficulty {
  type Err = ();

  /// Case-insensitive; surrounding whitespace is ignored.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Ok(Difficulty::Easy),
      "medium" => Ok(Difficulty::Medium),
      "hard" => Ok(Difficulty::Hard),
      _ => Err(()),
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    })
  }
}

/// A single multiple-choice question as produced by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  #[serde(rename = "question")]
  pub text: String,
  pub options: Vec<String>,
  pub answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

/// Why a generated question was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionShapeError {
  #[error("question {index}: question text is empty")]
  EmptyText { index: usize },
  #[error("question {index}: expected 4 options, got {count}")]
  OptionCount { index: usize, count: usize },
  #[error("question {index}: option {option} is empty")]
  EmptyOption { index: usize, option: usize },
  #[error("question {index}: option {value:?} appears more than once")]
  DuplicateOption { index: usize, value: String },
  #[error("question {index}: answer {answer:?} is not one of the options")]
  AnswerNotInOptions { index: usize, answer: String },
  #[error("quiz contains no questions")]
  NoQuestions,
}

impl Question {
  /// Check the shape invariants of a question at position `index`.
  pub fn validate(&self, index: usize) -> Result<(), QuestionShapeError> {
    if self.text.trim().is_empty() {
      return Err(QuestionShapeError::EmptyText { index });
    }
    if self.options.len() != OPTIONS_PER_QUESTION {
      return Err(QuestionShapeError::OptionCount { index, count: self.options.len() });
    }
    let mut seen = HashSet::new();
    for (i, opt) in self.options.iter().enumerate() {
      if opt.trim().is_empty() {
        return Err(QuestionShapeError::EmptyOption { index, option: i });
      }
      if !seen.insert(opt.as_str()) {
        return Err(QuestionShapeError::DuplicateOption { index, value: opt.clone() });
      }
    }
    if !seen.contains(self.answer.as_str()) {
      return Err(QuestionShapeError::AnswerNotInOptions { index, answer: self.answer.clone() });
    }
    Ok(())
  }

  pub fn has_option(&self, option: &str) -> bool {
    self.options.iter().any(|o| o == option)
  }

  /// Options other than the correct answer, in their original order.
  pub fn incorrect_options(&self) -> Vec<&str> {
    self.options.iter().map(String::as_str).filter(|o| *o != self.answer).collect()
  }

  /// A blank hint from the model counts as no hint.
  pub fn hint_text(&self) -> Option<&str> {
    self.hint.as_deref().filter(|h| !h.trim().is_empty())
  }
}

/// Validate a whole generated question list.
pub fn validate_questions(questions: &[Question]) -> Result<(), QuestionShapeError> {
  if questions.is_empty() {
    return Err(QuestionShapeError::NoQuestions);
  }
  questions.iter().enumerate().try_for_each(|(i, q)| q.validate(i))
}

/// A generated quiz: topic label plus its ordered questions.
#[derive(Clone, Debug)]
pub struct Quiz {
  pub topic: String,
  pub questions: Vec<Question>,
  pub created_at: SystemTime,
}

impl Quiz {
  /// Build a quiz from untrusted generated questions.
  pub fn new(topic: impl Into<String>, questions: Vec<Question>) -> Result<Self, QuestionShapeError> {
    validate_questions(&questions)?;
    Ok(Self { topic: topic.into(), questions, created_at: SystemTime::now() })
  }

  pub fn len(&self) -> usize {
    self.questions.len()
  }
}

#[cfg(test)]
pub(crate) fn sample_question(text: &str, answer: &str) -> Question {
  let mut options: Vec<String> = ["w1", "w2", "w3"].iter().map(|w| format!("{text}-{w}")).collect();
  options.insert(1, answer.to_string());
  Question {
    text: text.to_string(),
    options,
    answer: answer.to_string(),
    hint: Some(format!("think about {answer}")),
    explanation: Some(format!("{answer} is right")),
  }
}
