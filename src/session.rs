//! Quiz session engine.
//!
//! A session wraps one immutable `Quiz` plus the learner's progress through it:
//! selections, revealed hints, 50/50 eliminations and skips. Power-ups are
//! limited per session. `submit` scores the quiz exactly once; afterwards the
//! session is read-only and repeated submits return the stored summary.
//!
//! Every mutating operation either applies fully or returns a `SessionRefusal`
//! and leaves the session untouched.

use std::fmt;

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use tracing::{debug, info};

use crate::achievements::{AchievementId, AchievementLedger, SubmissionFacts};
use crate::domain::Quiz;
use crate::feedback::{feedback_for_score, Feedback};
use crate::performance::PerformanceTracker;

pub const INITIAL_HINTS: u8 = 3;
pub const INITIAL_ELIMINATE_TWO: u8 = 1;
pub const INITIAL_SKIPS: u8 = 1;

/// How many incorrect options a 50/50 removes.
const ELIMINATE_COUNT: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUp {
  Hint,
  EliminateTwo,
  Skip,
}

impl fmt::Display for PowerUp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      PowerUp::Hint => "hints",
      PowerUp::EliminateTwo => "50/50 power-ups",
      PowerUp::Skip => "skips",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionRefusal {
  #[error("the quiz has already been submitted")]
  AlreadySubmitted,
  #[error("question {index} does not exist")]
  IndexOutOfRange { index: usize },
  #[error("question {index} was skipped")]
  QuestionSkipped { index: usize },
  #[error("{option:?} is not an option of question {index}")]
  UnknownOption { index: usize, option: String },
  #[error("{option:?} was eliminated from question {index}")]
  OptionEliminated { index: usize, option: String },
  #[error("you have no {0} left")]
  Exhausted(PowerUp),
  #[error("the hint for question {index} is already revealed")]
  HintAlreadyRevealed { index: usize },
  #[error("question {index} has no hint")]
  NoHint { index: usize },
  #[error("50/50 was already used on question {index}")]
  AlreadyEliminated { index: usize },
  #[error("question {index} is already skipped")]
  AlreadySkipped { index: usize },
}

impl SessionRefusal {
  /// Refusals caused by addressing something that does not exist,
  /// as opposed to a rule of the game.
  pub fn is_bad_input(&self) -> bool {
    matches!(self, SessionRefusal::IndexOutOfRange { .. } | SessionRefusal::UnknownOption { .. })
  }
}

/// Per-question progress.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuestionState {
  pub selected: Option<String>,
  pub hint_revealed: bool,
  pub skipped: bool,
  pub eliminated: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerUps {
  pub hints: u8,
  pub eliminate_two: u8,
  pub skip: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
  pub correct: usize,
  pub attempted: usize,
  pub total: usize,
  pub percentage: u32,
  pub feedback: Feedback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
  pub score: ScoreResult,
  pub newly_unlocked: Vec<AchievementId>,
  pub suggested_topic: Option<String>,
}

/// Raw counts behind a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tally {
  pub correct: usize,
  pub attempted: usize,
  pub total: usize,
  /// Non-skipped questions answered wrongly or not at all.
  pub missed: usize,
}

impl Tally {
  /// `round(100 * correct / attempted)`, halves rounding up; 0 with nothing attempted.
  pub fn percentage(&self) -> u32 {
    if self.attempted == 0 {
      return 0;
    }
    ((200 * self.correct + self.attempted) / (2 * self.attempted)) as u32
  }
}

#[derive(Clone, Debug)]
pub struct QuizSession {
  quiz: Quiz,
  questions: Vec<QuestionState>,
  power_ups: PowerUps,
  summary: Option<SubmissionSummary>,
}

impl QuizSession {
  pub fn new(quiz: Quiz) -> Self {
    let questions = vec![QuestionState::default(); quiz.len()];
    Self {
      quiz,
      questions,
      power_ups: PowerUps { hints: INITIAL_HINTS, eliminate_two: INITIAL_ELIMINATE_TWO, skip: INITIAL_SKIPS },
      summary: None,
    }
  }

  pub fn quiz(&self) -> &Quiz {
    &self.quiz
  }

  pub fn question_state(&self, index: usize) -> Option<&QuestionState> {
    self.questions.get(index)
  }

  pub fn power_ups(&self) -> PowerUps {
    self.power_ups
  }

  pub fn is_revealed(&self) -> bool {
    self.summary.is_some()
  }

  pub fn summary(&self) -> Option<&SubmissionSummary> {
    self.summary.as_ref()
  }

  pub fn skipped_count(&self) -> usize {
    self.questions.iter().filter(|q| q.skipped).count()
  }

  fn hints_used(&self) -> usize {
    let spent = usize::from(INITIAL_HINTS - self.power_ups.hints);
    let flagged = self.questions.iter().filter(|q| q.hint_revealed).count();
    spent.max(flagged)
  }

  /// Common guard: session still open and `index` addresses a question.
  fn open_question(&self, index: usize) -> Result<(), SessionRefusal> {
    if self.is_revealed() {
      return Err(SessionRefusal::AlreadySubmitted);
    }
    if index >= self.questions.len() {
      return Err(SessionRefusal::IndexOutOfRange { index });
    }
    Ok(())
  }

  pub fn select_option(&mut self, index: usize, option: &str) -> Result<(), SessionRefusal> {
    self.open_question(index)?;
    let state = &self.questions[index];
    if state.skipped {
      return Err(SessionRefusal::QuestionSkipped { index });
    }
    if !self.quiz.questions[index].has_option(option) {
      return Err(SessionRefusal::UnknownOption { index, option: option.to_string() });
    }
    if state.eliminated.iter().any(|e| e == option) {
      return Err(SessionRefusal::OptionEliminated { index, option: option.to_string() });
    }
    self.questions[index].selected = Some(option.to_string());
    Ok(())
  }

  /// Spend one hint on `index` and return the hint text.
  pub fn reveal_hint(&mut self, index: usize) -> Result<&str, SessionRefusal> {
    self.open_question(index)?;
    if self.questions[index].hint_revealed {
      return Err(SessionRefusal::HintAlreadyRevealed { index });
    }
    if self.quiz.questions[index].hint_text().is_none() {
      return Err(SessionRefusal::NoHint { index });
    }
    if self.power_ups.hints == 0 {
      return Err(SessionRefusal::Exhausted(PowerUp::Hint));
    }
    self.power_ups.hints -= 1;
    self.questions[index].hint_revealed = true;
    debug!(target: "quiz", index, remaining = self.power_ups.hints, "Hint revealed");
    Ok(self.quiz.questions[index].hint_text().unwrap_or_default())
  }

  /// Remove two random incorrect options from `index`. Returns the eliminated options.
  pub fn eliminate_two<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> Result<&[String], SessionRefusal> {
    self.open_question(index)?;
    if !self.questions[index].eliminated.is_empty() {
      return Err(SessionRefusal::AlreadyEliminated { index });
    }
    if self.power_ups.eliminate_two == 0 {
      return Err(SessionRefusal::Exhausted(PowerUp::EliminateTwo));
    }
    let wrong = self.quiz.questions[index].incorrect_options();
    let picked: Vec<String> = wrong.choose_multiple(rng, ELIMINATE_COUNT).map(|o| o.to_string()).collect();

    self.power_ups.eliminate_two -= 1;
    let state = &mut self.questions[index];
    if state.selected.as_ref().is_some_and(|s| picked.contains(s)) {
      state.selected = None;
    }
    state.eliminated = picked;
    debug!(target: "quiz", index, eliminated = ?state.eliminated, "50/50 applied");
    Ok(&self.questions[index].eliminated)
  }

  pub fn skip_question(&mut self, index: usize) -> Result<(), SessionRefusal> {
    self.open_question(index)?;
    if self.questions[index].skipped {
      return Err(SessionRefusal::AlreadySkipped { index });
    }
    if self.power_ups.skip == 0 {
      return Err(SessionRefusal::Exhausted(PowerUp::Skip));
    }
    self.power_ups.skip -= 1;
    self.questions[index].skipped = true;
    debug!(target: "quiz", index, "Question skipped");
    Ok(())
  }

  /// Count correct/attempted over the current state. Skipped questions do not count.
  pub fn tally(&self) -> Tally {
    let total = self.questions.len();
    let mut correct = 0;
    let mut missed = 0;
    for (question, state) in self.quiz.questions.iter().zip(&self.questions) {
      if state.skipped {
        continue;
      }
      if state.selected.as_deref() == Some(question.answer.as_str()) {
        correct += 1;
      } else {
        missed += 1;
      }
    }
    Tally { correct, attempted: total - self.skipped_count(), total, missed }
  }

  /// Score the quiz and lock the session.
  ///
  /// The first call records misses with the tracker, unlocks achievements and
  /// picks feedback. Later calls return the same summary without side effects.
  pub fn submit<R: Rng + ?Sized>(
    &mut self,
    rng: &mut R,
    tracker: &PerformanceTracker,
    ledger: &AchievementLedger,
  ) -> SubmissionSummary {
    if let Some(summary) = &self.summary {
      return summary.clone();
    }

    let tally = self.tally();
    for _ in 0..tally.missed {
      tracker.record_incorrect(&self.quiz.topic);
    }

    let newly_unlocked = ledger.evaluate(SubmissionFacts {
      hints_used: self.hints_used(),
      correct: tally.correct,
      attempted: tally.attempted,
    });

    let percentage = tally.percentage();
    let summary = SubmissionSummary {
      score: ScoreResult {
        correct: tally.correct,
        attempted: tally.attempted,
        total: tally.total,
        percentage,
        feedback: feedback_for_score(percentage, rng),
      },
      newly_unlocked,
      suggested_topic: tracker.suggest_topic(),
    };
    info!(
      target: "quiz",
      topic = %self.quiz.topic,
      correct = tally.correct,
      attempted = tally.attempted,
      percentage,
      unlocked = ?summary.newly_unlocked,
      "Quiz submitted"
    );
    self.summary = Some(summary.clone());
    summary
  }
}
