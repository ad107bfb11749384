//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::achievements::AchievementId;
use crate::session::{PowerUps, QuizSession, SubmissionSummary};

//
// Generation gateways
//

/// Fields are loosely typed so that type mistakes get our own 400 messages
/// instead of a generic deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuizIn {
  #[serde(default)]
  pub topic: Option<Value>,
  #[serde(default, rename = "numQuestions")]
  pub num_questions: Option<Value>,
  #[serde(default)]
  pub difficulty: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatIn {
  #[serde(default)]
  pub message: Option<Value>,
}
#[derive(Serialize)]
pub struct ChatOut {
  pub response: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

//
// Sessions
//

#[derive(Debug, Deserialize)]
pub struct IndexIn {
  pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct SelectIn {
  pub index: usize,
  pub option: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedOut {
  pub session_id: String,
  pub session: SessionView,
}

/// What the learner may see of a session. Answers and explanations stay hidden
/// until the quiz is submitted; a hint only once it has been revealed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
  pub topic: String,
  pub created_at: u64,
  pub revealed: bool,
  pub power_ups: PowerUps,
  pub questions: Vec<QuestionView>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub summary: Option<SubmissionSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
  pub index: usize,
  pub question: String,
  pub options: Vec<String>,
  pub selected: Option<String>,
  pub skipped: bool,
  pub eliminated: Vec<String>,
  pub has_hint: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub answer: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub correct: Option<bool>,
}

/// Convert a session (internal) to the public view.
pub fn to_view(session: &QuizSession) -> SessionView {
  let quiz = session.quiz();
  let revealed = session.is_revealed();
  let questions = quiz
    .questions
    .iter()
    .enumerate()
    .map(|(index, q)| {
      let state = session.question_state(index).cloned().unwrap_or_default();
      QuestionView {
        index,
        question: q.text.clone(),
        options: q.options.clone(),
        has_hint: q.hint_text().is_some(),
        hint: state.hint_revealed.then(|| q.hint_text().unwrap_or_default().to_string()),
        answer: revealed.then(|| q.answer.clone()),
        explanation: if revealed { q.explanation.clone() } else { None },
        correct: (revealed && !state.skipped).then(|| state.selected.as_deref() == Some(q.answer.as_str())),
        selected: state.selected,
        skipped: state.skipped,
        eliminated: state.eliminated,
      }
    })
    .collect();

  SessionView {
    topic: quiz.topic.clone(),
    created_at: quiz.created_at.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0),
    revealed,
    power_ups: session.power_ups(),
    questions,
    summary: session.summary().cloned(),
  }
}

//
// Achievements & suggestions
//

#[derive(Serialize)]
pub struct AchievementOut {
  pub id: AchievementId,
  pub name: &'static str,
  pub description: &'static str,
  pub unlocked: bool,
}

#[derive(Serialize)]
pub struct SuggestionOut {
  pub topic: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::achievements::AchievementLedger;
  use crate::domain::{sample_question, Quiz};
  use crate::performance::PerformanceTracker;
  use crate::store::MemoryStore;
  use rand::{rngs::StdRng, SeedableRng};
  use std::sync::Arc;

  fn session() -> QuizSession {
    let quiz = Quiz::new("Space", vec![sample_question("Q0", "A0"), sample_question("Q1", "A1")]).unwrap();
    QuizSession::new(quiz)
  }

  #[test]
  fn view_hides_answers_until_submitted() {
    let mut s = session();
    s.reveal_hint(1).unwrap();
    let view = serde_json::to_value(to_view(&s)).unwrap();
    let q0 = &view["questions"][0];
    assert!(q0.get("answer").is_none());
    assert!(q0.get("explanation").is_none());
    assert!(q0.get("hint").is_none());
    assert_eq!(q0["hasHint"], true);
    assert_eq!(view["questions"][1]["hint"], "think about A1");
    assert_eq!(view["powerUps"]["hints"], 2);
    assert_eq!(view["revealed"], false);
  }

  #[test]
  fn view_after_submit_shows_answers_and_summary() {
    let mut s = session();
    s.select_option(0, "A0").unwrap();
    let store = Arc::new(MemoryStore::new());
    s.submit(&mut StdRng::seed_from_u64(1), &PerformanceTracker::new(store.clone()), &AchievementLedger::new(store));

    let view = serde_json::to_value(to_view(&s)).unwrap();
    assert_eq!(view["revealed"], true);
    assert_eq!(view["questions"][0]["answer"], "A0");
    assert_eq!(view["questions"][0]["correct"], true);
    assert_eq!(view["questions"][1]["correct"], false);
    assert_eq!(view["summary"]["score"]["percentage"], 50);
    assert_eq!(view["summary"]["newlyUnlocked"][0], "FIRST_QUIZ");
  }
}
