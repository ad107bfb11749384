//! Achievement ledger: a fixed set of flags that, once unlocked, stay unlocked.
//!
//! Persisted as a single JSON document `{ "FIRST_QUIZ": true, ... }` under
//! `unlockedAchievements`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{load_json, save_json, SharedStore};

pub const ACHIEVEMENTS_KEY: &str = "unlockedAchievements";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementId {
  FirstQuiz,
  NoHints,
  PerfectScore,
}

impl AchievementId {
  pub const ALL: [AchievementId; 3] = [AchievementId::FirstQuiz, AchievementId::NoHints, AchievementId::PerfectScore];

  pub fn name(self) -> &'static str {
    match self {
      AchievementId::FirstQuiz => "Quiz Novice",
      AchievementId::NoHints => "Sharp Mind",
      AchievementId::PerfectScore => "Perfectionist",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      AchievementId::FirstQuiz => "Completed your very first quiz!",
      AchievementId::NoHints => "Finished a quiz without using any hints.",
      AchievementId::PerfectScore => "Achieved a perfect score on a quiz.",
    }
  }
}

/// Facts about one submission that the unlock predicates look at.
#[derive(Clone, Copy, Debug)]
pub struct SubmissionFacts {
  pub hints_used: usize,
  pub correct: usize,
  pub attempted: usize,
}

/// Unknown ids in a stored document (e.g. from a newer build) are kept on disk
/// as-is but ignored here.
type LedgerDoc = BTreeMap<String, bool>;

#[derive(Clone)]
pub struct AchievementLedger {
  store: SharedStore,
}

impl AchievementLedger {
  pub fn new(store: SharedStore) -> Self {
    Self { store }
  }

  fn load(&self) -> LedgerDoc {
    load_json(self.store.as_ref(), ACHIEVEMENTS_KEY)
  }

  fn key(id: AchievementId) -> String {
    serde_json::to_value(id)
      .ok()
      .and_then(|v| v.as_str().map(str::to_owned))
      .unwrap_or_default()
  }

  pub fn is_unlocked(&self, id: AchievementId) -> bool {
    self.load().get(&Self::key(id)).copied().unwrap_or(false)
  }

  /// Returns true only when this call flipped the flag.
  pub fn unlock(&self, id: AchievementId) -> bool {
    if self.is_unlocked(id) {
      return false;
    }
    let mut doc = self.load();
    doc.insert(Self::key(id), true);
    save_json(self.store.as_ref(), ACHIEVEMENTS_KEY, &doc);
    info!(target: "quiz", achievement = ?id, "Achievement unlocked");
    true
  }

  /// Run every predicate independently and unlock what applies.
  /// Returns the ids newly unlocked by this submission, in declaration order.
  pub fn evaluate(&self, facts: SubmissionFacts) -> Vec<AchievementId> {
    let mut unlocked = Vec::new();
    if self.unlock(AchievementId::FirstQuiz) {
      unlocked.push(AchievementId::FirstQuiz);
    }
    if facts.hints_used == 0 && self.unlock(AchievementId::NoHints) {
      unlocked.push(AchievementId::NoHints);
    }
    if facts.attempted > 0 && facts.correct == facts.attempted && self.unlock(AchievementId::PerfectScore) {
      unlocked.push(AchievementId::PerfectScore);
    }
    unlocked
  }

  /// All achievements with their unlock state, for display.
  pub fn snapshot(&self) -> Vec<(AchievementId, bool)> {
    AchievementId::ALL.iter().map(|id| (*id, self.is_unlocked(*id))).collect()
  }
}
