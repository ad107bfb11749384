//! Performance tracking: every missed question appends its quiz topic to a
//! persisted log, and the most frequent topic becomes the practice suggestion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{load_json, save_json, SharedStore};

pub const PERFORMANCE_KEY: &str = "quizPerformance";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceLog {
  #[serde(default)]
  pub incorrect_topics: Vec<String>,
}

#[derive(Clone)]
pub struct PerformanceTracker {
  store: SharedStore,
}

impl PerformanceTracker {
  pub fn new(store: SharedStore) -> Self {
    Self { store }
  }

  pub fn log(&self) -> PerformanceLog {
    load_json(self.store.as_ref(), PERFORMANCE_KEY)
  }

  /// Append one miss for `topic`. Blank topics are ignored.
  pub fn record_incorrect(&self, topic: &str) {
    if topic.trim().is_empty() {
      return;
    }
    let mut log = self.log();
    log.incorrect_topics.push(topic.to_string());
    save_json(self.store.as_ref(), PERFORMANCE_KEY, &log);
    debug!(target: "quiz", %topic, total = log.incorrect_topics.len(), "Recorded incorrect answer");
  }

  /// Most frequently missed topic; `None` while the log is empty.
  /// On a tie the topic that was first recorded wins.
  pub fn suggest_topic(&self) -> Option<String> {
    let log = self.log();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for topic in &log.incorrect_topics {
      let n = counts.entry(topic.as_str()).or_insert(0);
      if *n == 0 {
        first_seen.push(topic.as_str());
      }
      *n += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for topic in first_seen {
      let n = counts[topic];
      if best.map_or(true, |(_, top)| n > top) {
        best = Some((topic, n));
      }
    }
    best.map(|(topic, _)| topic.to_string())
  }

  pub fn clear(&self) {
    if let Err(e) = self.store.remove(PERFORMANCE_KEY) {
      warn!(target: "edubot_backend", error = %e, "Failed to clear performance log");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{KvStore, MemoryStore};
  use std::sync::Arc;

  fn tracker() -> (PerformanceTracker, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (PerformanceTracker::new(store.clone()), store)
  }

  #[test]
  fn suggests_most_missed_topic() {
    let (t, _) = tracker();
    t.record_incorrect("Math");
    t.record_incorrect("Math");
    t.record_incorrect("History");
    assert_eq!(t.suggest_topic().as_deref(), Some("Math"));
  }

  #[test]
  fn empty_log_has_no_suggestion() {
    let (t, _) = tracker();
    assert_eq!(t.suggest_topic(), None);
  }

  #[test]
  fn ties_go_to_first_recorded_topic() {
    let (t, _) = tracker();
    for topic in ["Biology", "Chemistry", "Chemistry", "Biology"] {
      t.record_incorrect(topic);
    }
    assert_eq!(t.suggest_topic().as_deref(), Some("Biology"));
  }

  #[test]
  fn blank_topics_are_ignored() {
    let (t, store) = tracker();
    t.record_incorrect("");
    t.record_incorrect("   ");
    assert_eq!(store.get(PERFORMANCE_KEY), None);
  }

  #[test]
  fn log_uses_incorrect_topics_document_shape() {
    let (t, store) = tracker();
    t.record_incorrect("Rust");
    t.record_incorrect("Rust");
    assert_eq!(store.get(PERFORMANCE_KEY).as_deref(), Some(r#"{"incorrectTopics":["Rust","Rust"]}"#));

    t.clear();
    assert!(t.log().incorrect_topics.is_empty());
  }

  #[test]
  fn corrupt_log_reads_as_empty() {
    let (t, store) = tracker();
    store.set(PERFORMANCE_KEY, "[oops").unwrap();
    assert_eq!(t.suggest_topic(), None);
    t.record_incorrect("Geo");
    assert_eq!(t.log().incorrect_topics, vec!["Geo".to_string()]);
  }
}
