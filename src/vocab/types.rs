use serde::{Deserialize, Serialize};

use crate::progress::Grade;

/// One dataset entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
  pub french: String,
  pub chinese: String,
  pub phonetic: String,
  #[serde(alias = "partOfSpeech")]
  pub part_of_speech: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
}

/// A word joined with the learner's progress. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordWithStatus {
  pub word: Word,
  /// "<grade>-<index>", stable only within one dataset load
  pub id: String,
  pub grade: Grade,
  pub is_learned: bool,
  pub is_mastered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
  pub total: usize,
  pub learned: usize,
  pub mastered: usize,
  /// Mastered share of the total, rounded half up
  pub percentage: u8,
}
