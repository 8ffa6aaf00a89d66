//! Dataset file checks run before publishing a word list.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

pub const REQUIRED_FIELDS: [&str; 4] = ["french", "chinese", "phonetic", "part_of_speech"];

/// Default accepted word count per grade.
pub const DEFAULT_WORD_RANGE: RangeInclusive<usize> = 80..=120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
  /// Zero-based position in the file
  pub index: usize,
  pub field: &'static str,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
  pub total: usize,
  pub expected: RangeInclusive<usize>,
  pub missing: Vec<MissingField>,
  /// Entry count per part of speech
  pub part_of_speech: BTreeMap<String, usize>,
}

impl ValidationReport {
  pub fn count_ok(&self) -> bool {
    self.expected.contains(&self.total)
  }

  pub fn fields_ok(&self) -> bool {
    self.missing.is_empty()
  }

  pub fn is_valid(&self) -> bool {
    self.count_ok() && self.fields_ok()
  }
}

/// Check a raw dataset file: it must be a JSON array, every entry needs the
/// required fields as non-empty strings, and the count must fall in `expected`.
pub fn validate_dataset(raw: &str, expected: RangeInclusive<usize>) -> Result<ValidationReport> {
  let entries: Vec<Value> =
    serde_json::from_str(raw).map_err(|e| eyre!("Dataset is not a JSON array: {}", e))?;

  let mut missing = Vec::new();
  let mut part_of_speech = BTreeMap::new();

  for (index, entry) in entries.iter().enumerate() {
    for field in REQUIRED_FIELDS {
      let present = entry
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|v| !v.trim().is_empty());
      if !present {
        missing.push(MissingField { index, field });
      }
    }

    if let Some(pos) = entry.get("part_of_speech").and_then(Value::as_str) {
      *part_of_speech.entry(pos.to_string()).or_insert(0) += 1;
    }
  }

  Ok(ValidationReport {
    total: entries.len(),
    expected,
    missing,
    part_of_speech,
  })
}
