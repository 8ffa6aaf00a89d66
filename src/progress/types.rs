//! Progress data model: the closed enumerations and the persisted word-id sets.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// School-year cohort selecting which word dataset is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
  #[default]
  Seven,
  Eight,
  Nine,
}

impl Grade {
  pub fn number(self) -> u8 {
    match self {
      Self::Seven => 7,
      Self::Eight => 8,
      Self::Nine => 9,
    }
  }

  pub fn from_number(n: u8) -> Option<Self> {
    match n {
      7 => Some(Self::Seven),
      8 => Some(Self::Eight),
      9 => Some(Self::Nine),
      _ => None,
    }
  }

  /// Request path of this grade's dataset, relative to the data prefix.
  pub fn dataset_file(self) -> String {
    format!("grade{}_words.json", self.number())
  }
}

impl fmt::Display for Grade {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.number())
  }
}

impl FromStr for Grade {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.trim()
      .parse::<u8>()
      .ok()
      .and_then(Self::from_number)
      .ok_or_else(|| format!("invalid grade '{}', expected 7, 8 or 9", s))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
  /// Single-card flow
  #[default]
  Learn,
  /// Filterable list
  List,
}

impl ViewMode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Learn => "learn",
      Self::List => "list",
    }
  }
}

impl fmt::Display for ViewMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ViewMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "learn" => Ok(Self::Learn),
      "list" => Ok(Self::List),
      _ => Err(format!("invalid view mode '{}', expected learn or list", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
  #[default]
  All,
  Mastered,
  NotMastered,
}

impl Filter {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::All => "all",
      Self::Mastered => "mastered",
      Self::NotMastered => "not-mastered",
    }
  }
}

impl fmt::Display for Filter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Filter {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "all" => Ok(Self::All),
      "mastered" => Ok(Self::Mastered),
      "not-mastered" => Ok(Self::NotMastered),
      _ => Err(format!(
        "invalid filter '{}', expected all, mastered or not-mastered",
        s
      )),
    }
  }
}

/// Set of word ids, serialized as a JSON object mapping each id to `true`.
///
/// On decode, ids whose value is anything other than `true` are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordIdSet(BTreeSet<String>);

impl WordIdSet {
  pub fn contains(&self, id: &str) -> bool {
    self.0.contains(id)
  }

  /// Returns true if the id was newly added.
  pub fn insert(&mut self, id: &str) -> bool {
    self.0.insert(id.to_string())
  }

  /// Returns true if the id was present.
  pub fn remove(&mut self, id: &str) -> bool {
    self.0.remove(id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[allow(dead_code)]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn to_json(&self) -> String {
    // A map of string keys to booleans cannot fail to serialize
    serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
  }

  pub fn from_json(raw: &str) -> Option<Self> {
    serde_json::from_str(raw).ok()
  }
}

impl<S: Into<String>> FromIterator<S> for WordIdSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self(iter.into_iter().map(Into::into).collect())
  }
}

impl Serialize for WordIdSet {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for id in &self.0 {
      map.serialize_entry(id, &true)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for WordIdSet {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct PresenceMapVisitor;

    impl<'de> Visitor<'de> for PresenceMapVisitor {
      type Value = WordIdSet;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of word ids to presence flags")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut ids = BTreeSet::new();
        while let Some((id, flag)) = access.next_entry::<String, serde_json::Value>()? {
          if flag == serde_json::Value::Bool(true) {
            ids.insert(id);
          }
        }
        Ok(WordIdSet(ids))
      }
    }

    deserializer.deserialize_map(PresenceMapVisitor)
  }
}

/// Persisted learning progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
  pub current_grade: Grade,
  pub current_view_mode: ViewMode,
  pub current_filter: Filter,
  pub learned_words: WordIdSet,
  pub mastered_words: WordIdSet,
}
