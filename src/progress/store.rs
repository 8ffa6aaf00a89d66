//! Learning-progress store with per-field durable persistence.

use tracing::{debug, warn};

use super::storage::KeyValueStorage;
use super::types::{Filter, Grade, ProgressState, ViewMode, WordIdSet};

/// Durable key names for each persisted field, namespaced by a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
  pub current_grade: String,
  pub current_view_mode: String,
  pub current_filter: String,
  pub learned_words: String,
  pub mastered_words: String,
}

impl StorageKeys {
  pub fn new(prefix: &str) -> Self {
    Self {
      current_grade: format!("{}-current-grade", prefix),
      current_view_mode: format!("{}-current-view-mode", prefix),
      current_filter: format!("{}-current-filter", prefix),
      learned_words: format!("{}-learned-words", prefix),
      mastered_words: format!("{}-mastered-words", prefix),
    }
  }
}

/// Owns the learning progress and writes every change through to storage.
///
/// Each field lives under its own key and is hydrated on its own, so a corrupt
/// or missing value only resets that one field to its default. Write failures
/// are logged and otherwise ignored: the in-memory state is always updated.
pub struct ProgressStore<S: KeyValueStorage> {
  storage: S,
  keys: StorageKeys,
  state: ProgressState,
}

impl<S: KeyValueStorage> ProgressStore<S> {
  /// Build the store from whatever `storage` currently holds.
  pub fn hydrate(storage: S, keys: StorageKeys) -> Self {
    let state = ProgressState {
      current_grade: read_field(&storage, &keys.current_grade, |raw| raw.parse().ok()),
      current_view_mode: read_field(&storage, &keys.current_view_mode, |raw| raw.parse().ok()),
      current_filter: read_field(&storage, &keys.current_filter, |raw| raw.parse().ok()),
      learned_words: read_field(&storage, &keys.learned_words, WordIdSet::from_json),
      mastered_words: read_field(&storage, &keys.mastered_words, WordIdSet::from_json),
    };

    debug!(
      grade = %state.current_grade,
      view_mode = %state.current_view_mode,
      filter = %state.current_filter,
      learned = state.learned_words.len(),
      mastered = state.mastered_words.len(),
      "Hydrated progress"
    );

    Self {
      storage,
      keys,
      state,
    }
  }

  pub fn state(&self) -> &ProgressState {
    &self.state
  }

  pub fn is_learned(&self, id: &str) -> bool {
    self.state.learned_words.contains(id)
  }

  pub fn is_mastered(&self, id: &str) -> bool {
    self.state.mastered_words.contains(id)
  }

  pub fn set_grade(&mut self, grade: Grade) {
    self.state.current_grade = grade;
    self.persist_grade();
  }

  pub fn set_view_mode(&mut self, mode: ViewMode) {
    self.state.current_view_mode = mode;
    self.persist_view_mode();
  }

  pub fn set_filter(&mut self, filter: Filter) {
    self.state.current_filter = filter;
    self.persist_filter();
  }

  pub fn mark_learned(&mut self, id: &str) {
    self.state.learned_words.insert(id);
    self.persist_learned();
  }

  /// Mastery implies learned, so both sets gain the id.
  pub fn mark_mastered(&mut self, id: &str) {
    self.state.mastered_words.insert(id);
    self.state.learned_words.insert(id);
    self.persist_mastered();
    self.persist_learned();
  }

  pub fn unmark_mastered(&mut self, id: &str) {
    self.state.mastered_words.remove(id);
    self.persist_mastered();
  }

  /// Losing learned status revokes mastery as well.
  pub fn unmark_learned(&mut self, id: &str) {
    self.state.learned_words.remove(id);
    self.state.mastered_words.remove(id);
    self.persist_learned();
    self.persist_mastered();
  }

  pub fn reset_all(&mut self) {
    self.state = ProgressState::default();
    self.persist_learned();
    self.persist_mastered();
    self.persist_grade();
    self.persist_view_mode();
    self.persist_filter();
  }

  fn persist_grade(&self) {
    self.persist(&self.keys.current_grade, &self.state.current_grade.to_string());
  }

  fn persist_view_mode(&self) {
    self.persist(&self.keys.current_view_mode, self.state.current_view_mode.as_str());
  }

  fn persist_filter(&self) {
    self.persist(&self.keys.current_filter, self.state.current_filter.as_str());
  }

  fn persist_learned(&self) {
    self.persist(&self.keys.learned_words, &self.state.learned_words.to_json());
  }

  fn persist_mastered(&self) {
    self.persist(&self.keys.mastered_words, &self.state.mastered_words.to_json());
  }

  fn persist(&self, key: &str, value: &str) {
    if let Err(e) = self.storage.set(key, value) {
      warn!(key, error = %e, "Failed to persist progress field");
    }
  }
}

/// Read and decode one field, falling back to its default on any problem.
fn read_field<S, T, F>(storage: &S, key: &str, decode: F) -> T
where
  S: KeyValueStorage,
  T: Default,
  F: FnOnce(&str) -> Option<T>,
{
  match storage.get(key) {
    Ok(Some(raw)) => decode(&raw).unwrap_or_else(|| {
      debug!(key, raw = %raw, "Ignoring invalid stored value");
      T::default()
    }),
    Ok(None) => T::default(),
    Err(e) => {
      debug!(key, error = %e, "Failed to read stored value");
      T::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::progress::storage::MemoryStorage;
  use color_eyre::{eyre::eyre, Result};
  use std::sync::Arc;

  fn keys() -> StorageKeys {
    StorageKeys::new("french-app")
  }

  fn fresh_store() -> ProgressStore<MemoryStorage> {
    ProgressStore::hydrate(MemoryStorage::new(), keys())
  }

  /// Storage whose writes always fail but whose reads succeed.
  struct ReadOnlyStorage(MemoryStorage);

  impl KeyValueStorage for ReadOnlyStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
      self.0.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
      Err(eyre!("disk full"))
    }
  }

  #[test]
  fn test_empty_storage_hydrates_defaults() {
    let store = fresh_store();
    assert_eq!(store.state(), &ProgressState::default());
    assert_eq!(store.state().current_grade, Grade::Seven);
    assert_eq!(store.state().current_view_mode, ViewMode::Learn);
    assert_eq!(store.state().current_filter, Filter::All);
  }

  #[test]
  fn test_mark_mastered_implies_learned() {
    let mut store = fresh_store();
    store.mark_mastered("7-3");
    assert!(store.is_learned("7-3"));
    assert!(store.is_mastered("7-3"));

    store.mark_mastered("7-3");
    assert_eq!(store.state().mastered_words.len(), 1);
    assert_eq!(store.state().learned_words.len(), 1);
  }

  #[test]
  fn test_unmark_learned_revokes_mastery() {
    let mut store = fresh_store();
    store.mark_mastered("8-1");
    store.unmark_learned("8-1");
    assert!(!store.is_learned("8-1"));
    assert!(!store.is_mastered("8-1"));

    // Idempotent
    store.unmark_learned("8-1");
    assert!(!store.is_learned("8-1"));
  }

  #[test]
  fn test_unmark_mastered_keeps_learned() {
    let mut store = fresh_store();
    store.mark_mastered("9-0");
    store.unmark_mastered("9-0");
    assert!(store.is_learned("9-0"));
    assert!(!store.is_mastered("9-0"));

    store.mark_learned("9-1");
    store.unmark_mastered("9-1");
    assert!(store.is_learned("9-1"));
  }

  #[test]
  fn test_mutations_persist_immediately() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = ProgressStore::hydrate(Arc::clone(&storage), keys());

    store.set_grade(Grade::Nine);
    store.set_view_mode(ViewMode::List);
    store.set_filter(Filter::NotMastered);
    store.mark_mastered("9-4");

    let k = keys();
    assert_eq!(storage.get(&k.current_grade).unwrap().as_deref(), Some("9"));
    assert_eq!(storage.get(&k.current_view_mode).unwrap().as_deref(), Some("list"));
    assert_eq!(
      storage.get(&k.current_filter).unwrap().as_deref(),
      Some("not-mastered")
    );
    assert_eq!(
      storage.get(&k.learned_words).unwrap().as_deref(),
      Some(r#"{"9-4":true}"#)
    );

    let reloaded = ProgressStore::hydrate(storage, keys());
    assert_eq!(reloaded.state(), store.state());
  }

  #[test]
  fn test_scalar_write_leaves_other_keys_untouched() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = ProgressStore::hydrate(Arc::clone(&storage), keys());

    store.set_filter(Filter::Mastered);

    let k = keys();
    assert_eq!(storage.get(&k.current_grade).unwrap(), None);
    assert_eq!(storage.get(&k.learned_words).unwrap(), None);
  }

  #[test]
  fn test_invalid_grade_falls_back_without_affecting_other_fields() {
    let storage = MemoryStorage::new();
    let k = keys();
    storage.set(&k.current_grade, "11").unwrap();
    storage.set(&k.current_view_mode, "list").unwrap();
    storage.set(&k.current_filter, "mastered").unwrap();
    storage.set(&k.learned_words, r#"{"8-2":true}"#).unwrap();
    storage.set(&k.mastered_words, "{broken").unwrap();

    let store = ProgressStore::hydrate(storage, keys());
    let state = store.state();
    assert_eq!(state.current_grade, Grade::Seven);
    assert_eq!(state.current_view_mode, ViewMode::List);
    assert_eq!(state.current_filter, Filter::Mastered);
    assert!(state.learned_words.contains("8-2"));
    assert!(state.mastered_words.is_empty());
  }

  #[test]
  fn test_unknown_enum_strings_fall_back() {
    let storage = MemoryStorage::new();
    let k = keys();
    storage.set(&k.current_view_mode, "grid").unwrap();
    storage.set(&k.current_filter, "learned").unwrap();

    let store = ProgressStore::hydrate(storage, keys());
    assert_eq!(store.state().current_view_mode, ViewMode::Learn);
    assert_eq!(store.state().current_filter, Filter::All);
  }

  #[test]
  fn test_reset_all_restores_defaults_and_persists() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = ProgressStore::hydrate(Arc::clone(&storage), keys());
    store.set_grade(Grade::Eight);
    store.set_view_mode(ViewMode::List);
    store.set_filter(Filter::Mastered);
    store.mark_mastered("8-0");
    store.mark_learned("8-1");

    store.reset_all();
    assert_eq!(store.state(), &ProgressState::default());

    let k = keys();
    assert_eq!(storage.get(&k.current_grade).unwrap().as_deref(), Some("7"));
    assert_eq!(storage.get(&k.learned_words).unwrap().as_deref(), Some("{}"));
    assert_eq!(storage.get(&k.mastered_words).unwrap().as_deref(), Some("{}"));

    let reloaded = ProgressStore::hydrate(storage, keys());
    assert_eq!(reloaded.state(), &ProgressState::default());
  }

  #[test]
  fn test_write_failure_still_updates_memory() {
    let mut store = ProgressStore::hydrate(ReadOnlyStorage(MemoryStorage::new()), keys());
    store.mark_mastered("7-0");
    store.set_grade(Grade::Eight);
    assert!(store.is_mastered("7-0"));
    assert_eq!(store.state().current_grade, Grade::Eight);
  }
}
