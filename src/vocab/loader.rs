//! Per-grade dataset loading with an explicit load state.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use tracing::{info, warn};

use super::dataset::with_status;
use super::types::{Word, WordWithStatus};
use crate::offline::Response;
use crate::progress::{Grade, ProgressState};

/// The state of a dataset load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
  /// Nothing requested yet
  Idle,
  Loading,
  Loaded(T),
  /// Load failed; the message is shown next to a retry affordance
  Failed(String),
}

impl<T> LoadState<T> {
  pub fn data(&self) -> Option<&T> {
    match self {
      LoadState::Loaded(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      LoadState::Failed(e) => Some(e),
      _ => None,
    }
  }
}

/// Loads one grade's word list through a caller-supplied fetcher.
///
/// The fetcher receives the grade and returns the raw response, so the
/// loader works the same over the offline cache or a plain network client.
#[derive(Debug)]
pub struct DatasetLoader {
  grade: Grade,
  state: LoadState<Vec<Word>>,
}

impl DatasetLoader {
  pub fn new(grade: Grade) -> Self {
    Self {
      grade,
      state: LoadState::Idle,
    }
  }

  pub fn grade(&self) -> Grade {
    self.grade
  }

  pub fn state(&self) -> &LoadState<Vec<Word>> {
    &self.state
  }

  pub async fn load<F, Fut>(&mut self, fetch: F) -> &LoadState<Vec<Word>>
  where
    F: FnOnce(Grade) -> Fut,
    Fut: Future<Output = Result<Response>>,
  {
    self.state = LoadState::Loading;

    self.state = match fetch(self.grade).await.and_then(|r| parse_dataset(self.grade, &r)) {
      Ok(words) => {
        info!(grade = %self.grade, count = words.len(), "Loaded words");
        LoadState::Loaded(words)
      }
      Err(e) => {
        warn!(grade = %self.grade, error = %e, "Failed to load words");
        LoadState::Failed(e.to_string())
      }
    };

    &self.state
  }

  /// Load again after a failure. A loaded dataset is kept as is.
  pub async fn retry<F, Fut>(&mut self, fetch: F) -> &LoadState<Vec<Word>>
  where
    F: FnOnce(Grade) -> Fut,
    Fut: Future<Output = Result<Response>>,
  {
    if self.state.data().is_some() {
      return &self.state;
    }
    self.load(fetch).await
  }

  /// Loaded words joined with `progress`, if the load succeeded.
  pub fn words_with_status(&self, progress: &ProgressState) -> Option<Vec<WordWithStatus>> {
    self
      .state
      .data()
      .map(|words| with_status(self.grade, words, progress))
  }
}

/// Decode a dataset response. Anything but a 200 with a JSON word array fails.
pub fn parse_dataset(grade: Grade, response: &Response) -> Result<Vec<Word>> {
  if !response.is_success() {
    return Err(eyre!(
      "Failed to load grade {} words (status {})",
      grade,
      response.status
    ));
  }

  serde_json::from_slice(&response.body)
    .map_err(|e| eyre!("Failed to parse grade {} words: {}", grade, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::offline::testing::GRADE7_JSON;
  use crate::progress::{MemoryStorage, ProgressStore, StorageKeys};
  use crate::vocab::dataset::summarize;
  use crate::vocab::types::ProgressSummary;
  use std::cell::Cell;

  async fn ok(body: &str) -> Result<Response> {
    Ok(Response::new(200, body.to_string()))
  }

  #[tokio::test]
  async fn test_load_and_derive_end_to_end() {
    let mut loader = DatasetLoader::new(Grade::Seven);
    assert_eq!(loader.state(), &LoadState::Idle);

    loader.load(|_| ok(GRADE7_JSON)).await;

    let mut progress = ProgressState::default();
    let words = loader.words_with_status(&progress).unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].id, "7-0");
    assert_eq!(words[0].word.french, "chat");
    assert_eq!(words[0].word.part_of_speech, "n.");
    assert!(!words[0].is_learned && !words[0].is_mastered);

    progress.mastered_words.insert("7-0");
    progress.learned_words.insert("7-0");
    let words = loader.words_with_status(&progress).unwrap();
    assert!(words[0].is_learned && words[0].is_mastered);
  }

  #[tokio::test]
  async fn test_mastering_through_store_updates_summary() {
    let mut loader = DatasetLoader::new(Grade::Seven);
    loader.load(|_| ok(GRADE7_JSON)).await;

    let mut store = ProgressStore::hydrate(MemoryStorage::new(), StorageKeys::new("french-app"));
    let words = loader.words_with_status(store.state()).unwrap();
    assert_eq!(words[0].id, "7-0");
    assert!(!words[0].is_learned && !words[0].is_mastered);

    store.mark_mastered("7-0");

    let words = loader.words_with_status(store.state()).unwrap();
    assert!(words[0].is_learned && words[0].is_mastered);
    assert_eq!(
      summarize(&words),
      ProgressSummary {
        total: 1,
        learned: 1,
        mastered: 1,
        percentage: 100,
      }
    );
  }

  #[tokio::test]
  async fn test_fetcher_receives_grade() {
    let mut loader = DatasetLoader::new(Grade::Nine);
    let seen = Cell::new(None);

    loader
      .load(|grade| {
        seen.set(Some(grade));
        ok("[]")
      })
      .await;

    assert_eq!(seen.get(), Some(Grade::Nine));
    assert_eq!(loader.state(), &LoadState::Loaded(Vec::new()));
  }

  #[tokio::test]
  async fn test_non_200_fails() {
    let mut loader = DatasetLoader::new(Grade::Eight);
    let state = loader
      .load(|_| async { Ok::<_, color_eyre::Report>(Response::offline("offline")) })
      .await;

    assert!(state.error().unwrap().contains("grade 8"));
    assert!(loader.words_with_status(&ProgressState::default()).is_none());
  }

  #[tokio::test]
  async fn test_malformed_json_fails() {
    let mut loader = DatasetLoader::new(Grade::Seven);
    loader.load(|_| ok("[{\"french\": 1}")).await;
    assert!(loader.state().error().is_some());
  }

  #[tokio::test]
  async fn test_retry_recovers_after_failure() {
    let mut loader = DatasetLoader::new(Grade::Seven);
    loader
      .load(|_| async { Err::<Response, _>(eyre!("network unreachable")) })
      .await;
    assert!(loader.state().error().unwrap().contains("unreachable"));

    loader.retry(|_| ok(GRADE7_JSON)).await;
    assert_eq!(loader.state().data().map(Vec::len), Some(1));

    // Loaded data is kept; a failing fetcher would otherwise replace it
    loader
      .retry(|_| async { Err::<Response, _>(eyre!("should not be fetched")) })
      .await;
    assert_eq!(loader.state().data().map(Vec::len), Some(1));
  }

  #[test]
  fn test_camel_case_alias_accepted() {
    let body = r#"[{"french":"vite","chinese":"快","phonetic":"/vit/","partOfSpeech":"adv.","category":"time"}]"#;
    let words = parse_dataset(Grade::Seven, &Response::new(200, body)).unwrap();
    assert_eq!(words[0].part_of_speech, "adv.");
    assert_eq!(words[0].category.as_deref(), Some("time"));
  }
}
