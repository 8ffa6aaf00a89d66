//! Status derivation, filtering and selection over a loaded word list.

use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{ProgressSummary, Word, WordWithStatus};
use crate::progress::{Filter, Grade, ProgressState};

pub fn word_id(grade: Grade, index: usize) -> String {
  format!("{}-{}", grade, index)
}

/// Join each word with its learned/mastered flags.
pub fn with_status(grade: Grade, words: &[Word], state: &ProgressState) -> Vec<WordWithStatus> {
  words
    .iter()
    .enumerate()
    .map(|(index, word)| {
      let id = word_id(grade, index);
      WordWithStatus {
        is_learned: state.learned_words.contains(&id),
        is_mastered: state.mastered_words.contains(&id),
        word: word.clone(),
        grade,
        id,
      }
    })
    .collect()
}

pub fn filter_words(words: &[WordWithStatus], filter: Filter) -> Vec<&WordWithStatus> {
  words
    .iter()
    .filter(|w| match filter {
      Filter::All => true,
      Filter::Mastered => w.is_mastered,
      Filter::NotMastered => !w.is_mastered,
    })
    .collect()
}

pub fn summarize(words: &[WordWithStatus]) -> ProgressSummary {
  let total = words.len();
  let learned = words.iter().filter(|w| w.is_learned).count();
  let mastered = words.iter().filter(|w| w.is_mastered).count();
  let percentage = if total > 0 {
    ((mastered * 200 + total) / (total * 2)) as u8
  } else {
    0
  };

  ProgressSummary {
    total,
    learned,
    mastered,
    percentage,
  }
}

/// Pick a random unmastered word, or any word once everything is mastered.
pub fn next_word<'a, R: Rng + ?Sized>(
  words: &'a [WordWithStatus],
  rng: &mut R,
) -> Option<&'a WordWithStatus> {
  let unmastered = filter_words(words, Filter::NotMastered);
  if let Some(word) = unmastered.choose(rng) {
    return Some(*word);
  }
  words.choose(rng)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn word(french: &str) -> Word {
    Word {
      french: french.to_string(),
      chinese: "词".to_string(),
      phonetic: "/x/".to_string(),
      part_of_speech: "n.".to_string(),
      category: None,
    }
  }

  fn words() -> Vec<Word> {
    vec![word("chat"), word("chien"), word("maison"), word("école")]
  }

  #[test]
  fn test_ids_follow_grade_and_index() {
    let derived = with_status(Grade::Eight, &words(), &ProgressState::default());
    let ids: Vec<_> = derived.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["8-0", "8-1", "8-2", "8-3"]);
    assert!(derived.iter().all(|w| w.grade == Grade::Eight));
  }

  #[test]
  fn test_status_comes_from_state() {
    let mut state = ProgressState::default();
    state.learned_words.insert("7-1");
    state.learned_words.insert("7-2");
    state.mastered_words.insert("7-2");

    let derived = with_status(Grade::Seven, &words(), &state);
    assert!(!derived[0].is_learned);
    assert!(derived[1].is_learned && !derived[1].is_mastered);
    assert!(derived[2].is_learned && derived[2].is_mastered);
  }

  #[test]
  fn test_filters() {
    let mut state = ProgressState::default();
    state.learned_words.insert("7-0");
    state.mastered_words.insert("7-0");
    let derived = with_status(Grade::Seven, &words(), &state);

    assert_eq!(filter_words(&derived, Filter::All).len(), 4);
    assert_eq!(filter_words(&derived, Filter::Mastered)[0].id, "7-0");
    assert_eq!(filter_words(&derived, Filter::NotMastered).len(), 3);
  }

  #[test]
  fn test_summary_rounds_percentage() {
    let mut state = ProgressState::default();
    for id in ["7-0", "7-1", "7-2"] {
      state.learned_words.insert(id);
    }
    state.mastered_words.insert("7-0");
    let derived = with_status(Grade::Seven, &words()[..3], &state);

    let summary = summarize(&derived);
    assert_eq!(
      summary,
      ProgressSummary {
        total: 3,
        learned: 3,
        mastered: 1,
        percentage: 33,
      }
    );

    state.mastered_words.insert("7-1");
    assert_eq!(summarize(&with_status(Grade::Seven, &words()[..3], &state)).percentage, 67);
  }

  #[test]
  fn test_empty_summary() {
    let summary = summarize(&[]);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.percentage, 0);
  }

  #[test]
  fn test_next_word_prefers_unmastered() {
    let mut state = ProgressState::default();
    for id in ["7-0", "7-1", "7-3"] {
      state.mastered_words.insert(id);
    }
    let derived = with_status(Grade::Seven, &words(), &state);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
      assert_eq!(next_word(&derived, &mut rng).unwrap().id, "7-2");
    }
  }

  #[test]
  fn test_next_word_when_all_mastered_or_empty() {
    let mut state = ProgressState::default();
    for i in 0..4 {
      state.mastered_words.insert(&word_id(Grade::Seven, i));
    }
    let derived = with_status(Grade::Seven, &words(), &state);
    let mut rng = StdRng::seed_from_u64(1);

    assert!(next_word(&derived, &mut rng).is_some());
    assert!(next_word(&[], &mut rng).is_none());
  }
}
