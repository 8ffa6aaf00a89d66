use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::progress::{self, Grade, ViewMode};

#[derive(Parser, Debug)]
#[command(name = "fvocab")]
#[command(about = "Offline-first French vocabulary flashcards")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fvocab/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Keep progress and caches in memory only
  #[arg(long)]
  pub ephemeral: bool,

  /// Also log to stderr
  #[arg(short, long)]
  pub verbose: bool,

  /// Retry a failed dataset load this many times
  #[arg(long, default_value_t = 0)]
  pub retries: u32,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Show settings and progress for the current grade
  Status,
  /// Switch grade (7, 8 or 9)
  Grade { grade: Grade },
  /// Switch view mode (learn or list)
  Mode { mode: ViewMode },
  /// Switch list filter (all, mastered or not-mastered)
  Filter { filter: progress::Filter },
  /// Show a random word to study, unmastered words first
  Next,
  /// List words of the current grade under the current filter
  List,
  /// Mark a word as learned, or mastered with --mastered
  Mark {
    id: String,
    #[arg(long)]
    mastered: bool,
  },
  /// Remove learned status (and mastery), or only mastery with --mastered
  Unmark {
    id: String,
    #[arg(long)]
    mastered: bool,
  },
  /// Forget all progress and settings
  Reset,
  /// Inspect and drive the offline cache
  Cache {
    #[command(subcommand)]
    action: CacheCommand,
  },
  /// Check a dataset file before publishing it
  Validate {
    file: PathBuf,
    #[arg(long, default_value_t = 80)]
    min: usize,
    #[arg(long, default_value_t = 120)]
    max: usize,
  },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// Print the active cache release
  Version,
  /// Delete every cache bucket
  Clear,
  /// Fetch a path through the cache and print the response
  Get {
    path: String,
    /// Treat the request as a page navigation
    #[arg(long)]
    document: bool,
  },
  /// Post a control message (SKIP_WAITING, GET_VERSION or CLEAR_CACHE)
  Message { kind: String },
  /// Trigger a background sync event
  Sync {
    #[arg(default_value = "background-sync")]
    tag: String,
  },
  /// Show the notification a push would display
  Push {
    payload: Option<String>,
    /// Also click the notification with this action and print the page it opens
    #[arg(long)]
    click: Option<String>,
  },
}
