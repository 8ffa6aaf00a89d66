use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::{CacheCommand, Command};
use crate::config::Config;
use crate::offline::{
  register, BucketStorage, ControlMessage, Destination, HttpNetwork, MemoryBuckets, NoopBuckets,
  OfflineCache, Response, SqliteBuckets, WorkerHandle, WorkerRuntime, WorkerSettings,
};
use crate::progress::{Grade, KeyValueStorage, MemoryStorage, ProgressStore, SqliteKvStorage};
use crate::vocab::{self, validate, DatasetLoader, WordWithStatus};

/// Command-line front end over the progress store and the offline cache
pub struct App {
  config: Config,
  settings: WorkerSettings,
  store: ProgressStore<Box<dyn KeyValueStorage>>,
  cache: WorkerHandle,
  /// Extra attempts after a failed dataset load
  retries: u32,
}

impl App {
  pub async fn new(config: Config, ephemeral: bool, retries: u32) -> Result<Self> {
    let data_dir = config.data_dir()?;
    let settings = WorkerSettings::from_config(&config)?;

    let kv: Box<dyn KeyValueStorage> = if ephemeral {
      Box::new(MemoryStorage::new())
    } else {
      Box::new(SqliteKvStorage::open(&data_dir.join("progress.db"))?)
    };
    let store = ProgressStore::hydrate(kv, config.storage_keys());

    let network = Arc::new(HttpNetwork::new()?);
    let worker = if config.cache.enabled {
      let buckets: Arc<dyn BucketStorage> = if ephemeral {
        Arc::new(MemoryBuckets::new())
      } else {
        Arc::new(SqliteBuckets::open(&data_dir.join("cache.db"))?)
      };
      let (worker, registration) = register(buckets, network, settings.clone()).await?;
      info!(?registration, version = %worker.names().version, "Cache worker ready");
      worker
    } else {
      let buckets: Arc<dyn BucketStorage> = Arc::new(NoopBuckets);
      let worker = OfflineCache::new(buckets, network, settings.clone());
      worker.resume();
      info!("Caching disabled");
      worker
    };
    let cache = WorkerRuntime::spawn(Arc::new(worker));

    Ok(Self {
      config,
      settings,
      store,
      cache,
      retries,
    })
  }

  pub async fn run(&mut self, command: Command) -> Result<()> {
    match command {
      Command::Status => self.status().await?,
      Command::Grade { grade } => {
        self.store.set_grade(grade);
        println!("Grade set to {}", grade);
      }
      Command::Mode { mode } => {
        self.store.set_view_mode(mode);
        println!("View mode set to {}", mode);
      }
      Command::Filter { filter } => {
        self.store.set_filter(filter);
        println!("Filter set to {}", filter);
      }
      Command::Next => self.next().await?,
      Command::List => self.list().await?,
      Command::Mark { id, mastered } => {
        if mastered {
          self.store.mark_mastered(&id);
        } else {
          self.store.mark_learned(&id);
        }
        self.print_word_status(&id);
      }
      Command::Unmark { id, mastered } => {
        if mastered {
          self.store.unmark_mastered(&id);
        } else {
          self.store.unmark_learned(&id);
        }
        self.print_word_status(&id);
      }
      Command::Reset => {
        self.store.reset_all();
        println!("All progress cleared");
      }
      Command::Cache { action } => self.cache_command(action).await?,
      Command::Validate { file, min, max } => validate_file(&file, min, max)?,
    }
    Ok(())
  }

  async fn status(&self) -> Result<()> {
    let state = self.store.state();
    println!("Grade:     {}", state.current_grade);
    println!("View mode: {}", state.current_view_mode);
    println!("Filter:    {}", state.current_filter);

    let words = self.load_words().await?;
    let summary = vocab::summarize(&words);
    println!(
      "Progress:  {}/{} mastered ({}%), {} learned",
      summary.mastered, summary.total, summary.percentage, summary.learned
    );
    Ok(())
  }

  async fn next(&self) -> Result<()> {
    let words = self.load_words().await?;
    match vocab::next_word(&words, &mut rand::thread_rng()) {
      Some(word) => print_word(word),
      None => println!("No words for grade {}", self.store.state().current_grade),
    }
    Ok(())
  }

  async fn list(&self) -> Result<()> {
    let words = self.load_words().await?;
    let filter = self.store.state().current_filter;
    let shown = vocab::filter_words(&words, filter);
    if shown.is_empty() {
      println!("No words match filter {}", filter);
    }
    for word in shown {
      print_word(word);
    }
    Ok(())
  }

  /// Load the current grade's words and join them with progress.
  async fn load_words(&self) -> Result<Vec<WordWithStatus>> {
    let mut loader = DatasetLoader::new(self.store.state().current_grade);
    loader.load(|grade| self.fetch_dataset(grade)).await;

    for _ in 0..self.retries {
      if loader.state().error().is_none() {
        break;
      }
      loader.retry(|grade| self.fetch_dataset(grade)).await;
    }

    if let Some(e) = loader.state().error() {
      return Err(eyre!(
        "Grade {} words unavailable: {}. Run the command again to retry.",
        loader.grade(),
        e
      ));
    }
    Ok(loader.words_with_status(self.store.state()).unwrap_or_default())
  }

  async fn fetch_dataset(&self, grade: Grade) -> Result<Response> {
    let path = format!("{}{}", self.config.cache.data_prefix, grade.dataset_file());
    let request = self.settings.request(&path)?;
    self.cache.fetch(request).await
  }

  async fn cache_command(&self, action: CacheCommand) -> Result<()> {
    match action {
      CacheCommand::Version => println!("{}", self.cache.version().await?),
      CacheCommand::Clear => {
        self.cache.send_message(ControlMessage::ClearCache).await?;
        println!("All caches cleared");
      }
      CacheCommand::Get { path, document } => {
        let mut request = self.settings.request(&path)?;
        if document {
          request = request.with_destination(Destination::Document);
        }
        let response = self.cache.fetch(request).await?;
        if response.is_offline_placeholder() {
          println!("Offline: nothing cached for {}", path);
        }
        println!("HTTP {}", response.status);
        for (name, value) in &response.headers {
          println!("{}: {}", name, value);
        }
        println!();
        println!("{}", response.text());
      }
      CacheCommand::Message { kind } => {
        let message: ControlMessage = serde_json::from_value(serde_json::json!({ "type": kind }))
          .map_err(|e| eyre!("Unknown message type {}: {}", kind, e))?;
        if message == ControlMessage::GetVersion {
          println!("{}", self.cache.version().await?);
        } else {
          self.cache.send_message(message).await?;
          println!("Handled {}", kind);
        }
      }
      CacheCommand::Sync { tag } => {
        self.cache.sync(&tag).await?;
        println!("Sync {} done", tag);
      }
      CacheCommand::Push { payload, click } => {
        let notification = self.cache.push(payload).await?;
        let rendered = serde_json::to_string_pretty(&notification)
          .map_err(|e| eyre!("Failed to render notification: {}", e))?;
        println!("{}", rendered);

        if let Some(action) = click {
          match self.cache.notification_click(Some(action)).await? {
            Some(url) => println!("Open {}", url),
            None => println!("Dismissed"),
          }
        }
      }
    }
    Ok(())
  }

  fn print_word_status(&self, id: &str) {
    println!(
      "{}: learned={} mastered={}",
      id,
      self.store.is_learned(id),
      self.store.is_mastered(id)
    );
  }
}

fn print_word(word: &WordWithStatus) {
  let marker = if word.is_mastered {
    "M"
  } else if word.is_learned {
    "L"
  } else {
    " "
  };
  println!(
    "[{}] {:<6} {} {} ({}) {}",
    marker,
    word.id,
    word.word.french,
    word.word.phonetic,
    word.word.part_of_speech,
    word.word.chinese
  );
}

/// Validate a local dataset file and print the report.
pub fn validate_file(path: &Path, min: usize, max: usize) -> Result<()> {
  let raw = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  let report = validate::validate_dataset(&raw, min..=max)?;

  println!("Words: {}", report.total);
  if report.count_ok() {
    println!("✓ Word count within {}-{}", min, max);
  } else {
    println!("✗ Word count outside {}-{}", min, max);
  }

  for missing in &report.missing {
    println!("✗ Entry {} is missing {}", missing.index + 1, missing.field);
  }
  if report.fields_ok() {
    println!("✓ All entries have the required fields");
  }

  println!("Parts of speech:");
  for (pos, count) in &report.part_of_speech {
    println!("  {}: {}", pos, count);
  }

  if report.is_valid() {
    Ok(())
  } else {
    Err(eyre!("{} failed validation", path.display()))
  }
}
