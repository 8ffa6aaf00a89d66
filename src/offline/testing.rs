//! Scripted network and settings shared by the offline tests.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

use super::http::{Request, Response};
use super::network::Network;
use super::policy::{CacheNames, CachePolicy};
use super::worker::WorkerSettings;
use crate::config::{CacheConfig, NotificationConfig};

pub const GRADE7_JSON: &str =
  r#"[{"french":"chat","chinese":"猫","phonetic":"/ʃa/","part_of_speech":"n."}]"#;

pub fn settings(version: &str) -> WorkerSettings {
  WorkerSettings {
    app_name: "french-vocabulary-app".to_string(),
    names: CacheNames::new("french-vocabulary-app", version),
    policy: CachePolicy::from_config(&CacheConfig::default()),
    origin: Url::parse("http://localhost:5173").unwrap(),
    offline_message: "offline for tests".to_string(),
    notifications: NotificationConfig::default(),
  }
}

/// Network serving canned responses by path, with an on/off switch.
pub struct ScriptedNetwork {
  responses: Mutex<HashMap<String, Response>>,
  online: AtomicBool,
  calls: AtomicUsize,
}

impl ScriptedNetwork {
  pub fn new() -> Self {
    Self {
      responses: Mutex::new(HashMap::new()),
      online: AtomicBool::new(true),
      calls: AtomicUsize::new(0),
    }
  }

  /// Every default manifest asset plus one script.
  pub fn with_site() -> Self {
    let network = Self::new();
    network.insert("/", Response::new(200, "<html>shell</html>"));
    network.insert("/index.html", Response::new(200, "<html>shell</html>"));
    network.insert("/manifest.json", Response::new(200, "{}"));
    for icon in ["192x192", "512x512", "144x144", "96x96", "72x72"] {
      network.insert(&format!("/icon-{}.png", icon), Response::new(200, "png"));
    }
    network.insert("/data/grade7_words.json", Response::new(200, GRADE7_JSON));
    network.insert("/data/grade8_words.json", Response::new(200, "[]"));
    network.insert("/data/grade9_words.json", Response::new(200, "[]"));
    network.insert("/assets/app.js", Response::new(200, "console.log('app')"));
    network
  }

  pub fn insert(&self, path: &str, response: Response) {
    self
      .responses
      .lock()
      .unwrap()
      .insert(path.to_string(), response);
  }

  pub fn remove(&self, path: &str) {
    self.responses.lock().unwrap().remove(path);
  }

  pub fn set_online(&self, online: bool) {
    self.online.store(online, Ordering::SeqCst);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Network for ScriptedNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if !self.online.load(Ordering::SeqCst) {
      return Err(eyre!("network unreachable"));
    }

    let responses = self.responses.lock().unwrap();
    Ok(
      responses
        .get(request.path())
        .cloned()
        .unwrap_or_else(|| Response::new(404, "not found")),
    )
  }
}
