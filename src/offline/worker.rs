//! Cache worker: install/activate lifecycle and the per-request fetch policy.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use url::Url;

use super::http::{cache_key, Destination, Request, Response};
use super::messages::{
  ControlMessage, Notification, NotificationAction, NotificationData, VersionReply,
  BACKGROUND_SYNC_TAG,
};
use super::network::Network;
use super::policy::{BucketKind, CacheNames, CachePolicy};
use super::storage::BucketStorage;
use crate::config::{Config, NotificationConfig};

/// Lifecycle of one cache version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  Uninstalled,
  Installing,
  /// Installed and waiting to be activated
  Installed,
  Activating,
  /// Intercepting fetches
  Active,
}

/// Everything a worker needs to know about its deployment.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
  pub app_name: String,
  pub names: CacheNames,
  pub policy: CachePolicy,
  /// Base URL manifest paths are resolved against
  pub origin: Url,
  pub offline_message: String,
  pub notifications: NotificationConfig,
}

impl WorkerSettings {
  pub fn from_config(config: &Config) -> Result<Self> {
    let origin = Url::parse(&config.cache.origin)
      .map_err(|e| eyre!("Invalid cache origin '{}': {}", config.cache.origin, e))?;

    Ok(Self {
      app_name: config.cache.app_name.clone(),
      names: config.cache_names(),
      policy: CachePolicy::from_config(&config.cache),
      origin,
      offline_message: config.cache.offline_message.clone(),
      notifications: config.notifications.clone(),
    })
  }

  /// Same deployment, different cache version.
  pub fn for_version(&self, version: &str) -> Self {
    Self {
      names: CacheNames::new(&self.app_name, version),
      ..self.clone()
    }
  }

  /// Resolve an origin-relative path into a GET request.
  pub fn request(&self, path: &str) -> Result<Request> {
    let url = self
      .origin
      .join(path)
      .map_err(|e| eyre!("Invalid request path '{}': {}", path, e))?;
    Ok(Request::get(url))
  }
}

/// Cache-first interception layer between callers and the network.
///
/// A worker serves one cache version. It must be installed (static assets
/// stored as one batch) and activated (stale buckets evicted) before it
/// intercepts anything; until then every request goes straight to the network.
pub struct OfflineCache<S: BucketStorage + ?Sized, N: Network> {
  storage: Arc<S>,
  network: Arc<N>,
  settings: WorkerSettings,
  lifecycle: Mutex<Lifecycle>,
  skip_waiting: AtomicBool,
  clients_claimed: AtomicBool,
}

impl<S: BucketStorage + ?Sized, N: Network> OfflineCache<S, N> {
  pub fn new(storage: Arc<S>, network: Arc<N>, settings: WorkerSettings) -> Self {
    Self {
      storage,
      network,
      settings,
      lifecycle: Mutex::new(Lifecycle::Uninstalled),
      skip_waiting: AtomicBool::new(false),
      clients_claimed: AtomicBool::new(false),
    }
  }

  pub fn names(&self) -> &CacheNames {
    &self.settings.names
  }

  #[allow(dead_code)]
  pub fn settings(&self) -> &WorkerSettings {
    &self.settings
  }

  pub fn lifecycle(&self) -> Lifecycle {
    *self.lifecycle_guard()
  }

  /// Whether an installed worker should activate without waiting.
  pub fn skips_waiting(&self) -> bool {
    self.skip_waiting.load(Ordering::SeqCst)
  }

  #[allow(dead_code)]
  pub fn clients_claimed(&self) -> bool {
    self.clients_claimed.load(Ordering::SeqCst)
  }

  fn lifecycle_guard(&self) -> MutexGuard<'_, Lifecycle> {
    self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn set_lifecycle(&self, to: Lifecycle) {
    *self.lifecycle_guard() = to;
  }

  fn transition(&self, from: Lifecycle, to: Lifecycle) -> Result<()> {
    let mut state = self.lifecycle_guard();
    if *state != from {
      return Err(eyre!("Cannot move to {:?} while {:?}", to, *state));
    }
    *state = to;
    Ok(())
  }

  /// Fetch every manifest asset and store them in the static bucket.
  ///
  /// Either all assets are stored or none are. On failure the worker goes
  /// back to `Uninstalled` and whatever version was active stays in charge.
  pub async fn install(&self) -> Result<()> {
    self.transition(Lifecycle::Uninstalled, Lifecycle::Installing)?;
    info!(bucket = %self.settings.names.static_bucket, "Installing");

    match self.precache().await {
      Ok(count) => {
        self.set_lifecycle(Lifecycle::Installed);
        self.skip_waiting.store(true, Ordering::SeqCst);
        info!(count, "Static assets cached");
        Ok(())
      }
      Err(e) => {
        self.set_lifecycle(Lifecycle::Uninstalled);
        error!(error = %e, "Failed to cache static assets");
        Err(e)
      }
    }
  }

  async fn precache(&self) -> Result<usize> {
    let requests = self
      .settings
      .policy
      .manifest()
      .iter()
      .map(|path| self.settings.request(path))
      .collect::<Result<Vec<_>>>()?;

    let entries = futures::future::try_join_all(requests.iter().map(|request| async move {
      let response = self.network.fetch(request).await?;
      if !response.is_success() {
        return Err(eyre!(
          "Request for {} failed with status {}",
          request.url,
          response.status
        ));
      }
      Ok((request.cache_key(), response))
    }))
    .await?;

    self
      .storage
      .put_all(&self.settings.names.static_bucket, &entries)?;

    Ok(entries.len())
  }

  /// Evict buckets from other versions, claim clients and start intercepting.
  pub async fn activate(&self) -> Result<()> {
    self.transition(Lifecycle::Installed, Lifecycle::Activating)?;
    info!(version = %self.settings.names.version, "Activating");

    if let Err(e) = self.evict_stale_buckets() {
      self.set_lifecycle(Lifecycle::Installed);
      return Err(e);
    }

    self.claim_clients();
    self.set_lifecycle(Lifecycle::Active);

    if let Err(e) = self.storage.set_active_version(&self.settings.names.version) {
      warn!(error = %e, "Failed to record active version");
    }

    info!("Activation complete");
    Ok(())
  }

  /// Take over as the already-activated version without reinstalling.
  pub fn resume(&self) {
    self.claim_clients();
    self.set_lifecycle(Lifecycle::Active);
    debug!(version = %self.settings.names.version, "Resumed active worker");
  }

  fn evict_stale_buckets(&self) -> Result<usize> {
    let mut deleted = 0;
    for name in self.storage.bucket_names()? {
      if !self.settings.names.is_current(&name) {
        info!(bucket = %name, "Deleting old cache");
        if self.storage.delete_bucket(&name)? {
          deleted += 1;
        }
      }
    }
    Ok(deleted)
  }

  fn claim_clients(&self) {
    self.clients_claimed.store(true, Ordering::SeqCst);
  }

  /// Respond to an intercepted request.
  ///
  /// Returns `None` when the request is not intercepted: the worker is not
  /// active yet, or the request is not an http(s) GET.
  pub async fn handle_fetch(&self, request: &Request) -> Option<Response> {
    if !request.is_interceptable() || self.lifecycle() != Lifecycle::Active {
      return None;
    }
    Some(self.respond(request).await)
  }

  /// Fetch through the cache when intercepted, straight from the network otherwise.
  pub async fn fetch(&self, request: &Request) -> Result<Response> {
    match self.handle_fetch(request).await {
      Some(response) => Ok(response),
      None => self.network.fetch(request).await,
    }
  }

  async fn respond(&self, request: &Request) -> Response {
    match self.storage.match_any(&request.cache_key()) {
      Ok(Some(cached)) => {
        debug!(
          path = request.path(),
          bucket = %cached.bucket,
          cached_at = %cached.cached_at,
          "Serving from cache"
        );
        return cached.response;
      }
      Ok(None) => {}
      Err(e) => warn!(path = request.path(), error = %e, "Cache lookup failed"),
    }

    debug!(path = request.path(), "Fetching from network");
    match self.network.fetch(request).await {
      Ok(response) => {
        if response.is_success() {
          self.store(request, &response);
        }
        response
      }
      Err(e) => {
        warn!(path = request.path(), error = %e, "Fetch failed");
        self.offline_fallback(request)
      }
    }
  }

  fn store(&self, request: &Request, response: &Response) {
    let bucket = match self.settings.policy.classify(request.path()) {
      Some(BucketKind::Static) => &self.settings.names.static_bucket,
      Some(BucketKind::Dynamic) => &self.settings.names.dynamic_bucket,
      None => return,
    };

    match self.storage.put(bucket, &request.cache_key(), response) {
      Ok(()) => debug!(path = request.path(), bucket = %bucket, "Network response cached"),
      Err(e) => error!(path = request.path(), error = %e, "Failed to cache response"),
    }
  }

  fn offline_fallback(&self, request: &Request) -> Response {
    if request.destination == Destination::Document {
      if let Some(shell) = self.cached_shell() {
        return shell;
      }
    }
    Response::offline(&self.settings.offline_message)
  }

  /// The app's root page, resolved against the configured origin.
  fn cached_shell(&self) -> Option<Response> {
    let root = self.settings.origin.join("/").ok()?;
    match self.storage.match_any(&cache_key(&root)) {
      Ok(hit) => hit.map(|cached| cached.response),
      Err(e) => {
        warn!(error = %e, "Shell lookup failed");
        None
      }
    }
  }

  /// Handle a control message. `reply` receives the answer to `GetVersion`.
  pub async fn handle_message(
    &self,
    message: ControlMessage,
    reply: Option<oneshot::Sender<VersionReply>>,
  ) -> Result<()> {
    debug!(?message, "Received message");

    match message {
      ControlMessage::SkipWaiting => {
        self.skip_waiting.store(true, Ordering::SeqCst);
        if self.lifecycle() == Lifecycle::Installed {
          self.activate().await?;
        }
      }
      ControlMessage::GetVersion => {
        let version = VersionReply {
          version: self.settings.names.release.clone(),
        };
        match reply {
          Some(tx) => {
            if tx.send(version).is_err() {
              debug!("Version requester went away");
            }
          }
          None => warn!("GET_VERSION without a reply channel"),
        }
      }
      ControlMessage::ClearCache => {
        let cleared = self.clear_all()?;
        info!(cleared, "Cleared all caches");
      }
    }
    Ok(())
  }

  /// Delete every bucket, current versions included.
  pub fn clear_all(&self) -> Result<usize> {
    let mut cleared = 0;
    for name in self.storage.bucket_names()? {
      if self.storage.delete_bucket(&name)? {
        cleared += 1;
      }
    }
    Ok(cleared)
  }

  /// Hook point for syncing progress in the background. Currently only logs.
  pub async fn background_sync(&self, tag: &str) -> Result<()> {
    if tag == BACKGROUND_SYNC_TAG {
      info!("Performing background sync");
    } else {
      debug!(tag, "Ignoring sync event");
    }
    Ok(())
  }

  /// Build the notification shown for a push event.
  pub fn push(&self, payload: Option<&str>) -> Notification {
    let cfg = &self.settings.notifications;
    let action = |action: &str, title: &str, icon: &str| NotificationAction {
      action: action.to_string(),
      title: title.to_string(),
      icon: icon.to_string(),
    };

    Notification {
      title: cfg.title.clone(),
      body: payload
        .map(String::from)
        .unwrap_or_else(|| cfg.default_body.clone()),
      icon: cfg.icon.clone(),
      badge: cfg.badge.clone(),
      vibrate: vec![200, 100, 200],
      data: NotificationData {
        date_of_arrival: Utc::now(),
        primary_key: "1".to_string(),
      },
      actions: vec![
        action("explore", "开始学习", "/icon-96x96.png"),
        action("close", "关闭", "/icon-72x72.png"),
      ],
    }
  }

  /// URL to open when a notification is clicked, if any.
  pub fn notification_click(&self, action: Option<&str>) -> Option<Url> {
    match action {
      Some("close") => None,
      _ => self.settings.origin.join("/").ok(),
    }
  }
}
