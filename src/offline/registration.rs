//! Decides which cache version serves this process.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{info, warn};

use super::network::Network;
use super::storage::BucketStorage;
use super::worker::{OfflineCache, WorkerSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
  /// The configured version was already active
  Resumed,
  /// The configured version was installed and activated
  Installed,
  /// Install failed; the previously active version keeps serving
  Retained { previous: String },
  /// Install failed and nothing was active before; requests bypass the cache
  Unregistered,
}

/// Bring up the worker for `settings`.
///
/// A version recorded as active is resumed without touching the network.
/// Otherwise the new version is installed and, since a freshly installed
/// worker skips waiting, activated right away.
pub async fn register<S, N>(
  storage: Arc<S>,
  network: Arc<N>,
  settings: WorkerSettings,
) -> Result<(OfflineCache<S, N>, Registration)>
where
  S: BucketStorage + ?Sized,
  N: Network,
{
  let previous = storage.active_version()?;
  let current = settings.names.version.clone();

  if previous.as_deref() == Some(current.as_str()) {
    let worker = OfflineCache::new(storage, network, settings);
    worker.resume();
    return Ok((worker, Registration::Resumed));
  }

  let worker = OfflineCache::new(Arc::clone(&storage), Arc::clone(&network), settings.clone());
  match worker.install().await {
    Ok(()) => {
      if worker.skips_waiting() {
        worker.activate().await?;
      }
      info!(version = %current, "Registered new cache version");
      Ok((worker, Registration::Installed))
    }
    Err(_) => match previous {
      Some(previous) => {
        warn!(failed = %current, retained = %previous, "Keeping previous cache version");
        let fallback = OfflineCache::new(storage, network, settings.for_version(&previous));
        fallback.resume();
        Ok((fallback, Registration::Retained { previous }))
      }
      None => {
        warn!(version = %current, "No cache version active, requests go to the network");
        Ok((worker, Registration::Unregistered))
      }
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::offline::storage::MemoryBuckets;
  use crate::offline::testing::{settings, ScriptedNetwork};
  use crate::offline::worker::Lifecycle;

  #[tokio::test]
  async fn test_first_registration_installs_and_activates() {
    let storage = Arc::new(MemoryBuckets::new());
    let network = Arc::new(ScriptedNetwork::with_site());

    let (worker, outcome) = register(Arc::clone(&storage), network, settings("v1"))
      .await
      .unwrap();

    assert_eq!(outcome, Registration::Installed);
    assert_eq!(worker.lifecycle(), Lifecycle::Active);
    assert_eq!(storage.active_version().unwrap().as_deref(), Some("v1"));
  }

  #[tokio::test]
  async fn test_same_version_resumes_offline() {
    let storage = Arc::new(MemoryBuckets::new());
    let network = Arc::new(ScriptedNetwork::with_site());
    register(Arc::clone(&storage), Arc::clone(&network), settings("v1"))
      .await
      .unwrap();

    network.set_online(false);
    let calls = network.calls();
    let (worker, outcome) = register(storage, Arc::clone(&network), settings("v1"))
      .await
      .unwrap();

    assert_eq!(outcome, Registration::Resumed);
    assert_eq!(worker.lifecycle(), Lifecycle::Active);
    assert_eq!(network.calls(), calls);
  }

  #[tokio::test]
  async fn test_failed_upgrade_retains_previous_version() {
    let storage = Arc::new(MemoryBuckets::new());
    let network = Arc::new(ScriptedNetwork::with_site());
    register(Arc::clone(&storage), Arc::clone(&network), settings("v1"))
      .await
      .unwrap();

    network.set_online(false);
    let (worker, outcome) = register(Arc::clone(&storage), network, settings("v2"))
      .await
      .unwrap();

    assert_eq!(
      outcome,
      Registration::Retained {
        previous: "v1".to_string()
      }
    );
    assert_eq!(worker.names().static_bucket, "static-cache-v1");
    assert_eq!(worker.lifecycle(), Lifecycle::Active);
    assert_eq!(storage.bucket_names().unwrap(), vec!["static-cache-v1".to_string()]);
  }

  #[tokio::test]
  async fn test_upgrade_rotates_buckets() {
    let storage = Arc::new(MemoryBuckets::new());
    let network = Arc::new(ScriptedNetwork::with_site());
    register(Arc::clone(&storage), Arc::clone(&network), settings("v1"))
      .await
      .unwrap();

    let (_worker, outcome) = register(Arc::clone(&storage), network, settings("v2"))
      .await
      .unwrap();

    assert_eq!(outcome, Registration::Installed);
    assert_eq!(storage.bucket_names().unwrap(), vec!["static-cache-v2".to_string()]);
  }

  #[tokio::test]
  async fn test_first_install_offline_is_unregistered() {
    let storage = Arc::new(MemoryBuckets::new());
    let network = Arc::new(ScriptedNetwork::with_site());
    network.set_online(false);

    let (worker, outcome) = register(storage, network, settings("v1")).await.unwrap();

    assert_eq!(outcome, Registration::Unregistered);
    assert_eq!(worker.lifecycle(), Lifecycle::Uninstalled);
  }
}
