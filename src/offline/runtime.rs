//! Event source driving an activated worker.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};
use url::Url;

use super::http::{Request, Response};
use super::messages::{ControlMessage, Notification, VersionReply};
use super::network::Network;
use super::storage::BucketStorage;
use super::worker::OfflineCache;

/// Events delivered to the worker
#[derive(Debug)]
pub enum WorkerEvent {
  /// Network request issued by a client
  Fetch {
    request: Request,
    respond_to: oneshot::Sender<Result<Response>>,
  },
  /// Control message, with an optional reply port and completion signal
  Message {
    message: ControlMessage,
    reply: Option<oneshot::Sender<VersionReply>>,
    done: Option<oneshot::Sender<()>>,
  },
  /// Background sync request, signalled once handled
  Sync {
    tag: String,
    done: oneshot::Sender<()>,
  },
  /// Push payload to turn into a notification
  Push {
    payload: Option<String>,
    respond_to: oneshot::Sender<Notification>,
  },
  /// Click on a shown notification, answered with the page to open
  NotificationClick {
    action: Option<String>,
    respond_to: oneshot::Sender<Option<Url>>,
  },
}

/// Cloneable handle for sending events to a running worker
#[derive(Clone)]
pub struct WorkerHandle {
  tx: mpsc::UnboundedSender<WorkerEvent>,
}

/// Runs the worker's event loop until every handle is dropped.
///
/// Fetches are handled concurrently, one task each. Messages, sync and push
/// events are handled one at a time in arrival order.
pub struct WorkerRuntime;

impl WorkerRuntime {
  pub fn spawn<S, N>(worker: Arc<OfflineCache<S, N>>) -> WorkerHandle
  where
    S: BucketStorage + ?Sized + 'static,
    N: Network,
  {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      while let Some(event) = rx.recv().await {
        match event {
          WorkerEvent::Fetch {
            request,
            respond_to,
          } => {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move {
              let result = worker.fetch(&request).await;
              // Ignore send errors - requester may have gone away
              let _ = respond_to.send(result);
            });
          }
          WorkerEvent::Message {
            message,
            reply,
            done,
          } => {
            if let Err(e) = worker.handle_message(message, reply).await {
              error!(?message, error = %e, "Message handling failed");
            }
            if let Some(done) = done {
              let _ = done.send(());
            }
          }
          WorkerEvent::Sync { tag, done } => {
            if let Err(e) = worker.background_sync(&tag).await {
              error!(tag, error = %e, "Background sync failed");
            }
            let _ = done.send(());
          }
          WorkerEvent::Push {
            payload,
            respond_to,
          } => {
            let _ = respond_to.send(worker.push(payload.as_deref()));
          }
          WorkerEvent::NotificationClick { action, respond_to } => {
            let _ = respond_to.send(worker.notification_click(action.as_deref()));
          }
        }
      }
      debug!("Worker event loop stopped");
    });

    WorkerHandle { tx }
  }
}

impl WorkerHandle {
  fn send(&self, event: WorkerEvent) -> Result<()> {
    self
      .tx
      .send(event)
      .map_err(|_| eyre!("Cache worker is not running"))
  }

  pub async fn fetch(&self, request: Request) -> Result<Response> {
    let (tx, rx) = oneshot::channel();
    self.send(WorkerEvent::Fetch {
      request,
      respond_to: tx,
    })?;
    rx.await
      .map_err(|_| eyre!("Cache worker dropped the request"))?
  }

  /// Send a control message and wait until the worker has handled it.
  pub async fn send_message(&self, message: ControlMessage) -> Result<()> {
    let (tx, rx) = oneshot::channel();
    self.send(WorkerEvent::Message {
      message,
      reply: None,
      done: Some(tx),
    })?;
    rx.await
      .map_err(|_| eyre!("Cache worker stopped before handling {:?}", message))
  }

  pub async fn version(&self) -> Result<String> {
    let (tx, rx) = oneshot::channel();
    self.send(WorkerEvent::Message {
      message: ControlMessage::GetVersion,
      reply: Some(tx),
      done: None,
    })?;
    let reply = rx
      .await
      .map_err(|_| eyre!("Cache worker did not report a version"))?;
    Ok(reply.version)
  }

  pub async fn sync(&self, tag: &str) -> Result<()> {
    let (tx, rx) = oneshot::channel();
    self.send(WorkerEvent::Sync {
      tag: tag.to_string(),
      done: tx,
    })?;
    rx.await
      .map_err(|_| eyre!("Cache worker stopped before syncing {}", tag))
  }

  pub async fn push(&self, payload: Option<String>) -> Result<Notification> {
    let (tx, rx) = oneshot::channel();
    self.send(WorkerEvent::Push {
      payload,
      respond_to: tx,
    })?;
    rx.await
      .map_err(|_| eyre!("Cache worker dropped the push event"))
  }

  pub async fn notification_click(&self, action: Option<String>) -> Result<Option<Url>> {
    let (tx, rx) = oneshot::channel();
    self.send(WorkerEvent::NotificationClick {
      action,
      respond_to: tx,
    })?;
    rx.await
      .map_err(|_| eyre!("Cache worker dropped the notification click"))
  }
}
