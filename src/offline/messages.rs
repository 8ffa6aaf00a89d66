//! Out-of-band control messages and notification payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Control message posted by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
  /// Activate an installed worker without waiting for older instances
  SkipWaiting,
  /// Reply with the active release name
  GetVersion,
  /// Delete every bucket unconditionally
  ClearCache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReply {
  pub version: String,
}

/// Tag that triggers the background sync hook.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
  pub action: String,
  pub title: String,
  pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
  pub date_of_arrival: DateTime<Utc>,
  pub primary_key: String,
}

/// Description of a notification to display for a push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  /// Vibration pattern in milliseconds
  pub vibrate: Vec<u32>,
  pub data: NotificationData,
  pub actions: Vec<NotificationAction>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_control_messages_use_type_tag() {
    let msg: ControlMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
    assert_eq!(msg, ControlMessage::SkipWaiting);

    let msg: ControlMessage = serde_json::from_str(r#"{"type":"GET_VERSION"}"#).unwrap();
    assert_eq!(msg, ControlMessage::GetVersion);

    assert_eq!(
      serde_json::to_string(&ControlMessage::ClearCache).unwrap(),
      r#"{"type":"CLEAR_CACHE"}"#
    );
  }

  #[test]
  fn test_unknown_message_type_is_rejected() {
    assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"RELOAD"}"#).is_err());
  }
}
