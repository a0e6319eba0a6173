//! Deferred-sync and push-notification handlers.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::Agent;
use crate::cache::CacheStore;
use crate::net::Fetcher;

/// Sync tag registered by pages that queue form submissions while offline.
pub const FORM_SYNC_TAG: &str = "sync-forms";

/// Whether a handler actually does something for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
  Implemented(T),
  /// The event is recognized but the feature behind it does not exist yet
  NotImplemented { feature: &'static str },
}

/// Notification built from a push payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
  pub title: String,
  pub body: Option<String>,
  pub icon: String,
  pub badge: String,
  pub vibrate: Vec<u32>,
  pub data: Value,
}

/// Fields read from a push message.
#[derive(Debug, Deserialize)]
struct PushPayload {
  title: String,
  body: Option<String>,
  data: Option<Value>,
}

/// Instruction for the hosting runtime after a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "url", rename_all = "snake_case")]
pub enum ClientAction {
  CloseNotification,
  OpenWindow(String),
}

impl<S: CacheStore, F: Fetcher> Agent<S, F> {
  /// Handle a deferred-sync event.
  ///
  /// Returns `None` for tags nobody registered. Replaying queued form
  /// submissions is not implemented.
  pub fn handle_sync(&self, tag: &str) -> Option<Capability<usize>> {
    if tag != FORM_SYNC_TAG {
      return None;
    }

    info!(tag, "Background sync triggered");
    Some(Capability::NotImplemented {
      feature: "form submission replay",
    })
  }

  /// Turn a push message into a notification to display.
  ///
  /// An empty push shows nothing. A payload that is not the expected JSON is an error.
  pub fn handle_push(&self, payload: Option<&[u8]>) -> Result<Capability<Option<Notification>>> {
    let Some(bytes) = payload else {
      return Ok(Capability::Implemented(None));
    };

    let payload: PushPayload =
      serde_json::from_slice(bytes).map_err(|e| eyre!("Failed to parse push payload: {}", e))?;
    let options = &self.settings.notifications;

    let notification = Notification {
      title: payload.title,
      body: payload.body,
      icon: options.icon.clone(),
      badge: options.badge.clone(),
      vibrate: options.vibrate.clone(),
      data: payload
        .data
        .unwrap_or_else(|| Value::Object(Default::default())),
    };

    info!(title = %notification.title, "Showing notification");
    Ok(Capability::Implemented(Some(notification)))
  }

  /// Close the clicked notification and open the dashboard.
  pub fn handle_notification_click(&self) -> Vec<ClientAction> {
    vec![
      ClientAction::CloseNotification,
      ClientAction::OpenWindow(self.settings.notifications.click_url.clone()),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::super::test_support::*;
  use super::*;
  use crate::cache::SqliteStorage;
  use crate::net::fake::FakeFetcher;
  use serde_json::json;
  use std::sync::Arc;

  fn agent() -> Agent<SqliteStorage, FakeFetcher> {
    let store = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let fetcher = Arc::new(FakeFetcher::new());
    super::super::test_support::agent(&store, &fetcher, settings("v1", &[]))
  }

  #[test]
  fn test_form_sync_is_not_implemented() {
    let agent = agent();
    assert_eq!(
      agent.handle_sync("sync-forms"),
      Some(Capability::NotImplemented {
        feature: "form submission replay"
      })
    );
  }

  #[test]
  fn test_unknown_sync_tag_is_ignored() {
    assert_eq!(agent().handle_sync("sync-photos"), None);
  }

  #[test]
  fn test_push_without_payload_shows_nothing() {
    assert_eq!(
      agent().handle_push(None).unwrap(),
      Capability::Implemented(None)
    );
  }

  #[test]
  fn test_push_builds_notification() {
    let payload = json!({
      "title": "Complaint updated",
      "body": "Ticket 42 was resolved",
      "data": { "ticket": 42 }
    })
    .to_string();

    let outcome = agent().handle_push(Some(payload.as_bytes())).unwrap();

    let Capability::Implemented(Some(notification)) = outcome else {
      panic!("expected a notification");
    };
    assert_eq!(notification.title, "Complaint updated");
    assert_eq!(notification.body.as_deref(), Some("Ticket 42 was resolved"));
    assert_eq!(notification.icon, "/icons/icon-192x192.png");
    assert_eq!(notification.badge, "/icons/icon-72x72.png");
    assert_eq!(notification.vibrate, vec![100, 50, 100]);
    assert_eq!(notification.data, json!({ "ticket": 42 }));
  }

  #[test]
  fn test_push_data_defaults_to_empty_object() {
    let outcome = agent()
      .handle_push(Some(&br#"{"title":"Hello","data":null}"#[..]))
      .unwrap();

    let Capability::Implemented(Some(notification)) = outcome else {
      panic!("expected a notification");
    };
    assert_eq!(notification.body, None);
    assert_eq!(notification.data, json!({}));
  }

  #[test]
  fn test_push_rejects_malformed_payload() {
    assert!(agent().handle_push(Some(&b"not json"[..])).is_err());
    assert!(agent().handle_push(Some(&br#"{"body":"no title"}"#[..])).is_err());
  }

  #[test]
  fn test_click_opens_dashboard() {
    assert_eq!(
      agent().handle_notification_click(),
      vec![
        ClientAction::CloseNotification,
        ClientAction::OpenWindow("/dashboard.html".to_string())
      ]
    );
  }
}
