//! Typed notification publishing
//!
//! Content write paths (claps, comments, follows, bookmarks) call
//! [`Notifier::notify`] after their own write succeeds. Delivery is
//! fire-and-forget: nothing here can fail the caller's request.

mod types;

pub use types::{Notification, NotificationKind};

use crate::logger::{self, LogTag};
use crate::webserver::ws::{HubHandle, HubMessage};

/// Message type clients listen for
pub const NOTIFICATION_MESSAGE_TYPE: &str = "notification";

#[derive(Clone)]
pub struct Notifier {
    hub: HubHandle,
}

impl Notifier {
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }

    /// Push a notification to every connection of its recipient
    ///
    /// Returns false when nothing was published (self-notification or
    /// serialization failure).
    pub fn notify(&self, notification: &Notification) -> bool {
        if notification.is_self_notification() {
            logger::debug(
                LogTag::Notify,
                &format!(
                    "Skipping {} notification: actor {} is the recipient",
                    notification.kind, notification.actor_id
                ),
            );
            return false;
        }

        let message = match HubMessage::typed(
            Some(notification.user_id.clone()),
            NOTIFICATION_MESSAGE_TYPE,
            notification,
        ) {
            Ok(message) => message,
            Err(e) => {
                logger::error(
                    LogTag::Notify,
                    &format!("Failed to serialize notification {}: {}", notification.id, e),
                );
                return false;
            }
        };

        self.hub.publish(message);
        logger::debug(
            LogTag::Notify,
            &format!(
                "Queued {} notification {} for user {}",
                notification.kind, notification.id, notification.user_id
            ),
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SubscriberId;
    use crate::webserver::ws::Hub;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use tokio::sync::mpsc::error::TryRecvError;

    fn clap(recipient: &str, actor: &str) -> Notification {
        Notification {
            id: "n-1".to_string(),
            user_id: SubscriberId::from(recipient),
            kind: NotificationKind::Clap,
            actor_id: SubscriberId::from(actor),
            actor_name: "Ada".to_string(),
            actor_avatar_url: "https://cdn.example/ada.png".to_string(),
            post_id: Some("p-9".to_string()),
            post_title: Some("Borrowing without tears".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            read: false,
        }
    }

    #[tokio::test]
    async fn test_notify_pushes_client_shape() {
        let hub = Hub::start(8);
        let (_, mut queue) = hub.open_connection(Some(SubscriberId::from("author")));
        let notifier = Notifier::new(hub.clone());

        assert!(notifier.notify(&clap("author", "reader")));

        let frame = queue.recv().await.unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "notification",
                "data": {
                    "id": "n-1",
                    "user_id": "author",
                    "type": "clap",
                    "actor_id": "reader",
                    "actor_name": "Ada",
                    "actor_avatar_url": "https://cdn.example/ada.png",
                    "post_id": "p-9",
                    "post_title": "Borrowing without tears",
                    "created_at": "2024-05-01T12:00:00Z",
                    "read": false
                }
            })
        );
    }

    #[tokio::test]
    async fn test_self_notification_skipped() {
        let hub = Hub::start(8);
        let (_, mut queue) = hub.open_connection(Some(SubscriberId::from("author")));
        let notifier = Notifier::new(hub.clone());

        assert!(!notifier.notify(&clap("author", "author")));
        hub.connection_count().await;
        assert!(matches!(queue.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_follow_omits_post_fields() {
        let mut follow = clap("author", "reader");
        follow.kind = NotificationKind::Follow;
        follow.post_id = None;
        follow.post_title = None;
        assert!(!follow.kind.targets_post());

        let value = serde_json::to_value(&follow).unwrap();
        assert_eq!(value["type"], "follow");
        assert!(value.get("post_id").is_none());
        assert!(value.get("post_title").is_none());

        let parsed: Notification = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, follow);
    }
}
