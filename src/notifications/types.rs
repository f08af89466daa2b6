//! Notification records pushed to connected clients
//!
//! Field names match the client's notification shape, so a pushed record can
//! be rendered without another fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::SubscriberId;

/// What the actor did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Clap,
    Comment,
    Follow,
    Bookmark,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Clap => "clap",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Bookmark => "bookmark",
        }
    }

    /// Follows are about the user, everything else is about a post
    pub fn targets_post(&self) -> bool {
        !matches!(self, NotificationKind::Follow)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,

    /// Recipient
    pub user_id: SubscriberId,

    #[serde(rename = "type")]
    pub kind: NotificationKind,

    pub actor_id: SubscriberId,
    pub actor_name: String,
    #[serde(default)]
    pub actor_avatar_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>,

    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    /// True when the actor would be notified about their own action
    pub fn is_self_notification(&self) -> bool {
        self.user_id == self.actor_id
    }
}
