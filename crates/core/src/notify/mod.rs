//! Notification rendering, dispatch and click routing.
//!
//! A [`Notification`] carries everything needed to handle a later click in
//! its own `tag` and `data`. The platform persists those with the
//! notification, and click handling reads nothing else.

pub mod click;
pub mod dispatcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

pub use click::{ClickHandler, ClickOutcome, NavigationDirective, route_click};
pub use dispatcher::{Dispatcher, PushPayload, episode_notification};

pub const ACTION_VIEW: &str = "view";
pub const ACTION_DISMISS: &str = "dismiss";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Episode,
    Scheduled,
    Push,
}

/// Payload persisted alongside a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub kind: NotificationKind,
    #[serde(default)]
    pub show_id: Option<i64>,
    /// Explicit navigation target, used when there is no show.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Notification {
    /// Replaces any shown notification with the same tag.
    pub tag: String,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// The platform's notification primitive.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;

    async fn close(&self, tag: &str) -> Result<(), Error>;
}

/// Host-side navigation, i.e. `openWindow(path)`.
#[async_trait]
pub trait HostNavigator: Send + Sync {
    async fn open_window(&self, path: &str) -> Result<(), Error>;
}

/// `episode-{showId}-{season}-{episode}`
pub fn episode_tag(show_id: i64, season: u32, episode: u32) -> String {
    format!("episode-{show_id}-{season}-{episode}")
}

/// `scheduled-{id}`
pub fn scheduled_tag(id: &str) -> String {
    format!("scheduled-{id}")
}
