//! Builds notifications and hands them to the platform.

use std::sync::Arc;

use serde::Deserialize;

use super::{
    ACTION_DISMISS, ACTION_VIEW, Notification, NotificationAction, NotificationData, NotificationKind,
    NotificationPlatform, episode_tag, scheduled_tag,
};
use crate::{Clock, EpisodeCandidate, Error, ScheduledNotification, WatchlistEntry};

/// Render the new-episode notification for `episode` of `show`.
pub fn episode_notification(
    show: &WatchlistEntry, episode: &EpisodeCandidate, default_icon: &str, timestamp: i64,
) -> Notification {
    Notification {
        tag: episode_tag(show.show_id, episode.season_number, episode.episode_number),
        title: format!("{} - New Episode!", show.title),
        body: format!("S{}E{}: {}", episode.season_number, episode.episode_number, episode.title),
        icon: show
            .poster_url
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(default_icon)
            .to_string(),
        actions: vec![
            NotificationAction { action: ACTION_VIEW.into(), title: "View Show".into() },
            NotificationAction { action: ACTION_DISMISS.into(), title: "Dismiss".into() },
        ],
        data: NotificationData { kind: NotificationKind::Episode, show_id: Some(show.show_id), url: None },
        timestamp,
    }
}

/// Payload of a push message. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub show_id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

pub struct Dispatcher {
    platform: Arc<dyn NotificationPlatform>,
    default_icon: String,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(platform: Arc<dyn NotificationPlatform>, default_icon: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self { platform, default_icon: default_icon.into(), clock }
    }

    /// Show the new-episode notification.
    ///
    /// A failure is logged and returned; the caller must not record the
    /// episode as sent.
    pub async fn dispatch(&self, show: &WatchlistEntry, episode: &EpisodeCandidate) -> Result<(), Error> {
        let notification = episode_notification(show, episode, &self.default_icon, self.now_millis());
        self.show(&notification).await?;
        tracing::info!(tag = %notification.tag, show_id = show.show_id, "episode notification shown");
        Ok(())
    }

    pub async fn dispatch_scheduled(&self, scheduled: &ScheduledNotification) -> Result<(), Error> {
        let notification = Notification {
            tag: scheduled_tag(&scheduled.id),
            title: scheduled.title.clone(),
            body: scheduled.body.clone(),
            icon: self.default_icon.clone(),
            actions: vec![
                NotificationAction { action: ACTION_VIEW.into(), title: "View".into() },
                NotificationAction { action: ACTION_DISMISS.into(), title: "Dismiss".into() },
            ],
            data: NotificationData { kind: NotificationKind::Scheduled, show_id: scheduled.show_id, url: None },
            timestamp: scheduled.fire_at.timestamp_millis(),
        };
        self.show(&notification).await
    }

    /// Show a notification for a push message.
    ///
    /// An empty or unparseable payload still shows a generic notification.
    pub async fn dispatch_push(&self, payload: Option<&str>) -> Result<Notification, Error> {
        let push = payload
            .filter(|p| !p.trim().is_empty())
            .and_then(|p| match serde_json::from_str::<PushPayload>(p) {
                Ok(push) => Some(push),
                Err(e) => {
                    tracing::warn!(error = %e, "push payload is not JSON, showing generic notification");
                    None
                }
            })
            .unwrap_or_default();

        let now = self.now_millis();
        let notification = Notification {
            tag: push.tag.unwrap_or_else(|| format!("push-{now}")),
            title: push.title.unwrap_or_else(|| "New update".into()),
            body: push.body.unwrap_or_else(|| "Open the app to see what's new.".into()),
            icon: self.default_icon.clone(),
            actions: vec![NotificationAction { action: ACTION_VIEW.into(), title: "Open".into() }],
            data: NotificationData { kind: NotificationKind::Push, show_id: push.show_id, url: push.url },
            timestamp: now,
        };
        self.show(&notification).await?;
        Ok(notification)
    }

    /// Close a shown notification by tag.
    pub async fn cancel(&self, tag: &str) -> Result<(), Error> {
        self.platform.close(tag).await
    }

    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        self.platform.show(notification).await.map_err(|e| {
            tracing::warn!(tag = %notification.tag, error = %e, "notification dispatch failed");
            match e {
                Error::DispatchFailed(_) => e,
                other => Error::DispatchFailed(other.to_string()),
            }
        })
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ManualClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Records shown notifications; fails every call while `fail` is set.
    #[derive(Default)]
    pub(crate) struct RecordingPlatform {
        pub shown: Mutex<Vec<Notification>>,
        pub closed: Mutex<Vec<String>>,
        pub fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingPlatform {
        pub fn shown(&self) -> Vec<Notification> {
            self.shown.lock().unwrap().clone()
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl NotificationPlatform for RecordingPlatform {
        async fn show(&self, notification: &Notification) -> Result<(), Error> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(Error::DispatchFailed("permission denied".into()));
            }
            self.shown.lock().unwrap().push(notification.clone());
            Ok(())
        }

        async fn close(&self, tag: &str) -> Result<(), Error> {
            self.closed.lock().unwrap().push(tag.to_string());
            Ok(())
        }
    }

    fn alpha() -> WatchlistEntry {
        WatchlistEntry { show_id: 42, title: "Alpha".into(), poster_url: Some("https://image.tmdb.org/p.jpg".into()) }
    }

    fn episode() -> EpisodeCandidate {
        EpisodeCandidate {
            show_id: 42,
            season_number: 2,
            episode_number: 5,
            air_date: Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap(),
            title: "The Return".into(),
        }
    }

    fn dispatcher(platform: Arc<RecordingPlatform>) -> Dispatcher {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()));
        Dispatcher::new(platform, "/icons/default.png", clock)
    }

    #[test]
    fn test_episode_notification_shape() {
        let n = episode_notification(&alpha(), &episode(), "/icons/default.png", 0);
        assert_eq!(n.title, "Alpha - New Episode!");
        assert_eq!(n.body, "S2E5: The Return");
        assert_eq!(n.tag, "episode-42-2-5");
        assert_eq!(n.icon, "https://image.tmdb.org/p.jpg");
        let actions: Vec<&str> = n.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["view", "dismiss"]);
        assert_eq!(n.data.show_id, Some(42));
    }

    #[test]
    fn test_episode_notification_icon_fallback() {
        let show = WatchlistEntry { poster_url: None, ..alpha() };
        let n = episode_notification(&show, &episode(), "/icons/default.png", 0);
        assert_eq!(n.icon, "/icons/default.png");

        let show = WatchlistEntry { poster_url: Some(String::new()), ..alpha() };
        let n = episode_notification(&show, &episode(), "/icons/default.png", 0);
        assert_eq!(n.icon, "/icons/default.png");
    }

    #[tokio::test]
    async fn test_dispatch_shows_notification() {
        let platform = Arc::new(RecordingPlatform::default());
        let dispatcher = dispatcher(platform.clone());

        dispatcher.dispatch(&alpha(), &episode()).await.unwrap();

        let shown = platform.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].timestamp, Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap().timestamp_millis());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported() {
        let platform = Arc::new(RecordingPlatform::default());
        platform.set_failing(true);
        let dispatcher = dispatcher(platform.clone());

        let result = dispatcher.dispatch(&alpha(), &episode()).await;
        assert!(matches!(result, Err(Error::DispatchFailed(_))));
        assert!(platform.shown().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_push_parses_payload() {
        let platform = Arc::new(RecordingPlatform::default());
        let dispatcher = dispatcher(platform.clone());

        let n = dispatcher
            .dispatch_push(Some(r#"{"title":"Alpha returns","body":"Season 3 announced","showId":42}"#))
            .await
            .unwrap();
        assert_eq!(n.title, "Alpha returns");
        assert_eq!(n.data.kind, NotificationKind::Push);
        assert_eq!(n.data.show_id, Some(42));
    }

    #[tokio::test]
    async fn test_dispatch_push_garbage_payload_is_generic() {
        let platform = Arc::new(RecordingPlatform::default());
        let dispatcher = dispatcher(platform.clone());

        let n = dispatcher.dispatch_push(Some("not json")).await.unwrap();
        assert_eq!(n.title, "New update");
        assert_eq!(n.data.show_id, None);
        assert_eq!(platform.shown().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_scheduled_uses_tag() {
        let platform = Arc::new(RecordingPlatform::default());
        let dispatcher = dispatcher(platform.clone());
        let scheduled = ScheduledNotification {
            id: "n1".into(),
            title: "Reminder".into(),
            body: "Alpha tonight".into(),
            fire_at: Utc.with_ymd_and_hms(2026, 10, 15, 18, 0, 0).unwrap(),
            show_id: Some(42),
        };

        dispatcher.dispatch_scheduled(&scheduled).await.unwrap();

        let shown = platform.shown();
        assert_eq!(shown[0].tag, "scheduled-n1");
        assert_eq!(shown[0].data.kind, NotificationKind::Scheduled);
    }
}
