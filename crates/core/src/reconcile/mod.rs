//! Episode reconciliation.
//!
//! A pass compares the watchlist against upcoming-episode metadata and
//! dispatches a notification for each episode entering its lead-time window.
//! The providers are traits so the store, the HTTP metadata client and test
//! fakes plug in the same way.

pub mod reconciler;
pub mod schedule;

use async_trait::async_trait;

use crate::{EpisodeCandidate, Error, NotificationSettings, Store, WatchlistEntry};

pub use reconciler::{PassReport, Reconciler, is_due};
pub use schedule::RecheckSchedule;

#[async_trait]
pub trait WatchlistProvider: Send + Sync {
    async fn watchlist(&self) -> Result<Vec<WatchlistEntry>, Error>;
}

#[async_trait]
pub trait ShowMetadataProvider: Send + Sync {
    async fn upcoming_episodes(&self, show_id: i64) -> Result<Vec<EpisodeCandidate>, Error>;
}

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// `None` when the host has never sent settings.
    async fn notification_settings(&self) -> Result<Option<NotificationSettings>, Error>;
}

#[async_trait]
impl WatchlistProvider for Store {
    async fn watchlist(&self) -> Result<Vec<WatchlistEntry>, Error> {
        self.list_watchlist().await
    }
}

#[async_trait]
impl SettingsProvider for Store {
    async fn notification_settings(&self) -> Result<Option<NotificationSettings>, Error> {
        self.get_settings().await
    }
}
