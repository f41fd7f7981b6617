//! Core types and shared functionality for showbell.
//!
//! This crate provides:
//! - Persistent store with SQLite backend (cached responses, watchlist mirror,
//!   settings mirror, sent-notification ledger, audit log)
//! - Unified error types
//! - Configuration structures
//! - Episode reconciliation and notification dispatch

pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod reconcile;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::Error;
pub use model::{
    CachedResponse, EpisodeCandidate, FreeTierTiming, NotificationSettings, ResourceClass, ScheduledNotification,
    SentNotificationRecord, ShowOverride, Tier, WatchlistEntry,
};
pub use store::Store;
