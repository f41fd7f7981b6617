//! SQLite-backed persistent store for the worker.
//!
//! This module provides durable keyed records using SQLite with async access
//! via tokio-rusqlite. It holds:
//!
//! - Cached HTTP responses, grouped into versioned cache generations
//! - The watchlist and notification settings mirrored from the host
//! - The sent-notification ledger and scheduled/shown notifications
//! - A free-form audit log
//! - Worker state that outlives the process (the activated cache version)
//!
//! The store is opened once (see the lifecycle controller in the client
//! crate) and passed by handle into every component.

pub mod audit;
pub mod connection;
pub mod generations;
pub mod hash;
pub mod ledger;
pub mod migrations;
pub mod responses;
pub mod scheduled;
pub mod settings;
pub mod shown;
pub mod state;
pub mod watchlist;

pub use crate::Error;

pub use audit::AuditEntry;
pub use connection::Store;

use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 UTC timestamp with millisecond precision, used for record bookkeeping.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_is_fixed_width() {
        let a = timestamp(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
        let b = timestamp(Utc.with_ymd_and_hms(2026, 11, 12, 13, 14, 15).unwrap());
        assert_eq!(a, "2026-01-02T03:04:05.000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
