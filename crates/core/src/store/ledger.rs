//! Sent-notification ledger.
//!
//! A row's existence permanently suppresses re-notification for its episode.
//! `claim_notification` is an atomic insert-if-absent, which makes it the only
//! gate concurrent reconciliation passes need.

use super::connection::Store;
use crate::{Error, SentNotificationRecord};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl Store {
    pub async fn has_sent(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM notifications WHERE key = ?1)",
                    params![key],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert the ledger row unless one exists.
    ///
    /// Returns true when this call created the row.
    pub async fn claim_notification(&self, key: &str, sent_at: &str) -> Result<bool, Error> {
        let key = key.to_string();
        let sent_at = sent_at.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO notifications (key, sent_at) VALUES (?1, ?2)",
                    params![key, sent_at],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop a claim whose dispatch failed, so a later pass retries it.
    pub async fn release_notification(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM notifications WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn get_sent(&self, key: &str) -> Result<Option<SentNotificationRecord>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<SentNotificationRecord>, Error> {
                let result = conn.query_row(
                    "SELECT key, sent_at FROM notifications WHERE key = ?1",
                    params![key],
                    |row| Ok(SentNotificationRecord { key: row.get(0)?, sent_at: row.get(1)? }),
                );
                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_sent(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_is_insert_if_absent() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(!store.has_sent("42-2-5").await.unwrap());

        assert!(store.claim_notification("42-2-5", "2026-10-15T00:00:00.000Z").await.unwrap());
        assert!(!store.claim_notification("42-2-5", "2026-10-16T00:00:00.000Z").await.unwrap());

        let record = store.get_sent("42-2-5").await.unwrap().unwrap();
        assert_eq!(record.sent_at, "2026-10-15T00:00:00.000Z");
        assert_eq!(store.count_sent().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_release_allows_reclaim() {
        let store = Store::open_in_memory().await.unwrap();
        store.claim_notification("42-2-5", "t1").await.unwrap();
        store.release_notification("42-2-5").await.unwrap();

        assert!(!store.has_sent("42-2-5").await.unwrap());
        assert!(store.claim_notification("42-2-5", "t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_claims_single_winner() {
        let store = Store::open_in_memory().await.unwrap();
        let (a, b) = tokio::join!(
            store.claim_notification("7-1-1", "t"),
            store.claim_notification("7-1-1", "t"),
        );
        assert!(a.unwrap() ^ b.unwrap());
    }
}
