//! Notifications currently shown, persisted by tag.
//!
//! This is the platform's own record of a notification; click handling after a
//! restart reads the tag and data from here.

use super::connection::Store;
use crate::Error;
use crate::notify::Notification;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl Store {
    /// Persist a shown notification, replacing any with the same tag.
    pub async fn record_shown(&self, notification: &Notification) -> Result<(), Error> {
        let tag = notification.tag.clone();
        let json = serde_json::to_string(notification)?;
        let now = super::timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO shown_notifications (tag, notification_json, shown_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(tag) DO UPDATE SET
                        notification_json = excluded.notification_json,
                        shown_at = excluded.shown_at",
                    params![tag, json, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn get_shown(&self, tag: &str) -> Result<Option<Notification>, Error> {
        let tag = tag.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT notification_json FROM shown_notifications WHERE tag = ?1",
                    params![tag],
                    |row| row.get(0),
                );
                match result {
                    Ok(json) => Ok(Some(json)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }

    /// Returns true if a notification with `tag` was shown.
    pub async fn remove_shown(&self, tag: &str) -> Result<bool, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM shown_notifications WHERE tag = ?1", params![tag])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Every shown notification, newest first.
    pub async fn list_shown(&self) -> Result<Vec<Notification>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT notification_json FROM shown_notifications ORDER BY shown_at DESC, tag")?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }
}
