//! Host-scheduled one-off notifications.

use chrono::{DateTime, Utc};

use super::connection::Store;
use crate::{Error, ScheduledNotification};
use tokio_rusqlite::params;

impl Store {
    /// Insert or replace a scheduled notification by id.
    pub async fn schedule_notification(&self, scheduled: &ScheduledNotification) -> Result<(), Error> {
        let scheduled = scheduled.clone();
        let fire_at_ms = scheduled.fire_at.timestamp_millis();
        let now = super::timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO scheduled_notifications (id, title, body, fire_at_ms, show_id, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        body = excluded.body,
                        fire_at_ms = excluded.fire_at_ms,
                        show_id = excluded.show_id",
                    params![scheduled.id, scheduled.title, scheduled.body, fire_at_ms, scheduled.show_id, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Returns true if a pending notification with `id` was removed.
    pub async fn cancel_scheduled(&self, id: &str) -> Result<bool, Error> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM scheduled_notifications WHERE id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove and return every notification due at or before `now`.
    ///
    /// Select and delete share one transaction, so a notification is handed
    /// out at most once. Rows are decoded before the commit; a row whose time
    /// is out of range is logged and dropped without affecting the others.
    pub async fn take_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledNotification>, Error> {
        let now_ms = now.timestamp_millis();
        self.conn
            .call(move |conn| -> Result<Vec<ScheduledNotification>, Error> {
                let tx = conn.transaction()?;
                let rows: Vec<(String, String, String, i64, Option<i64>)> = {
                    let mut stmt = tx.prepare(
                        "SELECT id, title, body, fire_at_ms, show_id FROM scheduled_notifications
                        WHERE fire_at_ms <= ?1 ORDER BY fire_at_ms, id",
                    )?;
                    stmt.query_map(params![now_ms], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?
                };

                let mut due = Vec::with_capacity(rows.len());
                for (id, title, body, fire_at_ms, show_id) in rows {
                    tx.execute("DELETE FROM scheduled_notifications WHERE id = ?1", params![id])?;
                    match DateTime::from_timestamp_millis(fire_at_ms) {
                        Some(fire_at) => due.push(ScheduledNotification { id, title, body, fire_at, show_id }),
                        None => tracing::warn!(id, fire_at_ms, "dropping scheduled notification with invalid time"),
                    }
                }
                tx.commit()?;
                Ok(due)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_scheduled(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM scheduled_notifications", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
