//! Worker state that must survive a process restart.

use super::connection::Store;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const ACTIVATED_VERSION_KEY: &str = "activated-version";

impl Store {
    /// Record that the worker for cache `version` has activated.
    pub async fn set_activated_version(&self, version: &str) -> Result<(), Error> {
        let version = version.to_string();
        let now = super::timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO worker_state (key, value, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![ACTIVATED_VERSION_KEY, version, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The cache version that last activated, if any.
    pub async fn activated_version(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT value FROM worker_state WHERE key = ?1",
                    params![ACTIVATED_VERSION_KEY],
                    |row| row.get(0),
                );
                match result {
                    Ok(version) => Ok(Some(version)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}
