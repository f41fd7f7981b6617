//! Mirrored notification settings, stored as JSON under a fixed key.

use super::connection::Store;
use crate::{Error, NotificationSettings};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const SETTINGS_KEY: &str = "notification-settings";

impl Store {
    pub async fn put_settings(&self, settings: &NotificationSettings) -> Result<(), Error> {
        let value = serde_json::to_string(settings)?;
        let now = super::timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO settings (key, value_json, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value_json = excluded.value_json,
                        updated_at = excluded.updated_at",
                    params![SETTINGS_KEY, value, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Returns None if the host never sent settings.
    pub async fn get_settings(&self) -> Result<Option<NotificationSettings>, Error> {
        let raw = self
            .conn
            .call(|conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT value_json FROM settings WHERE key = ?1",
                    params![SETTINGS_KEY],
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FreeTierTiming, Tier};

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.get_settings().await.unwrap().is_none());

        let settings = NotificationSettings {
            global_enabled: true,
            tier: Tier::Free,
            free_tier_timing: Some(FreeTierTiming::SevenDaysBefore),
            ..Default::default()
        };
        store.put_settings(&settings).await.unwrap();

        assert_eq!(store.get_settings().await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn test_settings_overwrite() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .put_settings(&NotificationSettings { global_enabled: true, ..Default::default() })
            .await
            .unwrap();
        store.put_settings(&NotificationSettings::default()).await.unwrap();

        assert!(!store.get_settings().await.unwrap().unwrap().global_enabled);
    }
}
