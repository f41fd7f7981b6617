//! Mirrored watchlist snapshot.

use super::connection::Store;
use crate::{Error, WatchlistEntry};
use tokio_rusqlite::params;

impl Store {
    /// Replace the whole watchlist with `entries`, keeping their order.
    ///
    /// Duplicate show ids keep the last entry.
    pub async fn replace_watchlist(&self, entries: &[WatchlistEntry]) -> Result<(), Error> {
        let entries = entries.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM watchlist", [])?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO watchlist (show_id, title, poster_url, position) VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT(show_id) DO UPDATE SET
                            title = excluded.title,
                            poster_url = excluded.poster_url,
                            position = excluded.position",
                    )?;
                    for (position, entry) in entries.iter().enumerate() {
                        stmt.execute(params![entry.show_id, &entry.title, &entry.poster_url, position as i64])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The current watchlist in host order.
    pub async fn list_watchlist(&self) -> Result<Vec<WatchlistEntry>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<WatchlistEntry>, Error> {
                let mut stmt = conn.prepare("SELECT show_id, title, poster_url FROM watchlist ORDER BY position")?;
                let entries = stmt
                    .query_map([], |row| {
                        Ok(WatchlistEntry { show_id: row.get(0)?, title: row.get(1)?, poster_url: row.get(2)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
