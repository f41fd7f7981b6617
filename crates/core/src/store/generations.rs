//! Cache generation bookkeeping.
//!
//! Every cached response belongs to a generation; deleting a generation
//! cascades to its responses.

use super::connection::Store;
use crate::Error;
use tokio_rusqlite::params;

impl Store {
    /// Create the generation if it does not exist yet.
    ///
    /// Returns true when a new generation was created.
    pub async fn open_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = super::timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every open generation, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_generations ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every response stored in it.
    ///
    /// Returns the number of responses removed.
    pub async fn delete_generation(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let responses = tx.execute("DELETE FROM responses WHERE generation = ?1", params![name])?;
                tx.execute("DELETE FROM cache_generations WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(responses as u64)
            })
            .await
            .map_err(Error::from)
    }
}
