//! Cached response CRUD operations.

use super::connection::Store;
use crate::{CachedResponse, Error, ResourceClass};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl Store {
    /// Insert or overwrite the cached response for its request key.
    ///
    /// The generation must already be open.
    pub async fn put_response(&self, response: &CachedResponse) -> Result<(), Error> {
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO responses (
                    request_key, generation, url, method, resource_class,
                    status_code, content_type, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(request_key) DO UPDATE SET
                    generation = excluded.generation,
                    url = excluded.url,
                    method = excluded.method,
                    resource_class = excluded.resource_class,
                    status_code = excluded.status_code,
                    content_type = excluded.content_type,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &response.request_key,
                        &response.generation,
                        &response.url,
                        &response.method,
                        response.resource_class.as_str(),
                        response.status,
                        &response.content_type,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a cached response by request key.
    ///
    /// Returns None if nothing is cached for the key.
    pub async fn get_response(&self, request_key: &str) -> Result<Option<CachedResponse>, Error> {
        let request_key = request_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT request_key, generation, url, method, resource_class,
                        status_code, content_type, body, stored_at
                    FROM responses WHERE request_key = ?1",
                )?;

                let result = stmt.query_row(params![request_key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, u16>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Vec<u8>>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                });

                match result {
                    Ok((request_key, generation, url, method, class, status, content_type, body, stored_at)) => {
                        Ok(Some(CachedResponse {
                            request_key,
                            generation,
                            url,
                            method,
                            resource_class: class.parse::<ResourceClass>()?,
                            status,
                            content_type,
                            body,
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every cached response.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear_responses(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM responses", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of cached responses.
    pub async fn count_responses(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
