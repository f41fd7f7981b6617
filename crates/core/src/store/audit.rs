//! Free-form audit log keyed by generated id.

use serde::Serialize;

use super::connection::Store;
use crate::Error;
use tokio_rusqlite::params;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: String,
}

impl Store {
    /// Append an entry and return its id.
    pub async fn append_audit(&self, kind: &str, payload: &serde_json::Value) -> Result<String, Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let entry_id = id.clone();
        let kind = kind.to_string();
        let payload = payload.to_string();
        let now = super::timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO audit_log (id, kind, payload_json, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![entry_id, kind, payload, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;
        Ok(id)
    }

    /// The most recent `limit` entries, newest first.
    pub async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, Error> {
        let limit = limit as i64;
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, String, String, String)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, kind, payload_json, created_at FROM audit_log
                    ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(id, kind, payload, created_at)| -> Result<AuditEntry, Error> {
                Ok(AuditEntry { id, kind, payload: serde_json::from_str(&payload)?, created_at })
            })
            .collect()
    }
}
