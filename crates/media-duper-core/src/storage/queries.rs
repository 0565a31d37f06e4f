use super::models::MediaRecord;
use super::sqlite::Database;
use crate::media::{Fingerprint, MediaKind};
use rusqlite::types::Type;
use rusqlite::{params, Result, Row};
use tracing::debug;

const RECORD_COLUMNS: &str =
    "id, path, full_identity, partial_identity, media_kind, fingerprint, processed_at";

fn record_from_row(row: &Row<'_>) -> Result<MediaRecord> {
    let kind: String = row.get(4)?;
    let media_kind = kind.parse::<MediaKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into())
    })?;
    let fingerprint_json: String = row.get(5)?;
    let fingerprint = Fingerprint::from_json(&fingerprint_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
    })?;

    Ok(MediaRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        full_identity: row.get(2)?,
        partial_identity: row.get(3)?,
        media_kind,
        fingerprint,
        processed_at: row.get(6)?,
    })
}

impl Database {
    // ── Lookups ──────────────────────────────────────────────────

    pub fn find_record_by_path(&self, path: &str) -> Result<Option<MediaRecord>> {
        let sql = format!("SELECT {} FROM media_record WHERE path = ?1", RECORD_COLUMNS);
        match self
            .connection()
            .query_row(&sql, params![path], record_from_row)
        {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Most recently written record with this partial identity.
    pub fn find_record_by_partial(&self, partial_identity: &str) -> Result<Option<MediaRecord>> {
        let sql = format!(
            "SELECT {} FROM media_record WHERE partial_identity = ?1 \
             ORDER BY id DESC LIMIT 1",
            RECORD_COLUMNS
        );
        match self
            .connection()
            .query_row(&sql, params![partial_identity], record_from_row)
        {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn find_record_by_full(&self, full_identity: &str) -> Result<Option<MediaRecord>> {
        let sql = format!(
            "SELECT {} FROM media_record WHERE full_identity = ?1 \
             ORDER BY id DESC LIMIT 1",
            RECORD_COLUMNS
        );
        match self
            .connection()
            .query_row(&sql, params![full_identity], record_from_row)
        {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn count_records(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM media_record", [], |row| row.get(0))
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Insert, or replace whatever record already holds `record.path`.
    pub fn upsert_record(&self, record: &MediaRecord, fingerprint_json: &str) -> Result<usize> {
        let count = self.connection().execute(
            "INSERT INTO media_record \
             (path, full_identity, partial_identity, media_kind, fingerprint, processed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(path) DO UPDATE SET \
                 full_identity = excluded.full_identity, \
                 partial_identity = excluded.partial_identity, \
                 media_kind = excluded.media_kind, \
                 fingerprint = excluded.fingerprint, \
                 processed_at = excluded.processed_at",
            params![
                record.path,
                record.full_identity,
                record.partial_identity,
                record.media_kind.as_str(),
                fingerprint_json,
                record.processed_at,
            ],
        )?;
        debug!("Upserted record for {}", record.path);
        Ok(count)
    }

    pub fn delete_record(&self, path: &str) -> Result<usize> {
        let count = self
            .connection()
            .execute("DELETE FROM media_record WHERE path = ?1", params![path])?;
        debug!("Deleted {} record(s) for {}", count, path);
        Ok(count)
    }

    pub fn update_record_path(&self, old_path: &str, new_path: &str) -> Result<usize> {
        self.connection().execute(
            "UPDATE media_record SET path = ?1 WHERE path = ?2",
            params![new_path, old_path],
        )
    }

    pub fn set_partial_identity(&self, path: &str, partial_identity: &str) -> Result<usize> {
        self.connection().execute(
            "UPDATE media_record SET partial_identity = ?1 WHERE path = ?2",
            params![partial_identity, path],
        )
    }
}
