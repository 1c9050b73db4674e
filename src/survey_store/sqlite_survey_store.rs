use super::models::{
    AnswerRecord, EncodedVariant, ListeningDevice, NewAnswer, NewListeningDevice, PairingType,
    RecordingLabel, RoundMode, SelectedSide, SourceRecording, StreamTokenRow, TransitionMode,
    VariantKey, VariantOption,
};
use super::schema::SURVEY_VERSIONED_SCHEMAS;
use super::{AnswerStore, CatalogReader, ConfigStore, DeviceStore, StreamTokenStore};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Fields needed to register a source recording. Used by catalog tooling and tests;
/// round generation never writes the catalog.
#[derive(Debug, Clone, Default)]
pub struct NewSourceRecording {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub featured_artists: Option<String>,
    pub remix_artists: Option<String>,
    pub stream_url: Option<String>,
    pub duration_ms: Option<i64>,
    pub storage_key: Option<String>,
}

#[derive(Clone)]
pub struct SqliteSurveyStore {
    conn: Arc<Mutex<Connection>>,
}

const SOURCE_COLUMNS: &str = "id, title, artist, featured_artists, remix_artists, stream_url, \
     duration_ms, storage_key, approved_at";

const VARIANT_COLUMNS: &str = "id, source_file_id, codec, bitrate, storage_key";

const DEVICE_COLUMNS: &str =
    "id, device_type, connection_type, brand, model, price_tier, created_at";

const ANSWER_COLUMNS: &str = "id, device_id, session_id, candidate_a_id, candidate_b_id, \
     selected, pairing_type, transition_mode, round_mode, start_time_ms, segment_duration_ms, \
     response_time_ms, created_at";

impl SqliteSurveyStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open survey database")?;
        if is_new_db {
            info!("Creating new survey database at {:?}", path);
        }
        Self::from_connection(conn, is_new_db)
    }

    /// In-memory store with the latest schema, for tests and tooling.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn, true)
    }

    fn from_connection(mut conn: Connection, is_new_db: bool) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        let latest = SURVEY_VERSIONED_SCHEMAS
            .last()
            .context("No survey schema versions defined")?;

        if is_new_db {
            latest.create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            if db_version < 1 {
                bail!(
                    "Survey database version {} is invalid (expected >= 1)",
                    db_version
                );
            }

            let schema = SURVEY_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version as i64 == db_version)
                .with_context(|| format!("Unknown survey database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Survey database schema validation failed for version {}",
                    db_version
                )
            })?;

            if (db_version as usize) < latest.version {
                info!(
                    "Migrating survey database from version {} to {}",
                    db_version, latest.version
                );
                Self::migrate(&mut conn, db_version as usize)?;
            }
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &mut Connection, from_version: usize) -> Result<()> {
        let tx = conn.transaction()?;
        let mut current = from_version;
        for schema in SURVEY_VERSIONED_SCHEMAS
            .iter()
            .filter(|s| s.version > from_version)
        {
            info!(
                "Running survey database migration from version {} to {}",
                current, schema.version
            );
            if let Some(migration_fn) = schema.migration {
                migration_fn(&tx).with_context(|| {
                    format!("Failed to run migration to version {}", schema.version)
                })?;
            }
            current = schema.version;
        }
        tx.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + current),
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn row_to_source(row: &rusqlite::Row) -> rusqlite::Result<SourceRecording> {
        Ok(SourceRecording {
            id: row.get("id")?,
            title: row.get("title")?,
            artist: row.get("artist")?,
            featured_artists: row.get("featured_artists")?,
            remix_artists: row.get("remix_artists")?,
            stream_url: row.get("stream_url")?,
            duration_ms: row.get("duration_ms")?,
            storage_key: row.get("storage_key")?,
            approved_at: row.get("approved_at")?,
        })
    }

    fn row_to_variant(row: &rusqlite::Row) -> rusqlite::Result<EncodedVariant> {
        Ok(EncodedVariant {
            id: row.get("id")?,
            source_id: row.get("source_file_id")?,
            codec: row.get("codec")?,
            bitrate: row.get("bitrate")?,
            storage_key: row.get("storage_key")?,
        })
    }

    fn row_to_answer(row: &rusqlite::Row) -> rusqlite::Result<AnswerRecord> {
        let round_mode: Option<String> = row.get("round_mode")?;
        let round_mode = match round_mode {
            Some(mode) => Some(Self::parse_column(row, "round_mode", &mode, RoundMode::parse)?),
            None => None,
        };

        Ok(AnswerRecord {
            id: row.get("id")?,
            device_id: row.get("device_id")?,
            session_id: row.get("session_id")?,
            candidate_a_id: row.get("candidate_a_id")?,
            candidate_b_id: row.get("candidate_b_id")?,
            selected: Self::parse_text_column(row, "selected", SelectedSide::parse)?,
            pairing_type: Self::parse_text_column(row, "pairing_type", PairingType::parse)?,
            transition_mode: Self::parse_text_column(row, "transition_mode", TransitionMode::parse)?,
            round_mode,
            start_time_ms: row.get("start_time_ms")?,
            segment_duration_ms: row.get("segment_duration_ms")?,
            response_time_ms: row.get("response_time_ms")?,
            created_at: row.get("created_at")?,
        })
    }

    fn parse_text_column<T>(
        row: &rusqlite::Row,
        column: &str,
        parse: fn(&str) -> Option<T>,
    ) -> rusqlite::Result<T> {
        let value: String = row.get(column)?;
        Self::parse_column(row, column, &value, parse)
    }

    /// Maps a stored string onto its enum, failing the row on unknown values.
    fn parse_column<T>(
        row: &rusqlite::Row,
        column: &str,
        value: &str,
        parse: fn(&str) -> Option<T>,
    ) -> rusqlite::Result<T> {
        parse(value).ok_or_else(|| {
            let index = row.as_ref().column_index(column).unwrap_or(0);
            rusqlite::Error::FromSqlConversionFailure(
                index,
                Type::Text,
                format!("Unknown {} value '{}'", column, value).into(),
            )
        })
    }

    fn row_to_device(row: &rusqlite::Row) -> rusqlite::Result<ListeningDevice> {
        Ok(ListeningDevice {
            id: row.get("id")?,
            device_type: row.get("device_type")?,
            connection_type: row.get("connection_type")?,
            brand: row.get("brand")?,
            model: row.get("model")?,
            price_tier: row.get("price_tier")?,
            created_at: row.get("created_at")?,
        })
    }

    // =========================================================================
    // Catalog maintenance (upload pipeline / admin tooling)
    // =========================================================================

    pub fn insert_source(&self, source: &NewSourceRecording) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO source_files (id, title, artist, featured_artists, remix_artists,
                stream_url, duration_ms, storage_key, approved_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)",
            params![
                source.id,
                source.title,
                source.artist,
                source.featured_artists,
                source.remix_artists,
                source.stream_url,
                source.duration_ms,
                source.storage_key,
                Self::now_ms(),
            ],
        )
        .with_context(|| format!("Failed to insert source {}", source.id))?;
        Ok(())
    }

    /// Returns false if the source does not exist.
    pub fn approve_source(&self, source_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE source_files SET approved_at = ?1 WHERE id = ?2",
            params![Self::now_ms(), source_id],
        )?;
        Ok(updated > 0)
    }

    /// Returns false if the source does not exist.
    pub fn reject_source(&self, source_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE source_files SET approved_at = NULL WHERE id = ?1",
            params![source_id],
        )?;
        Ok(updated > 0)
    }

    pub fn get_source(&self, source_id: &str) -> Result<Option<SourceRecording>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM source_files WHERE id = ?1", SOURCE_COLUMNS),
                params![source_id],
                Self::row_to_source,
            )
            .optional()?)
    }

    pub fn insert_variant(&self, variant: &EncodedVariant) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO candidate_files (id, source_file_id, codec, bitrate, storage_key)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                variant.id,
                variant.source_id,
                variant.codec,
                variant.bitrate,
                variant.storage_key,
            ],
        )
        .with_context(|| format!("Failed to insert variant {}", variant.id))?;
        Ok(())
    }

    pub fn set_variant_option(&self, key: &VariantKey, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO quality_options (codec, bitrate, enabled) VALUES (?1, ?2, ?3)
             ON CONFLICT(codec, bitrate) DO UPDATE SET enabled = excluded.enabled",
            params![key.codec, key.bitrate, enabled],
        )?;
        Ok(())
    }

    pub fn count_stream_tokens(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM ephemeral_stream_tokens", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

impl CatalogReader for SqliteSurveyStore {
    fn get_eligible_recordings(&self) -> Result<Vec<SourceRecording>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM source_files
             WHERE approved_at IS NOT NULL
               AND storage_key IS NOT NULL
               AND duration_ms IS NOT NULL
             ORDER BY id",
            SOURCE_COLUMNS
        ))?;
        let recordings = stmt
            .query_map([], Self::row_to_source)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(recordings)
    }

    fn get_enabled_variant_options(&self) -> Result<Vec<VariantKey>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT codec, bitrate FROM quality_options WHERE enabled = 1 ORDER BY codec, bitrate",
        )?;
        let keys = stmt
            .query_map([], |row| Ok(VariantKey::new(row.get::<_, String>(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }

    fn get_variant_options(&self) -> Result<Vec<VariantOption>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT codec, bitrate, enabled FROM quality_options ORDER BY codec, bitrate")?;
        let options = stmt
            .query_map([], |row| {
                Ok(VariantOption {
                    codec: row.get(0)?,
                    bitrate: row.get(1)?,
                    enabled: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(options)
    }

    fn get_recording_variants(&self, source_id: &str) -> Result<Vec<EncodedVariant>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM candidate_files WHERE source_file_id = ?1 ORDER BY codec, bitrate",
            VARIANT_COLUMNS
        ))?;
        let variants = stmt
            .query_map(params![source_id], Self::row_to_variant)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(variants)
    }

    fn get_variant(&self, variant_id: &str) -> Result<Option<EncodedVariant>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM candidate_files WHERE id = ?1", VARIANT_COLUMNS),
                params![variant_id],
                Self::row_to_variant,
            )
            .optional()?)
    }

    fn find_variant(&self, source_id: &str, key: &VariantKey) -> Result<Option<EncodedVariant>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM candidate_files
                     WHERE source_file_id = ?1 AND codec = ?2 AND bitrate = ?3",
                    VARIANT_COLUMNS
                ),
                params![source_id, key.codec, key.bitrate],
                Self::row_to_variant,
            )
            .optional()?)
    }

    fn get_variant_label(&self, variant_id: &str) -> Result<Option<RecordingLabel>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT s.title, s.artist, s.featured_artists, s.remix_artists, s.stream_url
                 FROM source_files s
                 INNER JOIN candidate_files c ON c.source_file_id = s.id
                 WHERE c.id = ?1",
                params![variant_id],
                |row| {
                    Ok(RecordingLabel {
                        title: row.get(0)?,
                        artist: row.get(1)?,
                        featured_artists: row.get(2)?,
                        remix_artists: row.get(3)?,
                        stream_url: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }
}

impl ConfigStore for SqliteSurveyStore {
    fn get_config_value(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT value FROM survey_config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO survey_config (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Self::now_ms()],
        )?;
        debug!("Survey config {} updated", key);
        Ok(())
    }
}

impl StreamTokenStore for SqliteSurveyStore {
    fn insert_stream_token(&self, row: &StreamTokenRow) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO ephemeral_stream_tokens
                (token, candidate_file_id, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![row.token, row.variant_id, row.expires_at, Self::now_ms()],
        )?;
        Ok(inserted == 1)
    }

    fn get_stream_token(&self, token: &str) -> Result<Option<StreamTokenRow>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT token, candidate_file_id, expires_at
                 FROM ephemeral_stream_tokens WHERE token = ?1",
                params![token],
                |row| {
                    Ok(StreamTokenRow {
                        token: row.get(0)?,
                        variant_id: row.get(1)?,
                        expires_at: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn delete_stream_token(&self, token: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM ephemeral_stream_tokens WHERE token = ?1",
            params![token],
        )?;
        Ok(deleted > 0)
    }

    fn delete_expired_stream_tokens(&self, now_ms: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM ephemeral_stream_tokens WHERE expires_at <= ?1",
            params![now_ms],
        )?;
        Ok(deleted)
    }
}

impl AnswerStore for SqliteSurveyStore {
    fn record_answer(&self, answer: &NewAnswer) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO answers (id, device_id, session_id, candidate_a_id, candidate_b_id,
                selected, pairing_type, transition_mode, round_mode, start_time_ms,
                segment_duration_ms, response_time_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                answer.device_id,
                answer.session_id,
                answer.candidate_a_id,
                answer.candidate_b_id,
                answer.selected.as_str(),
                answer.pairing_type.as_str(),
                answer.transition_mode.as_str(),
                answer.round_mode.map(|m| m.as_str()),
                answer.start_time_ms,
                answer.segment_duration_ms,
                answer.response_time_ms,
                Self::now_ms(),
            ],
        )?;
        Ok(id)
    }

    fn get_answer(&self, answer_id: &str) -> Result<Option<AnswerRecord>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM answers WHERE id = ?1", ANSWER_COLUMNS),
                params![answer_id],
                Self::row_to_answer,
            )
            .optional()?)
    }

    fn get_device_answers(&self, device_id: &str, limit: usize) -> Result<Vec<AnswerRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM answers WHERE device_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            ANSWER_COLUMNS
        ))?;
        let answers = stmt
            .query_map(params![device_id, limit as i64], Self::row_to_answer)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(answers)
    }
}

impl DeviceStore for SqliteSurveyStore {
    fn register_device(&self, device: &NewListeningDevice) -> Result<ListeningDevice> {
        let registered = ListeningDevice {
            id: uuid::Uuid::new_v4().to_string(),
            device_type: device.device_type.clone(),
            connection_type: device.connection_type.clone(),
            brand: device.brand.clone(),
            model: device.model.clone(),
            price_tier: device.price_tier.clone(),
            created_at: Self::now_ms(),
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO listening_devices
                (id, device_type, connection_type, brand, model, price_tier, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                registered.id,
                registered.device_type,
                registered.connection_type,
                registered.brand,
                registered.model,
                registered.price_tier,
                registered.created_at,
            ],
        )
        .context("Failed to insert listening device")?;
        Ok(registered)
    }

    fn get_device(&self, device_id: &str) -> Result<Option<ListeningDevice>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM listening_devices WHERE id = ?1", DEVICE_COLUMNS),
                params![device_id],
                Self::row_to_device,
            )
            .optional()?)
    }
}
