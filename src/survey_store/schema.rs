//! SQLite schema definitions for the survey database.
//!
//! Catalog tables are written by the upload/transcode pipeline and the admin
//! screens; this server reads them. It owns the config, token, answer and
//! listening device tables.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Catalog, config, tokens, answers
// =============================================================================

const SOURCE_FILES_TABLE_V1: Table = Table {
    name: "source_files",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!("artist", SqlType::Text),
        sqlite_column!("featured_artists", SqlType::Text),
        sqlite_column!("remix_artists", SqlType::Text),
        sqlite_column!("stream_url", SqlType::Text),
        sqlite_column!("duration_ms", SqlType::Integer),
        sqlite_column!("storage_key", SqlType::Text),
        sqlite_column!("approved_at", SqlType::Integer),
        sqlite_column!("created_at", SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_source_files_approved_at", "approved_at")],
    unique_constraints: &[],
};

const SOURCE_FILE_FK: ForeignKey = ForeignKey {
    foreign_table: "source_files",
    foreign_column: "id",
};

const CANDIDATE_FILES_TABLE_V1: Table = Table {
    name: "candidate_files",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "source_file_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&SOURCE_FILE_FK)
        ),
        sqlite_column!("codec", SqlType::Text, non_null = true),
        sqlite_column!("bitrate", SqlType::Integer, non_null = true),
        sqlite_column!("storage_key", SqlType::Text, non_null = true),
    ],
    indices: &[("idx_candidate_files_source", "source_file_id")],
    unique_constraints: &[&["source_file_id", "codec", "bitrate"]],
};

const QUALITY_OPTIONS_TABLE_V1: Table = Table {
    name: "quality_options",
    columns: &[
        sqlite_column!("codec", SqlType::Text, non_null = true),
        sqlite_column!("bitrate", SqlType::Integer, non_null = true),
        sqlite_column!(
            "enabled",
            SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
    ],
    indices: &[],
    unique_constraints: &[&["codec", "bitrate"]],
};

const SURVEY_CONFIG_TABLE_V1: Table = Table {
    name: "survey_config",
    columns: &[
        sqlite_column!("key", SqlType::Text, is_primary_key = true),
        sqlite_column!("value", SqlType::Text, non_null = true),
        sqlite_column!("updated_at", SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const CANDIDATE_FILE_FK: ForeignKey = ForeignKey {
    foreign_table: "candidate_files",
    foreign_column: "id",
};

const EPHEMERAL_STREAM_TOKENS_TABLE_V1: Table = Table {
    name: "ephemeral_stream_tokens",
    columns: &[
        sqlite_column!("token", SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "candidate_file_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&CANDIDATE_FILE_FK)
        ),
        sqlite_column!("expires_at", SqlType::Integer, non_null = true),
        sqlite_column!("created_at", SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_ephemeral_stream_tokens_expires", "expires_at")],
    unique_constraints: &[],
};

const ANSWERS_TABLE_V1: Table = Table {
    name: "answers",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true),
        sqlite_column!("device_id", SqlType::Text, non_null = true),
        sqlite_column!("session_id", SqlType::Text),
        sqlite_column!("candidate_a_id", SqlType::Text, non_null = true),
        sqlite_column!("candidate_b_id", SqlType::Text, non_null = true),
        sqlite_column!("selected", SqlType::Text, non_null = true),
        sqlite_column!("pairing_type", SqlType::Text, non_null = true),
        sqlite_column!("transition_mode", SqlType::Text, non_null = true),
        sqlite_column!("start_time_ms", SqlType::Integer, non_null = true),
        sqlite_column!("segment_duration_ms", SqlType::Integer, non_null = true),
        sqlite_column!("response_time_ms", SqlType::Integer),
        sqlite_column!("created_at", SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_answers_device", "device_id"),
        ("idx_answers_session", "session_id"),
    ],
    unique_constraints: &[],
};

// =============================================================================
// Version 2 - Round mode on answers
// =============================================================================

const ANSWERS_TABLE_V2: Table = Table {
    name: "answers",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true),
        sqlite_column!("device_id", SqlType::Text, non_null = true),
        sqlite_column!("session_id", SqlType::Text),
        sqlite_column!("candidate_a_id", SqlType::Text, non_null = true),
        sqlite_column!("candidate_b_id", SqlType::Text, non_null = true),
        sqlite_column!("selected", SqlType::Text, non_null = true),
        sqlite_column!("pairing_type", SqlType::Text, non_null = true),
        sqlite_column!("transition_mode", SqlType::Text, non_null = true),
        sqlite_column!("start_time_ms", SqlType::Integer, non_null = true),
        sqlite_column!("segment_duration_ms", SqlType::Integer, non_null = true),
        sqlite_column!("response_time_ms", SqlType::Integer),
        sqlite_column!("created_at", SqlType::Integer, non_null = true),
        sqlite_column!("round_mode", SqlType::Text),
    ],
    indices: &[
        ("idx_answers_device", "device_id"),
        ("idx_answers_session", "session_id"),
    ],
    unique_constraints: &[],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute("ALTER TABLE answers ADD COLUMN round_mode TEXT", [])?;
    Ok(())
}

// =============================================================================
// Version 3 - Listening devices
// =============================================================================

const LISTENING_DEVICES_TABLE_V3: Table = Table {
    name: "listening_devices",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true),
        sqlite_column!("device_type", SqlType::Text, non_null = true),
        sqlite_column!("connection_type", SqlType::Text, non_null = true),
        sqlite_column!("brand", SqlType::Text, non_null = true),
        sqlite_column!("model", SqlType::Text, non_null = true),
        sqlite_column!("price_tier", SqlType::Text, non_null = true),
        sqlite_column!("created_at", SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

fn migrate_v2_to_v3(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    LISTENING_DEVICES_TABLE_V3.create(conn)
}

pub const SURVEY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[
            SOURCE_FILES_TABLE_V1,
            CANDIDATE_FILES_TABLE_V1,
            QUALITY_OPTIONS_TABLE_V1,
            SURVEY_CONFIG_TABLE_V1,
            EPHEMERAL_STREAM_TOKENS_TABLE_V1,
            ANSWERS_TABLE_V1,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[
            SOURCE_FILES_TABLE_V1,
            CANDIDATE_FILES_TABLE_V1,
            QUALITY_OPTIONS_TABLE_V1,
            SURVEY_CONFIG_TABLE_V1,
            EPHEMERAL_STREAM_TOKENS_TABLE_V1,
            ANSWERS_TABLE_V2,
        ],
        migration: Some(migrate_v1_to_v2),
    },
    VersionedSchema {
        version: 3,
        tables: &[
            SOURCE_FILES_TABLE_V1,
            CANDIDATE_FILES_TABLE_V1,
            QUALITY_OPTIONS_TABLE_V1,
            SURVEY_CONFIG_TABLE_V1,
            EPHEMERAL_STREAM_TOKENS_TABLE_V1,
            ANSWERS_TABLE_V2,
            LISTENING_DEVICES_TABLE_V3,
        ],
        migration: Some(migrate_v2_to_v3),
    },
];
