//! Test fixture creation for the survey database

use super::constants::*;
use ab_survey_server::survey_store::{
    EncodedVariant, NewSourceRecording, SqliteSurveyStore, VariantKey,
};
use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;

fn insert_recording(
    store: &SqliteSurveyStore,
    id: &str,
    title: &str,
    artist: &str,
    duration_ms: i64,
) -> Result<()> {
    store.insert_source(&NewSourceRecording {
        id: id.to_string(),
        title: title.to_string(),
        artist: Some(artist.to_string()),
        duration_ms: Some(duration_ms),
        storage_key: Some(format!("sources/{}.wav", id)),
        ..Default::default()
    })?;

    let mut codecs: Vec<(&str, u32)> = ENABLED_VARIANTS.to_vec();
    codecs.push(DISABLED_VARIANT);
    for (codec, bitrate) in codecs {
        let variant_id = variant_id(id, codec, bitrate);
        store.insert_variant(&EncodedVariant {
            storage_key: format!("candidates/{}", variant_id),
            id: variant_id,
            source_id: id.to_string(),
            codec: codec.to_string(),
            bitrate,
        })?;
    }
    Ok(())
}

/// Creates a temporary survey database with two approved recordings and
/// one pending upload, each encoded in every test rendition.
/// Returns (temp_dir, db_dir_path)
pub fn create_test_survey_db() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("survey.db");
    let store = SqliteSurveyStore::new(&db_path)?;

    insert_recording(
        &store,
        RECORDING_1_ID,
        RECORDING_1_TITLE,
        RECORDING_1_ARTIST,
        RECORDING_1_DURATION_MS,
    )?;
    insert_recording(
        &store,
        RECORDING_2_ID,
        RECORDING_2_TITLE,
        RECORDING_2_ARTIST,
        RECORDING_2_DURATION_MS,
    )?;
    insert_recording(
        &store,
        PENDING_RECORDING_ID,
        PENDING_RECORDING_TITLE,
        RECORDING_1_ARTIST,
        RECORDING_1_DURATION_MS,
    )?;

    store.approve_source(RECORDING_1_ID)?;
    store.approve_source(RECORDING_2_ID)?;

    for (codec, bitrate) in ENABLED_VARIANTS {
        store.set_variant_option(&VariantKey::new(codec, bitrate), true)?;
    }
    store.set_variant_option(&VariantKey::new(DISABLED_VARIANT.0, DISABLED_VARIANT.1), false)?;

    let db_dir = dir.path().to_path_buf();
    Ok((dir, db_dir))
}
