#[cfg(test)]
mod scripted;
mod models;
mod schema;
mod sqlite_survey_store;

pub use models::*;
pub use schema::SURVEY_VERSIONED_SCHEMAS;
pub use sqlite_survey_store::{NewSourceRecording, SqliteSurveyStore};

#[cfg(test)]
pub(crate) use scripted::ScriptedStore;

use anyhow::Result;

/// Read-only view of the audio catalog.
pub trait CatalogReader: Send + Sync {
    /// Approved recordings that have a storage object and a known duration.
    fn get_eligible_recordings(&self) -> Result<Vec<SourceRecording>>;

    /// Codec + bitrate combinations the operator has enabled for sampling.
    fn get_enabled_variant_options(&self) -> Result<Vec<VariantKey>>;

    /// Every variant option, enabled or not.
    fn get_variant_options(&self) -> Result<Vec<VariantOption>>;

    /// All encoded variants of a recording, regardless of enable flags.
    fn get_recording_variants(&self, source_id: &str) -> Result<Vec<EncodedVariant>>;

    /// Returns Ok(None) if the variant does not exist.
    fn get_variant(&self, variant_id: &str) -> Result<Option<EncodedVariant>>;

    /// Looks up a specific rendition of a recording.
    /// Returns Ok(None) if that rendition was never produced.
    fn find_variant(&self, source_id: &str, key: &VariantKey) -> Result<Option<EncodedVariant>>;

    /// Display metadata of the recording that owns the given variant.
    fn get_variant_label(&self, variant_id: &str) -> Result<Option<RecordingLabel>>;
}

/// String-keyed storage for operator-tunable survey settings.
pub trait ConfigStore: Send + Sync {
    /// Returns Ok(None) if the key was never written.
    fn get_config_value(&self, key: &str) -> Result<Option<String>>;

    /// Inserts or replaces the value for the key.
    fn set_config_value(&self, key: &str, value: &str) -> Result<()>;
}

pub trait StreamTokenStore: Send + Sync {
    /// Returns Ok(false) if nothing was inserted (e.g. the token already exists).
    fn insert_stream_token(&self, row: &StreamTokenRow) -> Result<bool>;

    /// Returns the raw row, expired or not. Expiry is the caller's concern.
    fn get_stream_token(&self, token: &str) -> Result<Option<StreamTokenRow>>;

    /// Returns Ok(false) if the token did not exist.
    fn delete_stream_token(&self, token: &str) -> Result<bool>;

    /// Deletes every token whose expiry is at or before `now_ms`.
    /// Returns the number of rows deleted.
    fn delete_expired_stream_tokens(&self, now_ms: i64) -> Result<usize>;
}

pub trait AnswerStore: Send + Sync {
    /// Persists a trial outcome and returns its id.
    fn record_answer(&self, answer: &NewAnswer) -> Result<String>;

    /// Returns Ok(None) if the answer does not exist.
    fn get_answer(&self, answer_id: &str) -> Result<Option<AnswerRecord>>;

    /// Most recent answers first.
    fn get_device_answers(&self, device_id: &str, limit: usize) -> Result<Vec<AnswerRecord>>;
}

pub trait DeviceStore: Send + Sync {
    /// Persists a listening device and returns it with its new id.
    fn register_device(&self, device: &NewListeningDevice) -> Result<ListeningDevice>;

    /// Returns Ok(None) if the device was never registered.
    fn get_device(&self, device_id: &str) -> Result<Option<ListeningDevice>>;
}

/// Everything the survey server needs from its backing store.
pub trait SurveyStore:
    CatalogReader + ConfigStore + StreamTokenStore + AnswerStore + DeviceStore
{
}

impl<T> SurveyStore for T where
    T: CatalogReader + ConfigStore + StreamTokenStore + AnswerStore + DeviceStore
{
}
