//! A store wrapper whose token operations tests can script: run a second
//! request in the middle of a lookup, refuse inserts, or fail deletes.

use super::models::{
    AnswerRecord, EncodedVariant, ListeningDevice, NewAnswer, NewListeningDevice, RecordingLabel,
    SourceRecording, StreamTokenRow, VariantKey, VariantOption,
};
use super::{
    AnswerStore, CatalogReader, ConfigStore, DeviceStore, SqliteSurveyStore, StreamTokenStore,
};
use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

type LookupHook = Box<dyn FnOnce(&SqliteSurveyStore) + Send>;

pub struct ScriptedStore {
    pub inner: SqliteSurveyStore,
    hook: Mutex<Option<(String, LookupHook)>>,
    inserts_left: AtomicUsize,
    fail_deletes: AtomicBool,
}

impl ScriptedStore {
    pub fn new(inner: SqliteSurveyStore) -> Self {
        Self {
            inner,
            hook: Mutex::new(None),
            inserts_left: AtomicUsize::new(usize::MAX),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Runs `action` against the inner store the next time `token` is looked
    /// up, after the row was read and before the lookup returns.
    pub fn on_lookup(&self, token: &str, action: impl FnOnce(&SqliteSurveyStore) + Send + 'static) {
        *self.hook.lock().unwrap() = Some((token.to_string(), Box::new(action)));
    }

    /// Accepts `count` more token inserts, then reports every insert as refused.
    pub fn refuse_inserts_after(&self, count: usize) {
        self.inserts_left.store(count, Ordering::SeqCst);
    }

    /// Makes every token delete return an error.
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }
}

impl CatalogReader for ScriptedStore {
    fn get_eligible_recordings(&self) -> Result<Vec<SourceRecording>> {
        self.inner.get_eligible_recordings()
    }

    fn get_enabled_variant_options(&self) -> Result<Vec<VariantKey>> {
        self.inner.get_enabled_variant_options()
    }

    fn get_variant_options(&self) -> Result<Vec<VariantOption>> {
        self.inner.get_variant_options()
    }

    fn get_recording_variants(&self, source_id: &str) -> Result<Vec<EncodedVariant>> {
        self.inner.get_recording_variants(source_id)
    }

    fn get_variant(&self, variant_id: &str) -> Result<Option<EncodedVariant>> {
        self.inner.get_variant(variant_id)
    }

    fn find_variant(&self, source_id: &str, key: &VariantKey) -> Result<Option<EncodedVariant>> {
        self.inner.find_variant(source_id, key)
    }

    fn get_variant_label(&self, variant_id: &str) -> Result<Option<RecordingLabel>> {
        self.inner.get_variant_label(variant_id)
    }
}

impl ConfigStore for ScriptedStore {
    fn get_config_value(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_config_value(key)
    }

    fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set_config_value(key, value)
    }
}

impl StreamTokenStore for ScriptedStore {
    fn insert_stream_token(&self, row: &StreamTokenRow) -> Result<bool> {
        let allowed = self
            .inserts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Ok(false);
        }
        self.inner.insert_stream_token(row)
    }

    fn get_stream_token(&self, token: &str) -> Result<Option<StreamTokenRow>> {
        let row = self.inner.get_stream_token(token)?;
        let hook = {
            let mut guard = self.hook.lock().unwrap();
            match guard.take() {
                Some((target, action)) if target == token => Some(action),
                other => {
                    *guard = other;
                    None
                }
            }
        };
        if let Some(action) = hook {
            action(&self.inner);
        }
        Ok(row)
    }

    fn delete_stream_token(&self, token: &str) -> Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            bail!("Token delete failed");
        }
        self.inner.delete_stream_token(token)
    }

    fn delete_expired_stream_tokens(&self, now_ms: i64) -> Result<usize> {
        self.inner.delete_expired_stream_tokens(now_ms)
    }
}

impl AnswerStore for ScriptedStore {
    fn record_answer(&self, answer: &NewAnswer) -> Result<String> {
        self.inner.record_answer(answer)
    }

    fn get_answer(&self, answer_id: &str) -> Result<Option<AnswerRecord>> {
        self.inner.get_answer(answer_id)
    }

    fn get_device_answers(&self, device_id: &str, limit: usize) -> Result<Vec<AnswerRecord>> {
        self.inner.get_device_answers(device_id, limit)
    }
}

impl DeviceStore for ScriptedStore {
    fn register_device(&self, device: &NewListeningDevice) -> Result<ListeningDevice> {
        self.inner.register_device(device)
    }

    fn get_device(&self, device_id: &str) -> Result<Option<ListeningDevice>> {
        self.inner.get_device(device_id)
    }
}
