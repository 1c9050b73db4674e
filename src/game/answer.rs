//! Recording a listener's verdict on a round.

use super::round::issue_preview;
use crate::stream_tokens;
use crate::survey_config::DEFAULT_SEGMENT_DURATION_MS;
use crate::survey_store::{
    NewAnswer, PairingType, RoundMode, SelectedSide, SurveyStore, TransitionMode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Stream tokens expired or invalid")]
    Gone,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Body of an answer submission. Every field is optional at this level so
/// missing values can be reported as a bad request rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub token_a: Option<String>,
    pub token_b: Option<String>,
    pub preview_token_a: Option<String>,
    pub preview_token_b: Option<String>,
    pub selected: Option<String>,
    pub transition_mode: Option<String>,
    pub round_mode: Option<String>,
    pub start_time_ms: Option<i64>,
    pub segment_duration_ms: Option<i64>,
    pub response_time_ms: Option<i64>,
    pub device_id: Option<String>,
    pub session_id: Option<String>,
    pub playback_position_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub id: String,
    pub success: bool,
    /// Short-lived token for the preview rendition of the selected side.
    pub playback_token: Option<String>,
    pub playback_position_ms: i64,
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Resolves and claims the comparison tokens, records the verdict, burns the
/// preview tokens of the round and mints a playback token for the chosen side.
pub fn submit_answer<S: SurveyStore + ?Sized>(
    store: &S,
    submission: &AnswerSubmission,
) -> Result<AnswerOutcome, AnswerError> {
    let (Some(token_a), Some(token_b), Some(selected), Some(transition_mode), Some(device_id)) = (
        required(&submission.token_a),
        required(&submission.token_b),
        required(&submission.selected),
        required(&submission.transition_mode),
        required(&submission.device_id),
    ) else {
        return Err(AnswerError::BadRequest("Missing required fields".to_string()));
    };

    let selected = SelectedSide::parse(selected)
        .ok_or_else(|| AnswerError::BadRequest("Invalid selection".to_string()))?;
    let transition_mode = TransitionMode::parse(transition_mode)
        .ok_or_else(|| AnswerError::BadRequest("Invalid transition mode".to_string()))?;

    let (Some(variant_a_id), Some(variant_b_id)) = (
        stream_tokens::resolve(store, token_a)?,
        stream_tokens::resolve(store, token_b)?,
    ) else {
        return Err(AnswerError::Gone);
    };

    let variant_a = store.get_variant(&variant_a_id)?;
    let variant_b = store.get_variant(&variant_b_id)?;
    let pairing_type = if variant_a_id == variant_b_id {
        PairingType::Placebo
    } else {
        match (&variant_a, &variant_b) {
            (Some(a), Some(b)) if a.source_id == b.source_id => PairingType::SameSong,
            _ => PairingType::DifferentSong,
        }
    };

    let round_mode = submission.round_mode.as_deref().and_then(RoundMode::parse);

    // Both claims run so a lost race still burns the round.
    let claimed_a = stream_tokens::claim(store, token_a)?;
    let claimed_b = stream_tokens::claim(store, token_b)?;
    if !(claimed_a && claimed_b) {
        debug!("Comparison tokens were claimed by another submission");
        return Err(AnswerError::Gone);
    }

    let answer_id = store.record_answer(&NewAnswer {
        device_id: device_id.to_string(),
        session_id: submission.session_id.clone(),
        candidate_a_id: variant_a_id.clone(),
        candidate_b_id: variant_b_id.clone(),
        selected,
        pairing_type,
        transition_mode,
        round_mode,
        start_time_ms: submission.start_time_ms.unwrap_or(0),
        segment_duration_ms: submission
            .segment_duration_ms
            .unwrap_or(DEFAULT_SEGMENT_DURATION_MS as i64),
        response_time_ms: submission.response_time_ms,
    })?;
    debug!(
        "Recorded {} answer {} for device {}",
        pairing_type.as_str(),
        answer_id,
        device_id
    );

    for preview in [&submission.preview_token_a, &submission.preview_token_b]
        .into_iter()
        .filter_map(required)
    {
        if let Err(err) = stream_tokens::consume(store, preview) {
            warn!("Failed to delete preview token: {:#}", err);
        }
    }

    let selected_variant = match selected {
        SelectedSide::A => variant_a,
        SelectedSide::B => variant_b,
    };
    let playback_token = selected_variant
        .as_ref()
        .and_then(|variant| issue_preview(store, variant));

    let playback_position_ms = submission
        .playback_position_ms
        .filter(|p| p.is_finite() && *p >= 0.0)
        .map(|p| p as i64)
        .unwrap_or(0);

    Ok(AnswerOutcome {
        id: answer_id,
        success: true,
        playback_token,
        playback_position_ms,
    })
}
