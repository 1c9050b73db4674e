use super::candidates::sample_candidates;
use super::models::{ComparisonRound, RoundOptions};
use super::segment::choose_start_ms;
use super::selection::{choose_pairing, choose_round_mode, choose_transition};
use crate::stream_tokens::{self, COMPARISON_TOKEN_TTL, PREVIEW_TOKEN_TTL};
use crate::survey_config::SurveyConfig;
use crate::survey_store::{EncodedVariant, RecordingLabel, SurveyStore, VariantKey};
use anyhow::Result;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Builds one blind comparison round.
///
/// Reads the catalog and a fresh config snapshot, draws pairing, transition
/// and mode, samples the two variants, positions the segment and issues the
/// tokens. `Ok(None)` means the catalog cannot currently produce a round,
/// which callers surface as an empty state. Errors are storage failures.
pub fn generate_round<S, R>(
    store: &S,
    options: &RoundOptions,
    rng: &mut R,
) -> Result<Option<ComparisonRound>>
where
    S: SurveyStore + ?Sized,
    R: Rng + ?Sized,
{
    let recordings: Vec<_> = store
        .get_eligible_recordings()?
        .into_iter()
        .filter(|r| r.is_eligible())
        .collect();
    if recordings.is_empty() {
        debug!("No round: no eligible recordings");
        return Ok(None);
    }

    let enabled: HashSet<VariantKey> = store.get_enabled_variant_options()?.into_iter().collect();
    if enabled.is_empty() {
        debug!("No round: no enabled variant options");
        return Ok(None);
    }

    let config = SurveyConfig::load(store);

    let pairing = choose_pairing(
        &config.pairing_weights,
        options.filters.pairing_types.as_deref(),
        rng,
    );
    let transition_mode = choose_transition(
        pairing,
        &config.transition_weights,
        options.filters.transition_modes.as_deref(),
        rng,
    );
    let round_mode = choose_round_mode(&config.mode_weights, options.draw_round_mode, rng);

    let Some(mut pair) = sample_candidates(
        store,
        &recordings,
        &enabled,
        pairing,
        &config.permutation_weights,
        config.placebo_probability,
        rng,
    )?
    else {
        debug!("No round: not enough candidates for {}", pairing.as_str());
        return Ok(None);
    };
    pair.shuffle_sides(rng);

    let start_time_ms = choose_start_ms(pair.duration_ms, config.segment_duration_ms, rng);

    let Some(token_a) = stream_tokens::issue(store, &pair.a.id, COMPARISON_TOKEN_TTL)? else {
        debug!("No round: token insert for side A returned nothing");
        return Ok(None);
    };
    let Some(token_b) = stream_tokens::issue(store, &pair.b.id, COMPARISON_TOKEN_TTL)? else {
        debug!("No round: token insert for side B returned nothing");
        if let Err(err) = stream_tokens::consume(store, &token_a) {
            warn!("Failed to delete orphaned side A token: {:#}", err);
        }
        return Ok(None);
    };

    let preview_token_a = issue_preview(store, &pair.a);
    let preview_token_b = issue_preview(store, &pair.b);

    let label_a = label_for(store, &pair.a);
    let label_b = label_for(store, &pair.b);

    debug!(
        "Generated {} round ({}, {}) at {}ms",
        pair.pairing_type.as_str(),
        transition_mode.as_str(),
        round_mode.as_str(),
        start_time_ms
    );

    Ok(Some(ComparisonRound {
        token_a,
        token_b,
        preview_token_a,
        preview_token_b,
        transition_mode,
        round_mode,
        start_time_ms,
        segment_duration_ms: config.segment_duration_ms,
        label_a,
        label_b,
        pairing_type: pair.pairing_type,
    }))
}

/// Mints a token for the preview rendition of the variant's recording.
/// Best-effort: a missing rendition or a storage error yields None.
pub(crate) fn issue_preview<S: SurveyStore + ?Sized>(
    store: &S,
    variant: &EncodedVariant,
) -> Option<String> {
    let preview = match store.find_variant(&variant.source_id, &VariantKey::preview()) {
        Ok(Some(preview)) => preview,
        Ok(None) => return None,
        Err(err) => {
            warn!(
                "Preview lookup failed for recording {}: {:#}",
                variant.source_id, err
            );
            return None;
        }
    };
    match stream_tokens::issue(store, &preview.id, PREVIEW_TOKEN_TTL) {
        Ok(token) => token,
        Err(err) => {
            warn!("Failed to issue preview token for {}: {:#}", preview.id, err);
            None
        }
    }
}

fn label_for<S: SurveyStore + ?Sized>(store: &S, variant: &EncodedVariant) -> RecordingLabel {
    match store.get_variant_label(&variant.id) {
        Ok(Some(label)) => label,
        Ok(None) => RecordingLabel::unknown(),
        Err(err) => {
            warn!("Failed to load label for variant {}: {:#}", variant.id, err);
            RecordingLabel::unknown()
        }
    }
}
