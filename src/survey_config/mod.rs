//! Operator-tunable survey settings on top of the string-keyed config store.
//!
//! Getters never fail: a missing, malformed or unreadable value is logged and
//! replaced by its default, independently for each group. Setters clamp before
//! writing.

mod models;

pub use models::*;

use crate::survey_store::ConfigStore;
use anyhow::Result;
use tracing::{debug, warn};

pub const PAIRING_WEIGHTS_KEY: &str = "pairing_weights";
pub const SEGMENT_DURATION_KEY: &str = "segment_duration_ms";
pub const PLACEBO_PROBABILITY_KEY: &str = "placebo_probability";
pub const PERMUTATION_WEIGHTS_KEY: &str = "permutation_weights";
pub const TRANSITION_WEIGHTS_KEY: &str = "transition_weights";
pub const MODE_WEIGHTS_KEY: &str = "mode_weights";
pub const TRADEOFF_MIN_GAP_KEY: &str = "tradeoff_min_gap";
pub const TRADEOFF_MAX_GAP_KEY: &str = "tradeoff_max_gap";
pub const TRADEOFF_GAP_POINTS_KEY: &str = "tradeoff_gap_points";

/// Empty strings count as unset.
fn read_raw<C: ConfigStore + ?Sized>(store: &C, key: &str) -> Option<String> {
    match store.get_config_value(key) {
        Ok(Some(value)) if !value.trim().is_empty() => Some(value),
        Ok(_) => None,
        Err(err) => {
            warn!("Failed to read survey config {}: {:#}", key, err);
            None
        }
    }
}

fn read_parsed<C: ConfigStore + ?Sized, T: Default>(
    store: &C,
    key: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> T {
    let Some(raw) = read_raw(store, key) else {
        debug!("Survey config {} not set, using default", key);
        return T::default();
    };
    match parse(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                "Ignoring malformed survey config {} ({}), using default",
                key, err
            );
            T::default()
        }
    }
}

pub fn get_pairing_weights<C: ConfigStore + ?Sized>(store: &C) -> PairingWeights {
    read_parsed(store, PAIRING_WEIGHTS_KEY, PairingWeights::from_stored)
}

pub fn set_pairing_weights<C: ConfigStore + ?Sized>(
    store: &C,
    weights: &PairingWeights,
) -> Result<()> {
    let sanitized = PairingWeights {
        same_song: sanitize_weight(weights.same_song),
        different_song: sanitize_weight(weights.different_song),
    };
    store.set_config_value(PAIRING_WEIGHTS_KEY, &serde_json::to_string(&sanitized)?)
}

pub fn get_placebo_probability<C: ConfigStore + ?Sized>(store: &C) -> f64 {
    let Some(raw) = read_raw(store, PLACEBO_PROBABILITY_KEY) else {
        return DEFAULT_PLACEBO_PROBABILITY;
    };
    match raw.trim().parse::<f64>() {
        Ok(p) if p.is_finite() && (0.0..=1.0).contains(&p) => p,
        _ => {
            warn!("Ignoring out-of-range placebo probability '{}'", raw);
            DEFAULT_PLACEBO_PROBABILITY
        }
    }
}

pub fn set_placebo_probability<C: ConfigStore + ?Sized>(store: &C, probability: f64) -> Result<()> {
    let clamped = if probability.is_nan() {
        DEFAULT_PLACEBO_PROBABILITY
    } else {
        probability.clamp(0.0, 1.0)
    };
    store.set_config_value(PLACEBO_PROBABILITY_KEY, &clamped.to_string())
}

pub fn get_permutation_weights<C: ConfigStore + ?Sized>(store: &C) -> PermutationWeights {
    read_parsed(store, PERMUTATION_WEIGHTS_KEY, PermutationWeights::from_stored)
}

pub fn set_permutation_weights<C: ConfigStore + ?Sized>(
    store: &C,
    weights: &PermutationWeights,
) -> Result<()> {
    store.set_config_value(PERMUTATION_WEIGHTS_KEY, &serde_json::to_string(weights)?)
}

pub fn get_transition_weights<C: ConfigStore + ?Sized>(store: &C) -> TransitionWeights {
    read_parsed(store, TRANSITION_WEIGHTS_KEY, TransitionWeights::from_stored)
}

pub fn set_transition_weights<C: ConfigStore + ?Sized>(
    store: &C,
    weights: &TransitionWeights,
) -> Result<()> {
    let sanitized = TransitionWeights {
        gapless: sanitize_weight(weights.gapless),
        gap_continue: sanitize_weight(weights.gap_continue),
        gap_restart: sanitize_weight(weights.gap_restart),
        gap_pause_resume: sanitize_weight(weights.gap_pause_resume),
    };
    store.set_config_value(TRANSITION_WEIGHTS_KEY, &serde_json::to_string(&sanitized)?)
}

pub fn get_mode_weights<C: ConfigStore + ?Sized>(store: &C) -> ModeWeights {
    read_parsed(store, MODE_WEIGHTS_KEY, ModeWeights::from_stored)
}

pub fn set_mode_weights<C: ConfigStore + ?Sized>(store: &C, weights: &ModeWeights) -> Result<()> {
    let sanitized = ModeWeights {
        codec_compare: sanitize_weight(weights.codec_compare),
        bitrate_battle: sanitize_weight(weights.bitrate_battle),
        genre_trials: sanitize_weight(weights.genre_trials),
        tradeoff: sanitize_weight(weights.tradeoff),
    };
    store.set_config_value(MODE_WEIGHTS_KEY, &serde_json::to_string(&sanitized)?)
}

pub fn get_segment_duration_ms<C: ConfigStore + ?Sized>(store: &C) -> u32 {
    let Some(raw) = read_raw(store, SEGMENT_DURATION_KEY) else {
        return DEFAULT_SEGMENT_DURATION_MS;
    };
    match raw.trim().parse::<i64>() {
        Ok(ms)
            if (MIN_SEGMENT_DURATION_MS as i64..=MAX_SEGMENT_DURATION_MS as i64).contains(&ms) =>
        {
            ms as u32
        }
        _ => {
            warn!("Ignoring invalid segment duration '{}'", raw);
            DEFAULT_SEGMENT_DURATION_MS
        }
    }
}

/// Rounds and clamps to the accepted range before writing.
pub fn set_segment_duration_ms<C: ConfigStore + ?Sized>(store: &C, ms: f64) -> Result<u32> {
    let clamped = if ms.is_nan() {
        DEFAULT_SEGMENT_DURATION_MS
    } else {
        ms.round()
            .clamp(MIN_SEGMENT_DURATION_MS as f64, MAX_SEGMENT_DURATION_MS as f64) as u32
    };
    store.set_config_value(SEGMENT_DURATION_KEY, &clamped.to_string())?;
    Ok(clamped)
}

pub fn get_tradeoff_gap_config<C: ConfigStore + ?Sized>(store: &C) -> TradeoffGapConfig {
    let min_gap = read_raw(store, TRADEOFF_MIN_GAP_KEY);
    let max_gap = read_raw(store, TRADEOFF_MAX_GAP_KEY);
    let points = read_raw(store, TRADEOFF_GAP_POINTS_KEY);
    let (config, problems) =
        TradeoffGapConfig::from_stored(min_gap.as_deref(), max_gap.as_deref(), points.as_deref());
    for problem in problems {
        warn!("Ignoring trade-off gap config: {}", problem);
    }
    config
}

pub fn set_tradeoff_gap_config<C: ConfigStore + ?Sized>(
    store: &C,
    config: &TradeoffGapConfig,
) -> Result<()> {
    let clamped = config.clamped();
    store.set_config_value(TRADEOFF_MIN_GAP_KEY, &clamped.min_gap.to_string())?;
    store.set_config_value(TRADEOFF_MAX_GAP_KEY, &clamped.max_gap.to_string())?;
    store.set_config_value(
        TRADEOFF_GAP_POINTS_KEY,
        &serde_json::to_string(&clamped.gap_points)?,
    )?;
    Ok(())
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() {
        weight.max(0.0)
    } else {
        0.0
    }
}

impl SurveyConfig {
    /// Reads every group from the store. Never fails.
    pub fn load<C: ConfigStore + ?Sized>(store: &C) -> Self {
        Self {
            pairing_weights: get_pairing_weights(store),
            placebo_probability: get_placebo_probability(store),
            permutation_weights: get_permutation_weights(store),
            transition_weights: get_transition_weights(store),
            mode_weights: get_mode_weights(store),
            segment_duration_ms: get_segment_duration_ms(store),
            tradeoff_gap: get_tradeoff_gap_config(store),
        }
    }
}
