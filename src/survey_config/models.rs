//! Typed survey configuration groups.
//!
//! Each group knows how to parse itself from the raw stored string, keeping
//! per-field defaults when a stored object is only partially valid.

use crate::survey_store::{EncodedVariant, RoundMode, TransitionMode, VariantKey};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_SEGMENT_DURATION_MS: u32 = 12_000;
pub const MIN_SEGMENT_DURATION_MS: u32 = 1_000;
pub const MAX_SEGMENT_DURATION_MS: u32 = 120_000;
pub const DEFAULT_PLACEBO_PROBABILITY: f64 = 0.1;

fn non_negative(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_object(raw: &str) -> Result<serde_json::Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

fn check_weights(weights: &[(&str, f64)], group: &str) -> Result<(), String> {
    for (name, weight) in weights {
        if !weight.is_finite() || *weight < 0.0 {
            return Err(format!("Invalid weight for {}", name));
        }
    }
    if weights.iter().all(|(_, w)| *w == 0.0) {
        return Err(format!("At least one {} weight must be positive", group));
    }
    Ok(())
}

// =============================================================================
// Pairing
// =============================================================================

/// Relative weights of same-recording vs different-recording pairings.
/// Placebo rounds are gated separately by the placebo probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairingWeights {
    pub same_song: f64,
    pub different_song: f64,
}

impl Default for PairingWeights {
    fn default() -> Self {
        Self {
            same_song: 0.7,
            different_song: 0.2,
        }
    }
}

impl PairingWeights {
    pub fn from_stored(raw: &str) -> Result<Self, String> {
        let map = parse_object(raw)?;
        let mut weights = Self::default();
        if let Some(v) = non_negative(map.get("same_song")) {
            weights.same_song = v;
        }
        if let Some(v) = non_negative(map.get("different_song")) {
            weights.different_song = v;
        }
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), String> {
        check_weights(
            &[
                ("same_song", self.same_song),
                ("different_song", self.different_song),
            ],
            "pairing",
        )
    }
}

// =============================================================================
// Permutation
// =============================================================================

/// Per-rendition sampling weights. Renditions without an entry weigh 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermutationWeights {
    weights: HashMap<VariantKey, f64>,
}

impl PermutationWeights {
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    pub fn new(weights: HashMap<VariantKey, f64>) -> Self {
        Self { weights }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight_for(&self, key: &VariantKey) -> f64 {
        self.weights
            .get(key)
            .copied()
            .unwrap_or(Self::DEFAULT_WEIGHT)
    }

    pub fn weights_for(&self, variants: &[EncodedVariant]) -> Vec<f64> {
        variants.iter().map(|v| self.weight_for(&v.key())).collect()
    }

    /// Builds weights from `"codec_bitrate"` keyed entries, dropping unparseable
    /// keys and negative or non-finite values.
    pub fn from_string_keys<'a>(entries: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let weights = entries
            .into_iter()
            .filter(|(_, v)| v.is_finite() && *v >= 0.0)
            .filter_map(|(k, v)| k.parse::<VariantKey>().ok().map(|key| (key, v)))
            .collect();
        Self { weights }
    }

    pub fn from_stored(raw: &str) -> Result<Self, String> {
        let map = parse_object(raw)?;
        Ok(Self::from_string_keys(
            map.iter()
                .filter_map(|(k, v)| v.as_f64().map(|v| (k.as_str(), v))),
        ))
    }

    pub fn to_string_keys(&self) -> BTreeMap<String, f64> {
        self.weights
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        let total: f64 = self.weights.values().sum();
        if total <= 0.0 {
            return Err("At least one permutation weight must be positive".to_string());
        }
        Ok(())
    }
}

impl Serialize for PermutationWeights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string_keys().serialize(serializer)
    }
}

// =============================================================================
// Transition / mode
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionWeights {
    pub gapless: f64,
    pub gap_continue: f64,
    pub gap_restart: f64,
    pub gap_pause_resume: f64,
}

impl Default for TransitionWeights {
    fn default() -> Self {
        Self {
            gapless: 1.0,
            gap_continue: 1.0,
            gap_restart: 1.0,
            gap_pause_resume: 1.0,
        }
    }
}

impl TransitionWeights {
    pub fn weight(&self, mode: TransitionMode) -> f64 {
        match mode {
            TransitionMode::Gapless => self.gapless,
            TransitionMode::GapContinue => self.gap_continue,
            TransitionMode::GapRestart => self.gap_restart,
            TransitionMode::GapPauseResume => self.gap_pause_resume,
        }
    }

    fn weight_mut(&mut self, mode: TransitionMode) -> &mut f64 {
        match mode {
            TransitionMode::Gapless => &mut self.gapless,
            TransitionMode::GapContinue => &mut self.gap_continue,
            TransitionMode::GapRestart => &mut self.gap_restart,
            TransitionMode::GapPauseResume => &mut self.gap_pause_resume,
        }
    }

    pub fn from_stored(raw: &str) -> Result<Self, String> {
        let map = parse_object(raw)?;
        let mut weights = Self::default();
        for mode in TransitionMode::ALL {
            if let Some(v) = non_negative(map.get(mode.as_str())) {
                *weights.weight_mut(mode) = v;
            }
        }
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), String> {
        let weights: Vec<_> = TransitionMode::ALL
            .iter()
            .map(|m| (m.as_str(), self.weight(*m)))
            .collect();
        check_weights(&weights, "transition")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeWeights {
    pub codec_compare: f64,
    pub bitrate_battle: f64,
    pub genre_trials: f64,
    pub tradeoff: f64,
}

impl Default for ModeWeights {
    fn default() -> Self {
        Self {
            codec_compare: 1.0,
            bitrate_battle: 1.0,
            genre_trials: 1.0,
            tradeoff: 1.0,
        }
    }
}

impl ModeWeights {
    /// Mixtape is never drawn and weighs 0.
    pub fn weight(&self, mode: RoundMode) -> f64 {
        match mode {
            RoundMode::CodecCompare => self.codec_compare,
            RoundMode::BitrateBattle => self.bitrate_battle,
            RoundMode::GenreTrials => self.genre_trials,
            RoundMode::Tradeoff => self.tradeoff,
            RoundMode::Mixtape => 0.0,
        }
    }

    pub fn from_stored(raw: &str) -> Result<Self, String> {
        let map = parse_object(raw)?;
        let mut weights = Self::default();
        if let Some(v) = non_negative(map.get("codec_compare")) {
            weights.codec_compare = v;
        }
        if let Some(v) = non_negative(map.get("bitrate_battle")) {
            weights.bitrate_battle = v;
        }
        if let Some(v) = non_negative(map.get("genre_trials")) {
            weights.genre_trials = v;
        }
        if let Some(v) = non_negative(map.get("tradeoff")) {
            weights.tradeoff = v;
        }
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), String> {
        let weights: Vec<_> = RoundMode::DRAWABLE
            .iter()
            .map(|m| (m.as_str(), self.weight(*m)))
            .collect();
        check_weights(&weights, "mode")
    }
}

// =============================================================================
// Trade-off gap curve
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeoffGapPoint {
    pub gap: f64,
    pub weight: f64,
}

impl TradeoffGapPoint {
    fn is_valid(&self) -> bool {
        self.gap.is_finite() && self.weight.is_finite() && self.weight >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeoffGapConfig {
    pub min_gap: f64,
    pub max_gap: f64,
    pub gap_points: Vec<TradeoffGapPoint>,
}

impl Default for TradeoffGapConfig {
    fn default() -> Self {
        Self {
            min_gap: 0.5,
            max_gap: 2.5,
            gap_points: Self::default_points(),
        }
    }
}

impl TradeoffGapConfig {
    pub fn default_points() -> Vec<TradeoffGapPoint> {
        vec![
            TradeoffGapPoint {
                gap: 0.5,
                weight: 0.2,
            },
            TradeoffGapPoint {
                gap: 1.5,
                weight: 0.5,
            },
            TradeoffGapPoint {
                gap: 2.5,
                weight: 0.3,
            },
        ]
    }

    /// Assembles the curve from its three stored values. Each one falls back
    /// independently; `max_gap` is only accepted when it is at least `min_gap`.
    pub fn from_stored(
        min_gap: Option<&str>,
        max_gap: Option<&str>,
        points: Option<&str>,
    ) -> (Self, Vec<String>) {
        let mut config = Self::default();
        let mut problems = Vec::new();

        if let Some(raw) = min_gap {
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => config.min_gap = v,
                _ => problems.push(format!("invalid min gap '{}'", raw)),
            }
        }
        if let Some(raw) = max_gap {
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= config.min_gap => config.max_gap = v,
                _ => problems.push(format!("invalid max gap '{}'", raw)),
            }
        }
        if let Some(raw) = points {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Array(items)) if !items.is_empty() => {
                    config.gap_points = items
                        .into_iter()
                        .filter_map(|item| serde_json::from_value::<TradeoffGapPoint>(item).ok())
                        .filter(TradeoffGapPoint::is_valid)
                        .collect();
                }
                _ => problems.push("invalid gap points".to_string()),
            }
        }
        (config, problems)
    }

    /// Forces `min_gap >= 0`, `max_gap >= min_gap` and drops invalid points.
    pub fn clamped(&self) -> Self {
        let min_gap = if self.min_gap.is_finite() {
            self.min_gap.max(0.0)
        } else {
            0.0
        };
        let max_gap = if self.max_gap.is_finite() {
            self.max_gap.max(min_gap)
        } else {
            min_gap
        };
        Self {
            min_gap,
            max_gap,
            gap_points: self
                .gap_points
                .iter()
                .copied()
                .filter(TradeoffGapPoint::is_valid)
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.min_gap.is_finite() || self.min_gap < 0.0 {
            return Err("Min gap must be a non-negative number".to_string());
        }
        if !self.max_gap.is_finite() || self.max_gap < self.min_gap {
            return Err("Max gap must be >= min gap".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Every survey setting, read once per round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyConfig {
    pub pairing_weights: PairingWeights,
    pub placebo_probability: f64,
    pub permutation_weights: PermutationWeights,
    pub transition_weights: TransitionWeights,
    pub mode_weights: ModeWeights,
    pub segment_duration_ms: u32,
    pub tradeoff_gap: TradeoffGapConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            pairing_weights: PairingWeights::default(),
            placebo_probability: DEFAULT_PLACEBO_PROBABILITY,
            permutation_weights: PermutationWeights::default(),
            transition_weights: TransitionWeights::default(),
            mode_weights: ModeWeights::default(),
            segment_duration_ms: DEFAULT_SEGMENT_DURATION_MS,
            tradeoff_gap: TradeoffGapConfig::default(),
        }
    }
}
