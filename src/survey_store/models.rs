use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Catalog
// =============================================================================

/// A codec + bitrate combination, e.g. `opus@128` or `flac@0`.
///
/// Serialized as `"{codec}_{bitrate}"` only at storage and wire boundaries;
/// in memory the two parts are always kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    pub codec: String,
    pub bitrate: u32,
}

impl VariantKey {
    pub fn new(codec: impl Into<String>, bitrate: u32) -> Self {
        Self {
            codec: codec.into(),
            bitrate,
        }
    }

    /// The rendition used for preview and "what you just heard" playback.
    pub fn preview() -> Self {
        Self::new("opus", 128)
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.codec, self.bitrate)
    }
}

impl FromStr for VariantKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (codec, bitrate) = s
            .rsplit_once('_')
            .ok_or_else(|| format!("Variant key '{}' has no bitrate part", s))?;
        if codec.is_empty() {
            return Err(format!("Variant key '{}' has an empty codec", s));
        }
        let bitrate = bitrate
            .parse::<u32>()
            .map_err(|_| format!("Variant key '{}' has an invalid bitrate", s))?;
        Ok(Self::new(codec, bitrate))
    }
}

/// An approved (or pending) source recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecording {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub featured_artists: Option<String>,
    pub remix_artists: Option<String>,
    pub stream_url: Option<String>,
    pub duration_ms: Option<i64>,
    pub storage_key: Option<String>,
    pub approved_at: Option<i64>,
}

impl SourceRecording {
    /// Only approved recordings with a storage object and a known duration
    /// may appear in a round.
    pub fn is_eligible(&self) -> bool {
        self.approved_at.is_some() && self.storage_key.is_some() && self.duration_ms.is_some()
    }
}

/// One codec + bitrate rendition of a source recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedVariant {
    pub id: String,
    pub source_id: String,
    pub codec: String,
    pub bitrate: u32,
    pub storage_key: String,
}

impl EncodedVariant {
    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.codec.clone(), self.bitrate)
    }
}

/// Operator-facing enable flag for a codec + bitrate combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantOption {
    pub codec: String,
    pub bitrate: u32,
    pub enabled: bool,
}

/// Display metadata for one side of a round. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingLabel {
    pub title: String,
    pub artist: Option<String>,
    pub featured_artists: Option<String>,
    pub remix_artists: Option<String>,
    pub stream_url: Option<String>,
}

impl RecordingLabel {
    pub fn unknown() -> Self {
        Self {
            title: "Unknown".to_string(),
            artist: None,
            featured_artists: None,
            remix_artists: None,
            stream_url: None,
        }
    }
}

// =============================================================================
// Ephemeral stream tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTokenRow {
    pub token: String,
    pub variant_id: String,
    /// Unix milliseconds after which the token must not resolve.
    pub expires_at: i64,
}

// =============================================================================
// Answers
// =============================================================================

/// How the two compared variants relate, inferred at answer time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingType {
    SameSong,
    DifferentSong,
    Placebo,
}

impl PairingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairingType::SameSong => "same_song",
            PairingType::DifferentSong => "different_song",
            PairingType::Placebo => "placebo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "same_song" => Some(PairingType::SameSong),
            "different_song" => Some(PairingType::DifferentSong),
            "placebo" => Some(PairingType::Placebo),
            _ => None,
        }
    }
}

/// Playback behaviour at the midpoint of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    Gapless,
    GapContinue,
    GapRestart,
    GapPauseResume,
}

impl TransitionMode {
    pub const ALL: [TransitionMode; 4] = [
        TransitionMode::Gapless,
        TransitionMode::GapContinue,
        TransitionMode::GapRestart,
        TransitionMode::GapPauseResume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionMode::Gapless => "gapless",
            TransitionMode::GapContinue => "gap_continue",
            TransitionMode::GapRestart => "gap_restart",
            TransitionMode::GapPauseResume => "gap_pause_resume",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gapless" => Some(TransitionMode::Gapless),
            "gap_continue" => Some(TransitionMode::GapContinue),
            "gap_restart" => Some(TransitionMode::GapRestart),
            "gap_pause_resume" => Some(TransitionMode::GapPauseResume),
            _ => None,
        }
    }
}

/// Trial category a round is labelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundMode {
    CodecCompare,
    BitrateBattle,
    GenreTrials,
    Tradeoff,
    Mixtape,
}

impl RoundMode {
    /// Modes that can be drawn from the configured mode weights.
    pub const DRAWABLE: [RoundMode; 4] = [
        RoundMode::CodecCompare,
        RoundMode::BitrateBattle,
        RoundMode::GenreTrials,
        RoundMode::Tradeoff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundMode::CodecCompare => "codec_compare",
            RoundMode::BitrateBattle => "bitrate_battle",
            RoundMode::GenreTrials => "genre_trials",
            RoundMode::Tradeoff => "tradeoff",
            RoundMode::Mixtape => "mixtape",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "codec_compare" => Some(RoundMode::CodecCompare),
            "bitrate_battle" => Some(RoundMode::BitrateBattle),
            "genre_trials" => Some(RoundMode::GenreTrials),
            "tradeoff" => Some(RoundMode::Tradeoff),
            "mixtape" => Some(RoundMode::Mixtape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectedSide {
    A,
    B,
}

impl SelectedSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectedSide::A => "a",
            SelectedSide::B => "b",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "a" => Some(SelectedSide::A),
            "b" => Some(SelectedSide::B),
            _ => None,
        }
    }
}

/// A trial outcome ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
    pub device_id: String,
    pub session_id: Option<String>,
    pub candidate_a_id: String,
    pub candidate_b_id: String,
    pub selected: SelectedSide,
    pub pairing_type: PairingType,
    pub transition_mode: TransitionMode,
    pub round_mode: Option<RoundMode>,
    pub start_time_ms: i64,
    pub segment_duration_ms: i64,
    pub response_time_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub id: String,
    pub device_id: String,
    pub session_id: Option<String>,
    pub candidate_a_id: String,
    pub candidate_b_id: String,
    pub selected: SelectedSide,
    pub pairing_type: PairingType,
    pub transition_mode: TransitionMode,
    pub round_mode: Option<RoundMode>,
    pub start_time_ms: i64,
    pub segment_duration_ms: i64,
    pub response_time_ms: Option<i64>,
    pub created_at: i64,
}

// =============================================================================
// Listening devices
// =============================================================================

pub const DEVICE_TYPES: &[&str] = &["headphones", "iem", "earbuds", "speakers", "laptop", "phone"];

pub const CONNECTION_TYPES: &[&str] = &["wired", "usb_dac", "bluetooth"];

pub const PRICE_TIERS: &[&str] = &["budget", "mid_range", "high_end", "flagship"];

/// A validated device registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListeningDevice {
    pub device_type: String,
    pub connection_type: String,
    pub brand: String,
    pub model: String,
    pub price_tier: String,
}

/// The playback setup a listener answers from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningDevice {
    pub id: String,
    pub device_type: String,
    pub connection_type: String,
    pub brand: String,
    pub model: String,
    pub price_tier: String,
    pub created_at: i64,
}
