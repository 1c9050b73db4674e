use crate::survey_store::{PairingType, RecordingLabel, RoundMode, TransitionMode};
use serde::{Deserialize, Serialize};

/// Pairing strategies a listener can opt into. Placebo rounds are not a
/// choice; they are gated inside same-song pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingChoice {
    SameSong,
    DifferentSong,
}

impl PairingChoice {
    pub const ALL: [PairingChoice; 2] = [PairingChoice::SameSong, PairingChoice::DifferentSong];

    pub fn as_str(&self) -> &'static str {
        match self {
            PairingChoice::SameSong => "same_song",
            PairingChoice::DifferentSong => "different_song",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "same_song" => Some(PairingChoice::SameSong),
            "different_song" => Some(PairingChoice::DifferentSong),
            _ => None,
        }
    }
}

/// Per-request restrictions coming from the listener's setup screen.
/// `None` or an empty list means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundFilters {
    pub transition_modes: Option<Vec<TransitionMode>>,
    pub pairing_types: Option<Vec<PairingChoice>>,
}

impl RoundFilters {
    /// Parses comma separated lists, ignoring unknown entries.
    pub fn from_query(transition_modes: Option<&str>, pairing_types: Option<&str>) -> Self {
        Self {
            transition_modes: parse_list(transition_modes, TransitionMode::parse),
            pairing_types: parse_list(pairing_types, PairingChoice::parse),
        }
    }
}

fn parse_list<T>(raw: Option<&str>, parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    let items: Vec<T> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(parse)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOptions {
    pub filters: RoundFilters,
    /// Draw the round mode from the mode weights instead of labelling every
    /// round as mixtape.
    pub draw_round_mode: bool,
}

/// A ready-to-play blind comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRound {
    pub token_a: String,
    pub token_b: String,
    pub preview_token_a: Option<String>,
    pub preview_token_b: Option<String>,
    pub transition_mode: TransitionMode,
    pub round_mode: RoundMode,
    pub start_time_ms: i64,
    pub segment_duration_ms: u32,
    pub label_a: RecordingLabel,
    pub label_b: RecordingLabel,
    /// Kept server side; revealing it would unblind the round.
    #[serde(skip)]
    pub pairing_type: PairingType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_ignore_unknown_and_blank_entries() {
        let filters = RoundFilters::from_query(
            Some(" gapless, nope ,,gap_restart"),
            Some("placebo,different_song"),
        );
        assert_eq!(
            filters.transition_modes,
            Some(vec![TransitionMode::Gapless, TransitionMode::GapRestart])
        );
        assert_eq!(
            filters.pairing_types,
            Some(vec![PairingChoice::DifferentSong])
        );
    }

    #[test]
    fn fully_invalid_filter_means_no_filter() {
        let filters = RoundFilters::from_query(Some("x,y"), Some(""));
        assert_eq!(filters, RoundFilters::default());
        assert_eq!(RoundFilters::from_query(None, None), RoundFilters::default());
    }
}
