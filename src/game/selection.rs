use super::models::PairingChoice;
use super::sampling::weighted_choice;
use crate::survey_config::{ModeWeights, PairingWeights, TransitionWeights};
use crate::survey_store::{RoundMode, TransitionMode};
use rand::Rng;

const SAME_SONG_TRANSITIONS: [TransitionMode; 3] = [
    TransitionMode::Gapless,
    TransitionMode::GapContinue,
    TransitionMode::GapRestart,
];

/// Switching between two recordings cannot be seamless, so only the
/// pause-then-resume transition applies.
const DIFFERENT_SONG_TRANSITIONS: [TransitionMode; 1] = [TransitionMode::GapPauseResume];

pub fn transition_pool(pairing: PairingChoice) -> &'static [TransitionMode] {
    match pairing {
        PairingChoice::SameSong => &SAME_SONG_TRANSITIONS,
        PairingChoice::DifferentSong => &DIFFERENT_SONG_TRANSITIONS,
    }
}

/// Keeps the pool entries present in `filter`. An absent filter, or one that
/// would empty the pool, leaves the full pool.
fn filtered_pool<T: Copy + PartialEq>(pool: &[T], filter: Option<&[T]>) -> Vec<T> {
    let Some(filter) = filter.filter(|f| !f.is_empty()) else {
        return pool.to_vec();
    };
    let kept: Vec<T> = pool.iter().copied().filter(|p| filter.contains(p)).collect();
    if kept.is_empty() {
        pool.to_vec()
    } else {
        kept
    }
}

pub fn choose_pairing<R: Rng + ?Sized>(
    weights: &PairingWeights,
    filter: Option<&[PairingChoice]>,
    rng: &mut R,
) -> PairingChoice {
    let pool: Vec<(PairingChoice, f64)> = filtered_pool(&PairingChoice::ALL, filter)
        .into_iter()
        .map(|p| {
            let weight = match p {
                PairingChoice::SameSong => weights.same_song,
                PairingChoice::DifferentSong => weights.different_song,
            };
            (p, weight)
        })
        .collect();
    weighted_choice(&pool, rng).unwrap_or(PairingChoice::SameSong)
}

pub fn choose_transition<R: Rng + ?Sized>(
    pairing: PairingChoice,
    weights: &TransitionWeights,
    filter: Option<&[TransitionMode]>,
    rng: &mut R,
) -> TransitionMode {
    let pool = transition_pool(pairing);
    let weighted: Vec<(TransitionMode, f64)> = filtered_pool(pool, filter)
        .into_iter()
        .map(|m| (m, weights.weight(m)))
        .collect();
    weighted_choice(&weighted, rng).unwrap_or(pool[0])
}

/// Mixtape unless round-mode drawing is enabled.
pub fn choose_round_mode<R: Rng + ?Sized>(
    weights: &ModeWeights,
    draw: bool,
    rng: &mut R,
) -> RoundMode {
    if !draw {
        return RoundMode::Mixtape;
    }
    let weighted: Vec<(RoundMode, f64)> = RoundMode::DRAWABLE
        .iter()
        .map(|m| (*m, weights.weight(*m)))
        .collect();
    weighted_choice(&weighted, rng).unwrap_or(RoundMode::Mixtape)
}
