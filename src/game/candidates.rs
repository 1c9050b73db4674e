//! Picks the two encoded variants a round compares.

use super::models::PairingChoice;
use super::sampling::{random_element, weighted_choice, weighted_sample_without_replacement};
use crate::survey_config::PermutationWeights;
use crate::survey_store::{CatalogReader, EncodedVariant, PairingType, SourceRecording, VariantKey};
use anyhow::Result;
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

/// The variants on each side of a round, before tokens are issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePair {
    pub a: EncodedVariant,
    pub b: EncodedVariant,
    pub pairing_type: PairingType,
    /// Duration of the shorter recording involved.
    pub duration_ms: i64,
}

impl CandidatePair {
    pub fn is_placebo(&self) -> bool {
        self.a.id == self.b.id
    }

    /// Swaps A and B with probability 1/2 so the first drawn variant carries
    /// no positional meaning. Identical sides are left untouched.
    pub fn shuffle_sides<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.is_placebo() {
            return;
        }
        if rng.random_bool(0.5) {
            std::mem::swap(&mut self.a, &mut self.b);
        }
    }
}

/// Samples a candidate pair for the given pairing strategy.
/// Returns Ok(None) when the catalog cannot satisfy it.
pub fn sample_candidates<C, R>(
    catalog: &C,
    recordings: &[SourceRecording],
    enabled: &HashSet<VariantKey>,
    pairing: PairingChoice,
    permutation_weights: &PermutationWeights,
    placebo_probability: f64,
    rng: &mut R,
) -> Result<Option<CandidatePair>>
where
    C: CatalogReader + ?Sized,
    R: Rng + ?Sized,
{
    let enabled_variants = |source_id: &str| -> Result<Vec<EncodedVariant>> {
        Ok(catalog
            .get_recording_variants(source_id)?
            .into_iter()
            .filter(|v| enabled.contains(&v.key()))
            .collect())
    };

    match pairing {
        PairingChoice::SameSong => {
            let Some(recording) = random_element(recordings, rng) else {
                return Ok(None);
            };
            let variants = enabled_variants(&recording.id)?;
            let Some((a, b)) =
                pick_same_song(&variants, permutation_weights, placebo_probability, rng)
            else {
                debug!(
                    "Recording {} has {} enabled variants, cannot pair",
                    recording.id,
                    variants.len()
                );
                return Ok(None);
            };
            let pairing_type = if a.id == b.id {
                PairingType::Placebo
            } else {
                PairingType::SameSong
            };
            Ok(Some(CandidatePair {
                a,
                b,
                pairing_type,
                duration_ms: recording.duration_ms.unwrap_or(0),
            }))
        }
        PairingChoice::DifferentSong => {
            let Some((first, second)) = pick_two_recordings(recordings, rng) else {
                debug!("Fewer than two eligible recordings, cannot pair different songs");
                return Ok(None);
            };
            let variants_a = enabled_variants(&first.id)?;
            let variants_b = enabled_variants(&second.id)?;
            let (Some(a), Some(b)) = (
                pick_one(&variants_a, permutation_weights, rng),
                pick_one(&variants_b, permutation_weights, rng),
            ) else {
                debug!(
                    "Recording {} or {} has no enabled variants",
                    first.id, second.id
                );
                return Ok(None);
            };
            Ok(Some(CandidatePair {
                a,
                b,
                pairing_type: PairingType::DifferentSong,
                duration_ms: first
                    .duration_ms
                    .unwrap_or(0)
                    .min(second.duration_ms.unwrap_or(0)),
            }))
        }
    }
}

/// Same recording on both sides. With probability `placebo_probability` one
/// variant is used twice; otherwise two distinct variants are drawn without
/// replacement.
pub fn pick_same_song<R: Rng + ?Sized>(
    variants: &[EncodedVariant],
    weights: &PermutationWeights,
    placebo_probability: f64,
    rng: &mut R,
) -> Option<(EncodedVariant, EncodedVariant)> {
    if variants.is_empty() {
        return None;
    }
    let variant_weights = weights.weights_for(variants);

    if rng.random::<f64>() < placebo_probability {
        let indexed: Vec<(usize, f64)> = variant_weights.iter().copied().enumerate().collect();
        let index = weighted_choice(&indexed, rng)?;
        let variant = variants[index].clone();
        return Some((variant.clone(), variant));
    }

    if variants.len() < 2 {
        return None;
    }
    let mut drawn =
        weighted_sample_without_replacement(variants, &variant_weights, 2, rng).into_iter();
    match (drawn.next(), drawn.next()) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}

/// One weighted variant, uniform when every weight is zero.
pub fn pick_one<R: Rng + ?Sized>(
    variants: &[EncodedVariant],
    weights: &PermutationWeights,
    rng: &mut R,
) -> Option<EncodedVariant> {
    let variant_weights = weights.weights_for(variants);
    if variant_weights.iter().sum::<f64>() <= 0.0 {
        return random_element(variants, rng).cloned();
    }
    let indexed: Vec<(usize, f64)> = variant_weights.into_iter().enumerate().collect();
    weighted_choice(&indexed, rng).map(|i| variants[i].clone())
}

/// Two distinct recordings, each uniformly drawn; the second excludes the first.
pub fn pick_two_recordings<'a, R: Rng + ?Sized>(
    recordings: &'a [SourceRecording],
    rng: &mut R,
) -> Option<(&'a SourceRecording, &'a SourceRecording)> {
    if recordings.len() < 2 {
        return None;
    }
    let first = random_element(recordings, rng)?;
    let rest: Vec<&SourceRecording> = recordings.iter().filter(|r| r.id != first.id).collect();
    let second = random_element(&rest, rng)?;
    Some((first, *second))
}
