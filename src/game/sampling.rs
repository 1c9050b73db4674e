//! Random selection primitives. Every function takes its random source as a
//! parameter so callers can pass a seeded generator.

use rand::Rng;

/// Weighted categorical draw.
///
/// Weights are normalized, a single uniform draw in `[0, 1)` is taken and the
/// first key whose cumulative probability reaches it wins. Keys with zero
/// weight are never picked unless every weight is zero, in which case (as
/// when rounding leaves nothing selected) the first key is returned.
///
/// Returns `None` only for an empty slice.
pub fn weighted_choice<K: Copy, R: Rng + ?Sized>(weights: &[(K, f64)], rng: &mut R) -> Option<K> {
    let (first, _) = weights.first()?;
    let total: f64 = weights.iter().map(|(_, w)| w.max(0.0)).sum();
    if !total.is_finite() || total <= 0.0 {
        return Some(*first);
    }

    let draw: f64 = rng.random();
    let mut cumulative = 0.0;
    for (key, weight) in weights {
        let weight = weight.max(0.0);
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight / total;
        if draw <= cumulative {
            return Some(*key);
        }
    }
    Some(*first)
}

/// Draws `count` distinct items, each draw weighted over what is left.
///
/// The picked item is swapped with the last active one and the active window
/// shrinks, so the caller's slices are never reordered. Returns an empty vec
/// when `count` exceeds the pool, when the slices differ in length, or when
/// the remaining weight runs out before `count` items were drawn.
pub fn weighted_sample_without_replacement<T: Clone, R: Rng + ?Sized>(
    items: &[T],
    weights: &[f64],
    count: usize,
    rng: &mut R,
) -> Vec<T> {
    if items.len() < count || weights.len() != items.len() {
        return Vec::new();
    }

    let mut pool: Vec<T> = items.to_vec();
    let mut w: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 })
        .collect();
    let mut n = pool.len();
    let mut result = Vec::with_capacity(count);

    for _ in 0..count {
        let total: f64 = w[..n].iter().sum();
        if total <= 0.0 {
            return Vec::new();
        }

        let mut r = rng.random::<f64>() * total;
        let mut picked = None;
        for j in 0..n {
            if w[j] <= 0.0 {
                continue;
            }
            r -= w[j];
            picked = Some(j);
            if r <= 0.0 {
                break;
            }
        }
        // Rounding can leave `r` a hair above zero; the last positive item wins.
        let Some(j) = picked else {
            return Vec::new();
        };

        result.push(pool[j].clone());
        pool.swap(j, n - 1);
        w.swap(j, n - 1);
        n -= 1;
    }
    result
}

/// Uniformly random element, `None` for an empty slice.
pub fn random_element<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.random_range(0..items.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    const DRAWS: usize = 20_000;

    #[test]
    fn weighted_choice_matches_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = [("a", 1.0), ("b", 3.0), ("c", 6.0)];

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..DRAWS {
            *counts
                .entry(weighted_choice(&weights, &mut rng).unwrap())
                .or_default() += 1;
        }

        for (key, weight) in weights {
            let observed = counts.get(key).copied().unwrap_or(0) as f64 / DRAWS as f64;
            let expected = weight / 10.0;
            assert!(
                (observed - expected).abs() < 0.02,
                "{}: observed {}, expected {}",
                key,
                observed,
                expected
            );
        }
    }

    #[test]
    fn weighted_choice_never_picks_zero_weight() {
        let mut rng = StdRng::seed_from_u64(1);
        let weights = [("zero", 0.0), ("one", 1.0)];
        for _ in 0..1_000 {
            assert_eq!(weighted_choice(&weights, &mut rng), Some("one"));
        }
    }

    #[test]
    fn weighted_choice_falls_back_to_first_key() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            weighted_choice(&[("x", 0.0), ("y", 0.0)], &mut rng),
            Some("x")
        );
        assert_eq!(
            weighted_choice(&[("x", f64::NAN), ("y", 0.0)], &mut rng),
            Some("x")
        );
        assert_eq!(weighted_choice::<&str, _>(&[], &mut rng), None);
    }

    #[test]
    fn without_replacement_never_duplicates() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = [1, 2, 3, 4, 5];
        let weights = [5.0, 1.0, 1.0, 0.5, 2.0];

        for count in 0..=items.len() {
            for _ in 0..500 {
                let drawn = weighted_sample_without_replacement(&items, &weights, count, &mut rng);
                assert_eq!(drawn.len(), count);
                let unique: HashSet<_> = drawn.iter().collect();
                assert_eq!(unique.len(), count);
            }
        }
    }

    #[test]
    fn without_replacement_rejects_impossible_requests() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(weighted_sample_without_replacement(&[1, 2], &[1.0, 1.0], 3, &mut rng).is_empty());
        assert!(weighted_sample_without_replacement(&[1, 2], &[1.0], 1, &mut rng).is_empty());
        // One positive weight cannot yield two items.
        assert!(weighted_sample_without_replacement(&[1, 2], &[1.0, 0.0], 2, &mut rng).is_empty());
    }

    #[test]
    fn without_replacement_first_draw_follows_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let items = ["heavy", "light"];
        let weights = [3.0, 1.0];

        let heavy_first = (0..DRAWS)
            .filter(|_| {
                weighted_sample_without_replacement(&items, &weights, 2, &mut rng)[0] == "heavy"
            })
            .count();
        let observed = heavy_first as f64 / DRAWS as f64;
        assert!((observed - 0.75).abs() < 0.02, "observed {}", observed);
    }

    #[test]
    fn random_element_covers_pool() {
        let mut rng = StdRng::seed_from_u64(9);
        let items = ["a", "b", "c"];
        let seen: HashSet<_> = (0..300)
            .map(|_| *random_element(&items, &mut rng).unwrap())
            .collect();
        assert_eq!(seen.len(), 3);
        assert!(random_element::<u8, _>(&[], &mut rng).is_none());
    }
}
