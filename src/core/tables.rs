//! Precomputed mutation tables.
//!
//! Mutation accumulation draws the number of new mutations per particle and
//! generation from a Poisson distribution with mean `2u` (both segments
//! combined). The per-count probabilities and the redistribution of each
//! count over the two segments only depend on `u`, `kmax` and `mutcap`, so
//! both are computed once at startup and shared read-only by all replicates.

use std::cmp::min;

/// Poisson probability mass `P(Poi(lambda) = count)`.
pub fn poisson_pmf(lambda: f64, count: usize) -> f64 {
    lambda.powi(count as i32) * (-lambda).exp() / factorial(count)
}

fn factorial(count: usize) -> f64 {
    (1..=count).map(|value| value as f64).product()
}

/// Mutation count probabilities and the two-segment transition matrix.
///
/// The transition matrix maps a source class `(j, k)` onto all destination
/// classes `(j + l2, k + l3)` reachable within the per-segment cap. It is
/// sparse and upper triangular in the flattened class index, so it is stored
/// as one list of `(destination, weight)` pairs per source class; the
/// diagonal pair carries the probability of acquiring no mutation at all.
/// Weights of each row sum to one, which makes the mutation kernel mass
/// preserving by construction.
pub struct MutationTables {
    kmax: usize,
    factors: Vec<f64>,
    transitions: Vec<Vec<(usize, f64)>>,
}

impl MutationTables {
    pub fn new(u: f64, kmax: usize, mutcap: usize) -> Self {
        let factors: Vec<f64> = (0..=2 * kmax)
            .map(|count| poisson_pmf(2.0 * u, count))
            .collect();
        let transitions = build_transitions(&factors, kmax, mutcap);
        Self {
            kmax,
            factors,
            transitions,
        }
    }

    pub fn kmax(&self) -> usize {
        self.kmax
    }

    /// Probability of acquiring `count` new mutations in one generation.
    pub fn factor(&self, count: usize) -> f64 {
        self.factors[count]
    }

    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    /// Flattened class index of a two-segment mutation class.
    pub fn class_index(&self, j: usize, k: usize) -> usize {
        (self.kmax + 1) * j + k
    }

    /// Transition row of a source class: `(destination, weight)` pairs.
    pub fn transitions(&self, source: usize) -> &[(usize, f64)] {
        &self.transitions[source]
    }
}

/// Build the per-class transition rows.
///
/// The `l` new mutations of a class `(j, k)` are split as `(l2, l3)` over
/// the two segments, uniformly over the pairs that respect the per-segment
/// cap. The uniform divisor depends on which caps are reachable:
/// `l + 1` pairs when neither cap binds, `kmax - max(j, k) + 1` when
/// exactly one does, and `2 kmax - j - k - l + 1` when both do. The divisor
/// is at least one whenever `l <= 2 kmax - j - k`, so every row distributes
/// its off-diagonal mass completely.
fn build_transitions(factors: &[f64], kmax: usize, mutcap: usize) -> Vec<Vec<(usize, f64)>> {
    let width = kmax + 1;
    let mut rows = Vec::with_capacity(width * width);
    for j in 0..=kmax {
        for k in 0..=kmax {
            let cap = min(mutcap, 2 * kmax - j - k);
            let stay = 1.0 - factors[1..=cap].iter().sum::<f64>();
            let mut row = vec![(width * j + k, stay)];
            for l in 1..=cap {
                let divisor = if l <= kmax - j && l <= kmax - k {
                    (l + 1) as f64
                } else if l <= kmax - j || l <= kmax - k {
                    (kmax - j.max(k) + 1) as f64
                } else {
                    (2 * kmax - j - k - l + 1) as f64
                };
                for l2 in 0..=l {
                    let l3 = l - l2;
                    if j + l2 > kmax || k + l3 > kmax {
                        continue;
                    }
                    row.push((width * (j + l2) + k + l3, factors[l] / divisor));
                }
            }
            rows.push(row);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pmf_values() {
        assert!((poisson_pmf(2.0, 0) - (-2.0f64).exp()).abs() < 1e-12);
        assert!((poisson_pmf(2.0, 1) - 2.0 * (-2.0f64).exp()).abs() < 1e-12);
        assert!((poisson_pmf(0.0, 0) - 1.0).abs() < 1e-12);
        assert_eq!(poisson_pmf(0.0, 3), 0.0);
    }

    #[test]
    fn pmf_normalisation() {
        // the table spans [0, 2 kmax]; for u <= 1 the truncated tail is
        // negligible
        for u in [0.0, 0.3, 1.0] {
            let tables = MutationTables::new(u, 10, 20);
            let total: f64 = tables.factors().iter().sum();
            assert!((total - 1.0).abs() < 1e-6, "u={} total={}", u, total);
        }
    }

    #[test]
    fn identity_without_mutation() {
        let tables = MutationTables::new(0.0, 4, 8);
        assert_eq!(tables.factor(0), 1.0);
        for count in 1..=8 {
            assert_eq!(tables.factor(count), 0.0);
        }
        for source in 0..25 {
            let row = tables.transitions(source);
            assert_eq!(row[0], (source, 1.0));
            for &(_, weight) in &row[1..] {
                assert_eq!(weight, 0.0);
            }
        }
    }

    #[test]
    fn rows_conserve_mass() {
        let tables = MutationTables::new(0.4, 3, 6);
        for source in 0..16 {
            let total: f64 = tables
                .transitions(source)
                .iter()
                .map(|&(_, weight)| weight)
                .sum();
            assert!((total - 1.0).abs() < 1e-12, "source={} total={}", source, total);
        }
    }

    #[test]
    fn targets_respect_caps() {
        let kmax = 3;
        let tables = MutationTables::new(2.0, kmax, 2 * kmax);
        for j in 0..=kmax {
            for k in 0..=kmax {
                for &(target, _) in tables.transitions(tables.class_index(j, k)) {
                    let tj = target / (kmax + 1);
                    let tk = target % (kmax + 1);
                    assert!(tj <= kmax && tk <= kmax);
                    assert!(tj >= j && tk >= k);
                }
            }
        }
    }

    #[test]
    fn both_caps_binding() {
        // kmax = 1: two new mutations from (0, 0) can only land on (1, 1)
        let tables = MutationTables::new(0.3, 1, 2);
        let row = tables.transitions(tables.class_index(0, 0));
        let weight = row
            .iter()
            .find(|&&(target, _)| target == tables.class_index(1, 1))
            .map(|&(_, weight)| weight)
            .unwrap();
        assert!((weight - tables.factor(2)).abs() < 1e-12);
    }

    #[test]
    fn mutcap_truncates_rows() {
        let tables = MutationTables::new(0.5, 4, 1);
        let row = tables.transitions(tables.class_index(0, 0));
        // stay weight plus the two single-mutation splits
        assert_eq!(row.len(), 3);
        assert!((row[0].1 - (1.0 - tables.factor(1))).abs() < 1e-12);
    }
}
