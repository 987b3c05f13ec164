//! Vertex penalties and the pair / PDG cost pipeline.
//!
//! Costs flow in two stages: a dense pair-cost matrix over V1 x V2
//! (type penalty blended with signature distance), then a PDG cost that
//! folds each pair with the best one-to-one matching of its two
//! neighborhoods and filters out pairs past the sentinel-derived
//! threshold.

use ndarray::Array2;
use pathfinding::kuhn_munkres::{kuhn_munkres_min, Weights};
use rayon::prelude::*;

use crate::graph::PdGraph;
use crate::signature::signature_distance;
use crate::types::{PdgVertex, VertexSubtype, VertexType};

/// Sentinel cost rendering a pair effectively non-alignable.
pub const MAX_PENALTY: f64 = 999_999.0;

/// Unit penalty for soft mismatches.
pub const PENALTY_CONSTANT: f64 = 1.0;

/// Fixed-point scale when handing f64 costs to the assignment solver.
const WEIGHT_SCALE: f64 = 1_000_000.0;

/// PDG costs at or above this bound are dropped from the filtered map.
pub fn filter_threshold(alpha: f64) -> f64 {
    (1.0 - alpha) * MAX_PENALTY
}

/// Structural mismatch penalty between two vertices.
///
/// Accumulates: the hard class-value sentinel, the softened DECL/ASSIGN
/// case, a quadratic charge for one-sided subtype excess, and the
/// all-pairs accounting of mismatched subtypes.
pub fn vertex_penalty(v1: &PdgVertex, v2: &PdgVertex) -> f64 {
    let mut penalty = 0.0;

    let (t1, t2) = (v1.vertex_type(), v2.vertex_type());
    if t1.class_value() != t2.class_value() {
        penalty += MAX_PENALTY;
    } else if matches!(
        (t1, t2),
        (VertexType::Decl, VertexType::Assign) | (VertexType::Assign, VertexType::Decl)
    ) {
        // Declarations with initializers and assignments are often interchangeable.
        penalty += PENALTY_CONSTANT;
    }

    let only_v1: Vec<VertexSubtype> = v1
        .subtypes()
        .difference(v2.subtypes())
        .copied()
        .collect();
    let only_v2: Vec<VertexSubtype> = v2
        .subtypes()
        .difference(v1.subtypes())
        .copied()
        .collect();

    if only_v1.is_empty() || only_v2.is_empty() {
        let excess = only_v1.len().max(only_v2.len());
        penalty += (excess * excess) as f64 * PENALTY_CONSTANT;
    }
    for &a in &only_v1 {
        for &b in &only_v2 {
            penalty += a.pair_penalty(b);
        }
    }

    penalty
}

/// Blended cost of aligning one vertex pair.
///
/// Penalties that reach [`MAX_PENALTY`] saturate the result instead of
/// being weighted down: hard mismatches stay past the filter threshold
/// no matter how the contributions are tuned.
pub fn pair_cost(
    v1: &PdgVertex,
    v2: &PdgVertex,
    sig1: &[u64],
    sig2: &[u64],
    weights: &[f64],
    sigma: f64,
) -> f64 {
    let penalty = vertex_penalty(v1, v2);
    if penalty >= MAX_PENALTY {
        return MAX_PENALTY;
    }
    (1.0 - sigma) * penalty + sigma * signature_distance(sig1, sig2, weights)
}

/// Materialize the dense pair-cost matrix, one row per original vertex.
pub(crate) fn pair_cost_matrix(
    original: &PdGraph,
    suspect: &PdGraph,
    sigs1: &[Vec<u64>],
    sigs2: &[Vec<u64>],
    weights: &[f64],
    sigma: f64,
) -> Array2<f64> {
    let (n1, n2) = (original.vertex_count(), suspect.vertex_count());
    let left: Vec<&PdgVertex> = original.vertices().map(|(_, v)| v).collect();
    let right: Vec<&PdgVertex> = suspect.vertices().map(|(_, v)| v).collect();

    let costs: Vec<f64> = (0..n1)
        .into_par_iter()
        .flat_map_iter(|i| {
            let (left, right) = (&left, &right);
            (0..n2).map(move |j| {
                pair_cost(left[i], right[j], &sigs1[i], &sigs2[j], weights, sigma)
            })
        })
        .collect();

    Array2::from_shape_vec((n1, n2), costs).unwrap()
}

/// Plain matrix wrapper feeding the assignment solver.
struct NeighborWeights(Vec<Vec<i64>>);

impl Weights<i64> for NeighborWeights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |row| row.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        NeighborWeights(
            self.0
                .iter()
                .map(|row| row.iter().map(|&w| w.saturating_neg()).collect())
                .collect(),
        )
    }
}

/// Mean pair cost over the best one-to-one matching of the two
/// neighborhoods; the smaller side is matched completely. Falls back to
/// `fallback` when either side has no neighbors.
pub(crate) fn neighborhood_cost(
    pair: &Array2<f64>,
    left: &[usize],
    right: &[usize],
    fallback: f64,
) -> f64 {
    if left.is_empty() || right.is_empty() {
        return fallback;
    }

    // The solver wants rows <= columns.
    let transposed = left.len() > right.len();
    let (rows, cols) = if transposed {
        (right, left)
    } else {
        (left, right)
    };

    let matrix: Vec<Vec<i64>> = rows
        .iter()
        .map(|&r| {
            cols.iter()
                .map(|&c| {
                    let cost = if transposed { pair[[c, r]] } else { pair[[r, c]] };
                    (cost * WEIGHT_SCALE) as i64
                })
                .collect()
        })
        .collect();

    let (total, _assignment) = kuhn_munkres_min(&NeighborWeights(matrix));
    total as f64 / WEIGHT_SCALE / rows.len() as f64
}

/// Blend every pair cost with its neighborhood cost and keep the pairs
/// below the filter threshold, as sparse (row, col, cost) entries.
pub(crate) fn pdg_cost_entries(
    pair: &Array2<f64>,
    neighbors1: &[Vec<usize>],
    neighbors2: &[Vec<usize>],
    alpha: f64,
) -> Vec<(usize, usize, f64)> {
    let threshold = filter_threshold(alpha);
    let (n1, n2) = pair.dim();

    (0..n1)
        .into_par_iter()
        .flat_map_iter(|i| {
            (0..n2).filter_map(move |j| {
                let local = pair[[i, j]];
                // The neighborhood term is non-negative, so this pair can
                // never come back under the threshold.
                if alpha * local >= threshold {
                    return None;
                }
                let neighborhood = neighborhood_cost(pair, &neighbors1[i], &neighbors2[j], local);
                let blended = alpha * local + (1.0 - alpha) * neighborhood;
                (blended < threshold).then_some((i, j, blended))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PdgVertex, VertexSubtype, VertexType};
    use ndarray::array;

    fn decl() -> PdgVertex {
        PdgVertex::new(VertexType::Decl)
    }

    #[test]
    fn penalty_is_symmetric() {
        let a = PdgVertex::with_subtypes(
            VertexType::Ctrl,
            [VertexSubtype::HasCondition, VertexSubtype::HasElseBranch],
        );
        let b = PdgVertex::with_subtypes(VertexType::Ctrl, [VertexSubtype::LoopHeader]);
        assert_eq!(vertex_penalty(&a, &b), vertex_penalty(&b, &a));
    }

    #[test]
    fn penalty_of_identical_vertices_is_zero() {
        let v = PdgVertex::with_subtypes(VertexType::Call, [VertexSubtype::HasArguments]);
        assert_eq!(vertex_penalty(&v, &v), 0.0);
    }

    #[test]
    fn class_mismatch_dominates() {
        let call = PdgVertex::new(VertexType::Call);
        assert!(vertex_penalty(&decl(), &call) >= MAX_PENALTY);
    }

    #[test]
    fn decl_assign_pair_is_softened() {
        let assign = PdgVertex::new(VertexType::Assign);
        assert_eq!(vertex_penalty(&decl(), &assign), PENALTY_CONSTANT);
        assert_eq!(vertex_penalty(&assign, &decl()), PENALTY_CONSTANT);
    }

    #[test]
    fn one_sided_subtype_excess_is_quadratic() {
        let rich = PdgVertex::with_subtypes(
            VertexType::Ctrl,
            [VertexSubtype::HasCondition, VertexSubtype::HasElseBranch],
        );
        let bare = PdgVertex::new(VertexType::Ctrl);
        assert_eq!(vertex_penalty(&rich, &bare), 4.0 * PENALTY_CONSTANT);
    }

    #[test]
    fn two_sided_subtype_mismatch_sums_pair_penalties() {
        let a = PdgVertex::with_subtypes(VertexType::Ctrl, [VertexSubtype::HasCondition]);
        let b = PdgVertex::with_subtypes(VertexType::Ctrl, [VertexSubtype::LoopHeader]);
        let expected = VertexSubtype::HasCondition.pair_penalty(VertexSubtype::LoopHeader);
        assert_eq!(vertex_penalty(&a, &b), expected);
    }

    #[test]
    fn pair_cost_saturates_on_hard_mismatch() {
        let call = PdgVertex::new(VertexType::Call);
        let sig = vec![1u64, 2];
        let weights = vec![1.0, 1.0];
        let cost = pair_cost(&decl(), &call, &sig, &sig, &weights, 0.8);
        assert_eq!(cost, MAX_PENALTY);
    }

    #[test]
    fn pair_cost_is_monotone_in_sigma_when_signatures_dominate() {
        // Identical vertices, differing signatures: penalty 0, distance > 0.
        let v = decl();
        let a = vec![0u64];
        let b = vec![50u64];
        let weights = vec![1.0];

        let low = pair_cost(&v, &v, &a, &b, &weights, 0.2);
        let high = pair_cost(&v, &v, &a, &b, &weights, 0.9);
        assert!(high > low);
    }

    #[test]
    fn pair_cost_degenerates_at_the_parameter_ends() {
        let assign = PdgVertex::new(VertexType::Assign);
        let a = vec![3u64];
        let b = vec![9u64];
        let weights = vec![1.0];

        let penalty_only = pair_cost(&decl(), &assign, &a, &b, &weights, 0.0);
        assert_eq!(penalty_only, vertex_penalty(&decl(), &assign));

        let signature_only = pair_cost(&decl(), &assign, &a, &b, &weights, 1.0);
        assert_eq!(signature_only, signature_distance(&a, &b, &weights));
    }

    #[test]
    fn neighborhood_cost_uses_the_best_matching() {
        // Cross pairs cost 10, straight pairs cost 1: the assignment picks
        // the straight ones, where an all-pairs average would see 5.5.
        let pair = array![[1.0, 10.0], [10.0, 1.0]];
        let cost = neighborhood_cost(&pair, &[0, 1], &[0, 1], 99.0);
        assert!((cost - 1.0).abs() < 1e-9);
    }

    #[test]
    fn neighborhood_cost_matches_the_smaller_side() {
        let pair = array![[5.0, 1.0, 3.0]];
        // One left neighbor, three right neighbors: mean over one matched pair.
        let cost = neighborhood_cost(&pair, &[0], &[0, 1, 2], 99.0);
        assert!((cost - 1.0).abs() < 1e-9);

        // Transposed shape takes the same path.
        let pair_t = array![[5.0], [1.0], [3.0]];
        let cost_t = neighborhood_cost(&pair_t, &[0, 1, 2], &[0], 99.0);
        assert!((cost_t - 1.0).abs() < 1e-9);
    }

    #[test]
    fn neighborhood_cost_falls_back_when_empty() {
        let pair = array![[2.0]];
        assert_eq!(neighborhood_cost(&pair, &[], &[0], 7.5), 7.5);
        assert_eq!(neighborhood_cost(&pair, &[0], &[], 7.5), 7.5);
    }

    #[test]
    fn pdg_entries_drop_saturated_pairs() {
        // One feasible pair, one saturated pair, no neighbors.
        let pair = array![[0.25, MAX_PENALTY]];
        let neighbors1 = vec![vec![]];
        let neighbors2 = vec![vec![], vec![]];

        let entries = pdg_cost_entries(&pair, &neighbors1, &neighbors2, 0.6);
        assert_eq!(entries.len(), 1);
        let (i, j, cost) = entries[0];
        assert_eq!((i, j), (0, 0));
        assert!((cost - 0.25).abs() < 1e-9);
    }
}
