//! Seed-and-expand alignment search.
//!
//! Every minimum-cost pair of the filtered PDG-cost map seeds one search.
//! Around a seed, spheres of growing radius are mapped against each other:
//! the surviving pairs are sorted by cost, grouped into (vertex, cost)
//! buckets, and every partial alignment is extended through the buckets in
//! order, branching only within ties. The search stops at the first radius
//! where either sphere is empty.

use ahash::AHashSet;
use log::trace;
use ndarray::Array2;
use ordered_float::OrderedFloat;
use petgraph::graph::UnGraph;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::AlignError;
use crate::graph::{distance_map, sphere_at};
use crate::sparse::CostMatrix;
use crate::types::{Alignment, VertexPair};

/// Tuning parameters of the alignment pipeline.
#[derive(Debug, Clone)]
pub struct AlignerConfig {
    /// Weight of the signature distance in the pair cost (sigma, in [0, 1]).
    pub signature_similarity_contribution: f64,
    /// Weight of the pair cost in the blended PDG cost (alpha, in [0, 1]).
    pub original_cost_contribution: f64,
    /// Branching guard: at most this many alignments are enumerated per seed.
    pub max_alignments_per_seed: usize,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            signature_similarity_contribution: 0.8,
            original_cost_contribution: 0.6,
            max_alignments_per_seed: 1024,
        }
    }
}

impl AlignerConfig {
    pub(crate) fn validate(&self) -> Result<(), AlignError> {
        if !(0.0..=1.0).contains(&self.signature_similarity_contribution) {
            return Err(AlignError::ParameterRange {
                name: "signature_similarity_contribution",
                value: self.signature_similarity_contribution,
            });
        }
        if !(0.0..=1.0).contains(&self.original_cost_contribution) {
            return Err(AlignError::ParameterRange {
                name: "original_cost_contribution",
                value: self.original_cost_contribution,
            });
        }
        Ok(())
    }
}

/// One tie group of the sphere map: every surviving pair of a single
/// left vertex at a single cost tier.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bucket {
    pub(crate) vertex: usize,
    pub(crate) cost: f64,
    pub(crate) pairs: Vec<VertexPair>,
}

/// Map two spheres against each other: keep the pairs present in the
/// filtered cost map, sort ascending by (cost, u, v), and group runs of
/// equal (u, cost) into buckets.
pub(crate) fn map_spheres(
    left_sphere: &[usize],
    right_sphere: &[usize],
    costs: &CostMatrix,
) -> Vec<Bucket> {
    let mut entries: Vec<(OrderedFloat<f64>, usize, usize)> = Vec::new();
    for &u in left_sphere {
        for &v in right_sphere {
            if let Some(cost) = costs.get(u, v) {
                entries.push((OrderedFloat(cost), u, v));
            }
        }
    }
    entries.sort_unstable();

    let mut buckets: Vec<Bucket> = Vec::new();
    for (cost, u, v) in entries {
        match buckets.last_mut() {
            Some(bucket) if bucket.vertex == u && OrderedFloat(bucket.cost) == cost => {
                bucket.pairs.push((u, v));
            }
            _ => buckets.push(Bucket {
                vertex: u,
                cost: cost.0,
                pairs: vec![(u, v)],
            }),
        }
    }
    buckets
}

/// Depth-first extension of one partial alignment through the buckets.
///
/// A bucket whose candidates are all consumed is skipped; otherwise every
/// candidate opens a branch. Completed extensions are recorded once.
#[allow(clippy::too_many_arguments)]
fn extend_alignment(
    buckets: &[Bucket],
    depth: usize,
    pairs: &mut Vec<VertexPair>,
    used_left: &mut AHashSet<usize>,
    used_right: &mut AHashSet<usize>,
    cap: usize,
    seen: &mut AHashSet<Vec<VertexPair>>,
    out: &mut Vec<Alignment>,
) {
    if out.len() >= cap {
        return;
    }
    let Some(bucket) = buckets.get(depth) else {
        if seen.insert(pairs.clone()) {
            out.push(Alignment::from_pairs(pairs.clone()));
        }
        return;
    };

    let candidates: Vec<VertexPair> = if used_left.contains(&bucket.vertex) {
        Vec::new()
    } else {
        bucket
            .pairs
            .iter()
            .copied()
            .filter(|&(_, v)| !used_right.contains(&v))
            .collect()
    };

    if candidates.is_empty() {
        extend_alignment(
            buckets,
            depth + 1,
            pairs,
            used_left,
            used_right,
            cap,
            seen,
            out,
        );
        return;
    }

    for (u, v) in candidates {
        pairs.push((u, v));
        used_left.insert(u);
        used_right.insert(v);
        extend_alignment(
            buckets,
            depth + 1,
            pairs,
            used_left,
            used_right,
            cap,
            seen,
            out,
        );
        pairs.pop();
        used_left.remove(&u);
        used_right.remove(&v);
        if out.len() >= cap {
            break;
        }
    }
}

/// Drop extensions that fell short of the round's longest: a branch whose
/// buckets were consumed by earlier picks must not shorten the seed's
/// alignments, which all span the same sphere levels.
fn retain_longest(alignments: &mut Vec<Alignment>) {
    if let Some(longest) = alignments.iter().map(Alignment::len).max() {
        alignments.retain(|alignment| alignment.len() == longest);
    }
}

/// Grow one seed outward in concentric spheres until either side runs dry.
fn expand_seed(
    seed: VertexPair,
    left: &UnGraph<(), ()>,
    right: &UnGraph<(), ()>,
    costs: &CostMatrix,
    cap: usize,
) -> Vec<Alignment> {
    let left_distances = distance_map(left, seed.0);
    let right_distances = distance_map(right, seed.1);

    let mut alignments = vec![Alignment::seeded(seed)];
    let mut radius = 1;
    loop {
        let left_sphere = sphere_at(&left_distances, seed.0, radius);
        let right_sphere = sphere_at(&right_distances, seed.1, radius);
        if left_sphere.is_empty() || right_sphere.is_empty() {
            break;
        }

        let buckets = map_spheres(&left_sphere, &right_sphere, costs);
        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        for alignment in &alignments {
            let mut pairs = alignment.pairs().to_vec();
            let mut used_left: AHashSet<usize> = pairs.iter().map(|&(u, _)| u).collect();
            let mut used_right: AHashSet<usize> = pairs.iter().map(|&(_, v)| v).collect();
            extend_alignment(
                &buckets,
                0,
                &mut pairs,
                &mut used_left,
                &mut used_right,
                cap,
                &mut seen,
                &mut out,
            );
        }

        retain_longest(&mut out);
        trace!(
            "seed {:?}: radius {} spheres {}x{} -> {} alignment(s)",
            seed,
            radius,
            left_sphere.len(),
            right_sphere.len(),
            out.len()
        );
        alignments = out;
        radius += 1;
    }
    alignments
}

/// Expand every seed in parallel; output order follows the seed order.
pub(crate) fn align_all(
    seeds: &[VertexPair],
    seed_cost: f64,
    left: &UnGraph<(), ()>,
    right: &UnGraph<(), ()>,
    costs: &CostMatrix,
    config: &AlignerConfig,
) -> Vec<SeedAlignments> {
    seeds
        .par_iter()
        .map(|&seed| SeedAlignments {
            seed,
            cost: seed_cost,
            alignments: expand_seed(seed, left, right, costs, config.max_alignments_per_seed),
        })
        .collect()
}

/// All alignments grown from one seed.
#[derive(Debug, Clone, Serialize)]
pub struct SeedAlignments {
    pub seed: VertexPair,
    pub cost: f64,
    pub alignments: Vec<Alignment>,
}

/// Immutable record of a full alignment run: both cost maps plus every
/// per-seed alignment, with seeds in ascending index order.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pair_cost: Array2<f64>,
    pdg_cost: CostMatrix,
    alignments: Vec<SeedAlignments>,
}

impl MatchResult {
    pub(crate) fn new(
        pair_cost: Array2<f64>,
        pdg_cost: CostMatrix,
        alignments: Vec<SeedAlignments>,
    ) -> Self {
        Self {
            pair_cost,
            pdg_cost,
            alignments,
        }
    }

    /// The dense pair-cost matrix over V1 x V2.
    pub fn pair_cost(&self) -> &Array2<f64> {
        &self.pair_cost
    }

    /// The filtered PDG-cost map.
    pub fn pdg_cost(&self) -> &CostMatrix {
        &self.pdg_cost
    }

    pub fn seed_alignments(&self) -> &[SeedAlignments] {
        &self.alignments
    }

    pub fn seed_pairs(&self) -> Vec<VertexPair> {
        self.alignments.iter().map(|s| s.seed).collect()
    }

    pub fn alignments_for(&self, seed: VertexPair) -> Option<&[Alignment]> {
        self.alignments
            .iter()
            .find(|s| s.seed == seed)
            .map(|s| s.alignments.as_slice())
    }

    /// Render seeds and alignments as JSON for downstream reporting.
    pub fn to_json(&self) -> String {
        serde_json::json!({ "seeds": &self.alignments }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost_matrix(rows: usize, cols: usize, entries: &[(usize, usize, f64)]) -> CostMatrix {
        CostMatrix::from_entries(rows, cols, entries)
    }

    #[test]
    fn sphere_map_sorts_and_groups_by_vertex_and_cost() {
        let costs = cost_matrix(
            3,
            3,
            &[(1, 1, 0.5), (1, 2, 0.5), (2, 1, 0.1), (2, 2, 0.9)],
        );
        let buckets = map_spheres(&[1, 2], &[1, 2], &costs);

        assert_eq!(buckets.len(), 3);
        assert_eq!((buckets[0].vertex, buckets[0].cost), (2, 0.1));
        assert_eq!(buckets[0].pairs, vec![(2, 1)]);
        assert_eq!((buckets[1].vertex, buckets[1].cost), (1, 0.5));
        assert_eq!(buckets[1].pairs, vec![(1, 1), (1, 2)]);
        assert_eq!((buckets[2].vertex, buckets[2].cost), (2, 0.9));
    }

    #[test]
    fn sphere_map_skips_filtered_pairs() {
        let costs = cost_matrix(2, 2, &[(1, 1, 0.3)]);
        let buckets = map_spheres(&[0, 1], &[0, 1], &costs);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].pairs, vec![(1, 1)]);
    }

    #[test]
    fn tied_bucket_branches_once_per_candidate() {
        // Two left vertices, two right vertices, all four pairs tied.
        let costs = cost_matrix(
            3,
            3,
            &[(1, 1, 0.0), (1, 2, 0.0), (2, 1, 0.0), (2, 2, 0.0)],
        );
        let buckets = map_spheres(&[1, 2], &[1, 2], &costs);

        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        let mut pairs = vec![(0, 0)];
        let mut used_left: AHashSet<usize> = [0].into_iter().collect();
        let mut used_right: AHashSet<usize> = [0].into_iter().collect();
        extend_alignment(
            &buckets,
            0,
            &mut pairs,
            &mut used_left,
            &mut used_right,
            usize::MAX,
            &mut seen,
            &mut out,
        );

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].pairs(), &[(0, 0), (1, 1), (2, 2)]);
        assert_eq!(out[1].pairs(), &[(0, 0), (1, 2), (2, 1)]);
    }

    #[test]
    fn unique_candidates_extend_deterministically() {
        let costs = cost_matrix(2, 2, &[(1, 1, 0.2)]);
        let buckets = map_spheres(&[1], &[1], &costs);

        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        let mut pairs = vec![(0, 0)];
        let mut used_left: AHashSet<usize> = [0].into_iter().collect();
        let mut used_right: AHashSet<usize> = [0].into_iter().collect();
        extend_alignment(
            &buckets,
            0,
            &mut pairs,
            &mut used_left,
            &mut used_right,
            usize::MAX,
            &mut seen,
            &mut out,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pairs(), &[(0, 0), (1, 1)]);
    }

    #[test]
    fn consumed_buckets_are_skipped() {
        // The only candidate of the second bucket reuses the right vertex
        // taken by the first, so the branch records a shorter extension.
        let costs = cost_matrix(3, 2, &[(1, 1, 0.1), (2, 1, 0.4)]);
        let buckets = map_spheres(&[1, 2], &[1], &costs);

        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        let mut pairs = vec![(0, 0)];
        let mut used_left: AHashSet<usize> = [0].into_iter().collect();
        let mut used_right: AHashSet<usize> = [0].into_iter().collect();
        extend_alignment(
            &buckets,
            0,
            &mut pairs,
            &mut used_left,
            &mut used_right,
            usize::MAX,
            &mut seen,
            &mut out,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pairs(), &[(0, 0), (1, 1)]);
    }

    #[test]
    fn short_branches_are_discarded_for_a_seed() {
        // Vertex 2 can only match vertex 1: the branch that takes (1, 1)
        // blocks it and ends one pair short of its sibling. Only the
        // longest extensions of a round survive.
        let costs = cost_matrix(3, 3, &[(1, 1, 0.0), (1, 2, 0.0), (2, 1, 0.0)]);
        let buckets = map_spheres(&[1, 2], &[1, 2], &costs);

        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        let mut pairs = vec![(0, 0)];
        let mut used_left: AHashSet<usize> = [0].into_iter().collect();
        let mut used_right: AHashSet<usize> = [0].into_iter().collect();
        extend_alignment(
            &buckets,
            0,
            &mut pairs,
            &mut used_left,
            &mut used_right,
            usize::MAX,
            &mut seen,
            &mut out,
        );

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].pairs(), &[(0, 0), (1, 1)]);
        assert_eq!(out[1].pairs(), &[(0, 0), (1, 2), (2, 1)]);

        retain_longest(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pairs(), &[(0, 0), (1, 2), (2, 1)]);
    }

    #[test]
    fn branching_respects_the_cap() {
        let costs = cost_matrix(
            2,
            4,
            &[(1, 0, 0.0), (1, 1, 0.0), (1, 2, 0.0), (1, 3, 0.0)],
        );
        let buckets = map_spheres(&[1], &[0, 1, 2, 3], &costs);

        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        let mut pairs = Vec::new();
        let mut used_left = AHashSet::new();
        let mut used_right = AHashSet::new();
        extend_alignment(
            &buckets,
            0,
            &mut pairs,
            &mut used_left,
            &mut used_right,
            2,
            &mut seen,
            &mut out,
        );

        assert_eq!(out.len(), 2);
    }

    #[test]
    fn config_validates_parameter_ranges() {
        let mut config = AlignerConfig::default();
        assert!(config.validate().is_ok());

        config.signature_similarity_contribution = 1.5;
        assert!(config.validate().is_err());

        config.signature_similarity_contribution = 0.8;
        config.original_cost_contribution = -0.1;
        assert!(config.validate().is_err());

        config.original_cost_contribution = f64::NAN;
        assert!(config.validate().is_err());
    }
}
