//! PDG alignment core: structural similarity between program dependence graphs.
//!
//! Measures how closely a "suspect" program's dependence graph aligns with
//! an "original" one, for clone and plagiarism detection. The pipeline is a
//! modified GRAAL-style alignment:
//! - Pair costs: vertex-type penalties blended with graphlet signature
//!   distances over every vertex pair
//! - PDG costs: each pair folded with the best one-to-one matching of its
//!   neighborhoods, then filtered past a sentinel threshold
//! - Seed-and-expand search: every minimum-cost pair grows outward in
//!   concentric spheres, enumerating all minimum-cost extensions
//!
//! Graph construction, the orbit counter, and result rendering live with
//! the callers; this crate only consumes their contracts.

use log::{debug, info};

pub mod aligner;
pub mod cost;
pub mod error;
pub mod graph;
pub mod signature;
pub mod sparse;
pub mod types;

pub use aligner::{AlignerConfig, MatchResult, SeedAlignments};
pub use cost::{filter_threshold, pair_cost, vertex_penalty, MAX_PENALTY, PENALTY_CONSTANT};
pub use error::{AlignError, Side};
pub use graph::{sphere, PdGraph, PdgStats};
pub use signature::{
    signature_distance, SignatureProvider, UniformSignatureProvider, ORBIT_COUNT,
};
pub use sparse::CostMatrix;
pub use types::{Alignment, PdgVertex, VertexPair, VertexSubtype, VertexType};

/// Align `suspect` against `original` and return every cost map and every
/// per-seed alignment.
///
/// Pure in its inputs: the same graphs, provider, and configuration always
/// produce the same result. Fails fast on empty graphs, provider contract
/// violations, and out-of-range parameters; after validation the algorithm
/// is total.
pub fn execute(
    original: &PdGraph,
    suspect: &PdGraph,
    signatures: &dyn SignatureProvider,
    config: &AlignerConfig,
) -> Result<MatchResult, AlignError> {
    config.validate()?;
    if original.vertex_count() == 0 {
        return Err(AlignError::EmptyGraph {
            side: Side::Original,
        });
    }
    if suspect.vertex_count() == 0 {
        return Err(AlignError::EmptyGraph {
            side: Side::Suspect,
        });
    }

    let left = original.undirected_without_loops();
    let right = suspect.undirected_without_loops();

    // One provider call per graph; vectors are cacheable on their side.
    let left_signatures = signatures.signatures(&left);
    let right_signatures = signatures.signatures(&right);
    let signature_len = signature::validate_signatures(
        &left_signatures,
        original.vertex_count(),
        Side::Original,
        None,
    )?;
    signature::validate_signatures(
        &right_signatures,
        suspect.vertex_count(),
        Side::Suspect,
        Some(signature_len),
    )?;
    let orbit_weights = signature::resolve_weights(signatures.orbit_weights(), signature_len)?;

    let sigma = config.signature_similarity_contribution;
    let alpha = config.original_cost_contribution;
    info!(
        "aligning {}x{} vertices (sigma={}, alpha={})",
        original.vertex_count(),
        suspect.vertex_count(),
        sigma,
        alpha
    );

    let pair_costs = cost::pair_cost_matrix(
        original,
        suspect,
        &left_signatures,
        &right_signatures,
        &orbit_weights,
        sigma,
    );

    let left_neighbors = graph::neighbor_lists(&left);
    let right_neighbors = graph::neighbor_lists(&right);
    let entries = cost::pdg_cost_entries(&pair_costs, &left_neighbors, &right_neighbors, alpha);
    let pdg_costs = CostMatrix::from_entries(
        original.vertex_count(),
        suspect.vertex_count(),
        &entries,
    );
    debug!(
        "filtered pdg-cost map keeps {} of {} pairs",
        pdg_costs.entry_count(),
        original.vertex_count() * suspect.vertex_count()
    );

    let seeds = pdg_costs.min_entries();
    let seed_alignments = match pdg_costs.minimum() {
        Some(minimum) => {
            debug!("{} seed(s) at cost {}", seeds.len(), minimum);
            aligner::align_all(&seeds, minimum, &left, &right, &pdg_costs, config)
        }
        None => Vec::new(),
    };

    Ok(MatchResult::new(pair_costs, pdg_costs, seed_alignments))
}
