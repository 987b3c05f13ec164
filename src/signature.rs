//! Graphlet signature provider seam and the normalized orbit distance.
//!
//! The orbit counter itself is an external oracle: given an undirected
//! graph it returns one fixed-length vector of orbit counts per vertex.
//! This module only depends on that contract and turns two vectors into a
//! structural distance in [0, 1].

use petgraph::graph::UnGraph;

use crate::error::{AlignError, Side};

/// Conventional orbit count for graphlets on up to five nodes.
pub const ORBIT_COUNT: usize = 73;

/// External source of per-vertex graphlet signatures.
///
/// Implementations must be deterministic: the same undirected graph yields
/// the same vectors. Vectors are indexed by node index and are produced
/// once per graph per [`execute`](crate::execute) call. Providers must be
/// reentrant (`Sync`) so they can be shared with parallel cost passes.
pub trait SignatureProvider: Sync {
    /// One orbit-count vector per vertex of `graph`, indexed by node index.
    fn signatures(&self, graph: &UnGraph<(), ()>) -> Vec<Vec<u64>>;

    /// Per-orbit weights for the distance; `None` falls back to uniform 1.0.
    fn orbit_weights(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Trivial provider: every vertex gets an all-zero vector.
///
/// Useful for wiring tests and for callers that want the alignment driven
/// by vertex penalties alone; a real orbit counter plugs in through the
/// same trait.
#[derive(Debug, Clone)]
pub struct UniformSignatureProvider {
    orbit_count: usize,
}

impl UniformSignatureProvider {
    pub fn new(orbit_count: usize) -> Self {
        Self { orbit_count }
    }
}

impl Default for UniformSignatureProvider {
    fn default() -> Self {
        Self::new(ORBIT_COUNT)
    }
}

impl SignatureProvider for UniformSignatureProvider {
    fn signatures(&self, graph: &UnGraph<(), ()>) -> Vec<Vec<u64>> {
        vec![vec![0; self.orbit_count]; graph.node_count()]
    }
}

/// Normalized structural distance between two signature vectors.
///
/// Log-scaled per-orbit differences over a log-scaled upper bound, so the
/// result is symmetric and bounded in [0, 1]; all-zero weights yield 0.
pub fn signature_distance(a: &[u64], b: &[u64], weights: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), weights.len());

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..a.len() {
        let (x, y) = (a[i] as f64, b[i] as f64);
        numerator += weights[i] * ((x + 1.0).ln() - (y + 1.0).ln()).abs();
        denominator += weights[i] * (x.max(y) + 2.0).ln();
    }

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Check one graph's signature set: one vector per vertex, all of one
/// length (and matching `expected_len` when the other graph fixed it).
/// Returns the common vector length.
pub(crate) fn validate_signatures(
    signatures: &[Vec<u64>],
    vertex_count: usize,
    side: Side,
    expected_len: Option<usize>,
) -> Result<usize, AlignError> {
    if signatures.len() != vertex_count {
        return Err(AlignError::SignatureCount {
            side,
            expected: vertex_count,
            found: signatures.len(),
        });
    }

    let expected = expected_len.unwrap_or_else(|| signatures[0].len());
    for (vertex, signature) in signatures.iter().enumerate() {
        if signature.len() != expected {
            return Err(AlignError::SignatureLength {
                side,
                vertex,
                expected,
                found: signature.len(),
            });
        }
    }
    Ok(expected)
}

/// Resolve provider weights against the signature length, defaulting to
/// uniform 1.0 and rejecting non-finite or negative entries.
pub(crate) fn resolve_weights(
    weights: Option<Vec<f64>>,
    signature_len: usize,
) -> Result<Vec<f64>, AlignError> {
    let Some(weights) = weights else {
        return Ok(vec![1.0; signature_len]);
    };

    if weights.len() != signature_len {
        return Err(AlignError::WeightLength {
            expected: signature_len,
            found: weights.len(),
        });
    }
    for (index, &value) in weights.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(AlignError::NonFiniteWeight { index, value });
        }
    }
    Ok(weights)
}
