//! Sparse storage for the filtered PDG-cost map.

use ordered_float::OrderedFloat;
use sprs::{CsMat, TriMat};

use crate::types::VertexPair;

/// The filtered PDG-cost map in CSR form.
///
/// Entries are exactly the pairs that survived the sentinel threshold;
/// zero costs are stored explicitly, so membership means alignability.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    matrix: CsMat<f64>,
}

impl CostMatrix {
    pub(crate) fn from_entries(
        rows: usize,
        cols: usize,
        entries: &[(usize, usize, f64)],
    ) -> Self {
        let mut triplets = TriMat::new((rows, cols));
        for &(i, j, cost) in entries {
            triplets.add_triplet(i, j, cost);
        }
        Self {
            matrix: triplets.to_csr(),
        }
    }

    /// Cost of the pair, if it survived the filter.
    pub fn get(&self, u: usize, v: usize) -> Option<f64> {
        self.matrix.get(u, v).copied()
    }

    pub fn contains(&self, u: usize, v: usize) -> bool {
        self.matrix.get(u, v).is_some()
    }

    /// Smallest stored cost, if any pair survived.
    pub fn minimum(&self) -> Option<f64> {
        self.matrix
            .iter()
            .map(|(&cost, _)| OrderedFloat(cost))
            .min()
            .map(|min| min.0)
    }

    /// Every pair attaining the minimum cost, in ascending index order.
    /// These are the seeds of the alignment search.
    pub fn min_entries(&self) -> Vec<VertexPair> {
        let Some(minimum) = self.minimum() else {
            return Vec::new();
        };
        let mut seeds: Vec<VertexPair> = self
            .matrix
            .iter()
            .filter(|&(&cost, _)| cost == minimum)
            .map(|(_, (i, j))| (i, j))
            .collect();
        seeds.sort_unstable();
        seeds
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.matrix.rows(), self.matrix.cols())
    }

    /// Number of pairs that survived the filter.
    pub fn entry_count(&self) -> usize {
        self.matrix.nnz()
    }

    /// Surviving fraction of the full pair space.
    pub fn density(&self) -> f64 {
        let total = self.matrix.rows() * self.matrix.cols();
        if total == 0 {
            0.0
        } else {
            self.matrix.nnz() as f64 / total as f64
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexPair, f64)> + '_ {
        self.matrix.iter().map(|(&cost, (i, j))| ((i, j), cost))
    }
}
