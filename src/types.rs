//! Shared data structures for the PDG alignment kernel.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Vertex identity pair: (index in the original graph, index in the suspect graph).
pub type VertexPair = (usize, usize);

/// Statement-level vertex kinds of a program dependence graph.
///
/// The class value groups kinds that are structurally interchangeable:
/// declarations and assignments share class 1 and are considered near
/// each other, every other kind has a class of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexType {
    Decl,
    Assign,
    Ctrl,
    Call,
    Return,
    Break,
    Continue,
    Conn,
}

impl VertexType {
    /// Integer class used by the vertex penalty; cross-class pairs are non-alignable.
    pub fn class_value(self) -> u8 {
        match self {
            VertexType::Decl | VertexType::Assign => 1,
            VertexType::Ctrl => 2,
            VertexType::Call => 3,
            VertexType::Return => 4,
            VertexType::Break => 5,
            VertexType::Continue => 6,
            VertexType::Conn => 7,
        }
    }
}

/// Syntactic refinements of a vertex, each carrying an intrinsic penalty
/// charged when the subtype sets of two vertices disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexSubtype {
    HasCondition,
    HasElseBranch,
    LoopHeader,
    HasInitializer,
    CompoundAssign,
    HasReturnValue,
    HasArguments,
    Synthetic,
}

impl VertexSubtype {
    /// Intrinsic mismatch weight of this refinement.
    pub fn penalty(self) -> f64 {
        match self {
            VertexSubtype::HasCondition => 1.0,
            VertexSubtype::HasElseBranch => 1.5,
            VertexSubtype::LoopHeader => 2.0,
            VertexSubtype::HasInitializer => 0.5,
            VertexSubtype::CompoundAssign => 0.5,
            VertexSubtype::HasReturnValue => 0.5,
            VertexSubtype::HasArguments => 1.0,
            VertexSubtype::Synthetic => 2.5,
        }
    }

    /// Penalty charged for a mismatched subtype pair: the mean of the two
    /// intrinsic weights, so heavyweight refinements cost more to confuse.
    pub fn pair_penalty(self, other: VertexSubtype) -> f64 {
        (self.penalty() + other.penalty()) / 2.0
    }
}

/// A program dependence graph vertex: a statement kind plus its refinements.
#[derive(Debug, Clone)]
pub struct PdgVertex {
    vertex_type: VertexType,
    subtypes: AHashSet<VertexSubtype>,
}

impl PdgVertex {
    pub fn new(vertex_type: VertexType) -> Self {
        Self {
            vertex_type,
            subtypes: AHashSet::new(),
        }
    }

    pub fn with_subtypes(
        vertex_type: VertexType,
        subtypes: impl IntoIterator<Item = VertexSubtype>,
    ) -> Self {
        Self {
            vertex_type,
            subtypes: subtypes.into_iter().collect(),
        }
    }

    pub fn vertex_type(&self) -> VertexType {
        self.vertex_type
    }

    pub fn subtypes(&self) -> &AHashSet<VertexSubtype> {
        &self.subtypes
    }
}

/// An ordered vertex-to-vertex correspondence grown from a seed pair.
///
/// The seed is always element 0; no vertex appears twice on either side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alignment {
    pairs: Vec<VertexPair>,
}

impl Alignment {
    pub(crate) fn seeded(seed: VertexPair) -> Self {
        Self { pairs: vec![seed] }
    }

    pub(crate) fn from_pairs(pairs: Vec<VertexPair>) -> Self {
        Self { pairs }
    }

    /// The pair this alignment was grown from.
    pub fn seed(&self) -> VertexPair {
        self.pairs[0]
    }

    pub fn pairs(&self) -> &[VertexPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Both projections must be injective for a valid alignment.
    pub fn is_injective(&self) -> bool {
        let mut left = AHashSet::with_capacity(self.pairs.len());
        let mut right = AHashSet::with_capacity(self.pairs.len());
        self.pairs
            .iter()
            .all(|&(u, v)| left.insert(u) && right.insert(v))
    }
}
