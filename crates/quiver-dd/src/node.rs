//! Nodes, edges and line roles.

use num_complex::Complex64;

use crate::complex::WeightId;

/// Arena index of a node. `NodeId::TERMINAL` is the single terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The terminal node.
    pub const TERMINAL: NodeId = NodeId(0);

    /// Returns true for the terminal.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    /// Raw arena index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A weighted pointer into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Target node.
    pub node: NodeId,
    /// Interned edge weight.
    pub weight: WeightId,
}

impl Edge {
    /// The canonical zero edge.
    pub const ZERO: Edge = Edge {
        node: NodeId::TERMINAL,
        weight: WeightId::ZERO,
    };

    /// The canonical one edge (also the identity over zero variables).
    pub const ONE: Edge = Edge {
        node: NodeId::TERMINAL,
        weight: WeightId::ONE,
    };

    /// Terminal edge carrying `weight`.
    #[inline]
    pub fn terminal(weight: WeightId) -> Self {
        Self {
            node: NodeId::TERMINAL,
            weight,
        }
    }

    /// Returns true when the edge points at the terminal.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self.node.is_terminal()
    }

    /// Returns true when the edge has zero weight.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.weight.is_zero()
    }
}

/// A decision-diagram node.
///
/// Children are ordered row-major over the 2×2 block: `00, 01, 10, 11`.
/// Column vectors use children 0 and 2 only.
#[derive(Debug, Clone)]
pub struct Node {
    /// Variable (level) of this node. Variable 0 sits just above the terminal.
    pub var: usize,
    /// Outgoing edges.
    pub children: [Edge; 4],
    pub(crate) ref_count: u32,
    pub(crate) live: bool,
}

impl Node {
    pub(crate) fn terminal() -> Self {
        Self {
            var: usize::MAX,
            children: [Edge::ZERO; 4],
            ref_count: 0,
            live: true,
        }
    }

    /// Current reference count.
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

/// Role a variable plays in a gate diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineRole {
    /// Identity on this line.
    #[default]
    Idle,
    /// Positive control.
    Control,
    /// The line the 2×2 matrix acts on.
    Target,
}

/// Dense single-qubit matrix, row-major.
pub type Matrix2 = [[Complex64; 2]; 2];
