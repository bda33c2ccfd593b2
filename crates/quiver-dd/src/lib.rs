//! Quantum multiple-valued decision diagrams.
//!
//! A state over `n` qubits is a column vector of `2^n` amplitudes and a gate
//! is a `2^n × 2^n` matrix. Both are stored as edges into a shared,
//! hash-consed node graph owned by a [`Package`]:
//!
//! - every node sits at a variable (level); variable 0 is just above the
//!   terminal and the diagrams are quasi-reduced, so every non-zero path
//!   visits each level once,
//! - edge weights are interned in a tolerance-based [`ComplexTable`] and
//!   addressed by [`WeightId`],
//! - nodes are normalized by their largest child weight, which makes equal
//!   sub-diagrams share one node.
//!
//! Liveness is explicit. Callers retain roots with [`Package::retain`], swap
//! them with [`Package::replace`] and give them back with
//! [`Package::release`]; [`Package::garbage_collect`] frees everything else.
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex64;
//! use quiver_dd::{Edge, LineRole, Package};
//!
//! let mut pkg = Package::default();
//! let zero = pkg.make_nonterminal(0, [Edge::ONE, Edge::ZERO, Edge::ZERO, Edge::ZERO]);
//!
//! let one = Complex64::new(1.0, 0.0);
//! let nil = Complex64::new(0.0, 0.0);
//! let x = pkg.make_gate(&[[nil, one], [one, nil]], &[LineRole::Target]).unwrap();
//!
//! let flipped = pkg.multiply(x, zero);
//! assert!((pkg.amplitude(flipped, 1) - one).norm() < 1e-12);
//! ```

pub mod complex;
pub mod error;
pub mod node;
pub mod package;

pub use complex::{ComplexTable, DEFAULT_TOLERANCE, WeightId};
pub use error::{DdError, DdResult};
pub use node::{Edge, LineRole, Matrix2, Node, NodeId};
pub use package::{MAX_DENSE_VARS, Package, Root};
