//! The decision-diagram package: node arena, unique table, compute tables,
//! reference counting and the diagram operations built on them.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::complex::{ComplexTable, DEFAULT_TOLERANCE, WeightId};
use crate::error::{DdError, DdResult};
use crate::node::{Edge, LineRole, Matrix2, Node, NodeId};

/// Largest variable count [`Package::amplitudes`] expands densely.
pub const MAX_DENSE_VARS: usize = 26;

type UniqueKey = (usize, [Edge; 4]);

/// Ownership token for a retained diagram root.
///
/// Obtained from [`Package::retain`], swapped with [`Package::replace`] and
/// handed back with [`Package::release`]. Holding a `Root` keeps every node
/// reachable from it alive across garbage collection.
#[derive(Debug)]
#[must_use = "a Root keeps its diagram alive until released"]
pub struct Root {
    edge: Edge,
}

impl Root {
    /// The retained edge.
    #[inline]
    pub fn edge(&self) -> Edge {
        self.edge
    }
}

/// Shared storage and operations for quasi-reduced decision diagrams.
#[derive(Debug)]
pub struct Package {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    unique: FxHashMap<UniqueKey, NodeId>,
    weights: ComplexTable,
    multiply_cache: FxHashMap<(NodeId, NodeId), Edge>,
    add_cache: FxHashMap<(Edge, Edge), Edge>,
    active: usize,
}

impl Default for Package {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

#[allow(clippy::cast_possible_truncation)]
impl Package {
    /// Create an empty package whose weight table interns within `tolerance`.
    pub fn new(tolerance: f64) -> Self {
        Self {
            nodes: vec![Node::terminal()],
            free: Vec::new(),
            unique: FxHashMap::default(),
            weights: ComplexTable::new(tolerance),
            multiply_cache: FxHashMap::default(),
            add_cache: FxHashMap::default(),
            active: 0,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Borrow a node.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Variable of the node an edge points at, `None` for the terminal.
    pub fn var(&self, edge: Edge) -> Option<usize> {
        if edge.is_terminal() {
            None
        } else {
            Some(self.node(edge.node).var)
        }
    }

    /// The interned value of a weight.
    #[inline]
    pub fn weight(&self, id: WeightId) -> Complex64 {
        self.weights.value(id)
    }

    /// Squared magnitude of a weight.
    #[inline]
    pub fn mag2(&self, id: WeightId) -> f64 {
        self.weights.mag2(id)
    }

    /// Intern a complex value.
    pub fn lookup(&mut self, value: Complex64) -> WeightId {
        self.weights.lookup(value)
    }

    /// Number of interned weights.
    pub fn weight_count(&self) -> usize {
        self.weights.len()
    }

    /// Number of nodes with a non-zero reference count.
    pub fn active_nodes(&self) -> usize {
        self.active
    }

    /// Number of allocated (not yet collected) nodes, excluding the terminal.
    pub fn allocated_nodes(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Build (or find) the node `var` over `children`.
    ///
    /// Children are normalized by the first child of largest magnitude; the
    /// returned edge carries that child's weight. All-zero children give
    /// [`Edge::ZERO`].
    pub fn make_nonterminal(&mut self, var: usize, children: [Edge; 4]) -> Edge {
        let mut children = children;
        for child in &mut children {
            if child.is_zero() {
                *child = Edge::ZERO;
            }
        }

        let tolerance = self.weights.tolerance();
        let mut pivot = None;
        let mut best = 0.0;
        for (i, child) in children.iter().enumerate() {
            if child.is_zero() {
                continue;
            }
            let mag = self.weights.mag2(child.weight);
            if pivot.is_none() || mag > best + tolerance {
                pivot = Some(i);
                best = mag;
            }
        }
        let Some(pivot) = pivot else {
            return Edge::ZERO;
        };

        let top = children[pivot].weight;
        for child in &mut children {
            if !child.is_zero() {
                child.weight = self.weights.div(child.weight, top);
            }
        }

        let node = self.find_or_insert(var, children);
        Edge { node, weight: top }
    }

    fn find_or_insert(&mut self, var: usize, children: [Edge; 4]) -> NodeId {
        if let Some(&id) = self.unique.get(&(var, children)) {
            return id;
        }
        let node = Node {
            var,
            children,
            ref_count: 0,
            live: true,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        };
        self.unique.insert((var, children), id);
        id
    }

    /// Multiply an edge weight by `factor`.
    pub fn scale(&mut self, edge: Edge, factor: Complex64) -> Edge {
        let factor = self.weights.lookup(factor);
        self.scale_weight(edge, factor)
    }

    fn scale_weight(&mut self, edge: Edge, factor: WeightId) -> Edge {
        if edge.is_zero() || factor.is_zero() {
            return Edge::ZERO;
        }
        Edge {
            node: edge.node,
            weight: self.weights.mul(edge.weight, factor),
        }
    }

    /// Identity matrix over variables `0..num_vars`.
    pub fn identity(&mut self, num_vars: usize) -> Edge {
        let mut edge = Edge::ONE;
        for var in 0..num_vars {
            edge = self.make_nonterminal(var, [edge, Edge::ZERO, Edge::ZERO, edge]);
        }
        edge
    }

    /// Build the diagram of a (possibly controlled) single-target gate.
    ///
    /// `roles[v]` says what variable `v` does; exactly one variable must be
    /// [`LineRole::Target`]. Controls are positive.
    pub fn make_gate(&mut self, matrix: &Matrix2, roles: &[LineRole]) -> DdResult<Edge> {
        let mut target = None;
        for (var, role) in roles.iter().enumerate() {
            if *role == LineRole::Target {
                if let Some(first) = target {
                    return Err(DdError::DuplicateTarget { first, second: var });
                }
                target = Some(var);
            }
        }
        let target = target.ok_or(DdError::MissingTarget)?;

        let mut em = [Edge::ZERO; 4];
        for (i, entry) in em.iter_mut().enumerate() {
            let weight = self.weights.lookup(matrix[i / 2][i % 2]);
            *entry = Edge::terminal(weight);
        }

        for (var, role) in roles.iter().enumerate().take(target) {
            for (i, entry) in em.iter_mut().enumerate() {
                let below = *entry;
                *entry = if *role == LineRole::Control {
                    let idle = if i / 2 == i % 2 {
                        self.identity(var)
                    } else {
                        Edge::ZERO
                    };
                    self.make_nonterminal(var, [idle, Edge::ZERO, Edge::ZERO, below])
                } else {
                    self.make_nonterminal(var, [below, Edge::ZERO, Edge::ZERO, below])
                };
            }
        }

        let mut edge = self.make_nonterminal(target, em);
        for (var, role) in roles.iter().enumerate().skip(target + 1) {
            edge = if *role == LineRole::Control {
                let idle = self.identity(var);
                self.make_nonterminal(var, [idle, Edge::ZERO, Edge::ZERO, edge])
            } else {
                self.make_nonterminal(var, [edge, Edge::ZERO, Edge::ZERO, edge])
            };
        }
        Ok(edge)
    }

    // ------------------------------------------------------------------
    // Arithmetic
    // ------------------------------------------------------------------

    /// Matrix × matrix or matrix × vector.
    pub fn multiply(&mut self, a: Edge, b: Edge) -> Edge {
        if a.is_zero() || b.is_zero() {
            return Edge::ZERO;
        }
        let weight = self.weights.mul(a.weight, b.weight);
        let product = self.multiply_nodes(a.node, b.node);
        self.scale_weight(product, weight)
    }

    fn multiply_nodes(&mut self, x: NodeId, y: NodeId) -> Edge {
        if x.is_terminal() {
            return Edge {
                node: y,
                weight: WeightId::ONE,
            };
        }
        if y.is_terminal() {
            return Edge {
                node: x,
                weight: WeightId::ONE,
            };
        }
        if let Some(&hit) = self.multiply_cache.get(&(x, y)) {
            return hit;
        }

        let (var, lhs) = {
            let node = self.node(x);
            (node.var, node.children)
        };
        let rhs = self.node(y).children;
        debug_assert_eq!(var, self.node(y).var, "operands must be quasi-reduced");

        let mut children = [Edge::ZERO; 4];
        for row in 0..2 {
            for col in 0..2 {
                let mut acc = Edge::ZERO;
                for k in 0..2 {
                    let term = self.multiply(lhs[row * 2 + k], rhs[k * 2 + col]);
                    acc = self.add(acc, term);
                }
                children[row * 2 + col] = acc;
            }
        }

        let result = self.make_nonterminal(var, children);
        self.multiply_cache.insert((x, y), result);
        result
    }

    /// Element-wise sum of two diagrams over the same variables.
    pub fn add(&mut self, a: Edge, b: Edge) -> Edge {
        if a.is_zero() {
            return b;
        }
        if b.is_zero() {
            return a;
        }
        if a.node == b.node {
            let weight = self.weights.add(a.weight, b.weight);
            if weight.is_zero() {
                return Edge::ZERO;
            }
            return Edge {
                node: a.node,
                weight,
            };
        }
        if let Some(&hit) = self.add_cache.get(&(a, b)) {
            return hit;
        }
        debug_assert!(
            !a.is_terminal() && !b.is_terminal(),
            "operands must be quasi-reduced"
        );

        let var = self.var(a).max(self.var(b)).unwrap_or(0);
        let lhs = self.node(a.node).children;
        let rhs = self.node(b.node).children;
        let mut children = [Edge::ZERO; 4];
        for (i, child) in children.iter_mut().enumerate() {
            let l = self.scale_weight(lhs[i], a.weight);
            let r = self.scale_weight(rhs[i], b.weight);
            *child = self.add(l, r);
        }

        let result = self.make_nonterminal(var, children);
        self.add_cache.insert((a, b), result);
        result
    }

    // ------------------------------------------------------------------
    // Vectors
    // ------------------------------------------------------------------

    /// Amplitude of basis state `index`; bit `v` of `index` selects the
    /// branch at variable `v`.
    pub fn amplitude(&self, edge: Edge, index: u64) -> Complex64 {
        if edge.is_zero() {
            return Complex64::new(0.0, 0.0);
        }
        let mut acc = self.weight(edge.weight);
        let mut cur = edge;
        while !cur.is_terminal() {
            let node = self.node(cur.node);
            let bit = if node.var < 64 {
                ((index >> node.var) & 1) as usize
            } else {
                0
            };
            cur = node.children[2 * bit];
            if cur.is_zero() {
                return Complex64::new(0.0, 0.0);
            }
            acc *= self.weight(cur.weight);
        }
        acc
    }

    /// All `2^num_vars` amplitudes of a column vector, for at most
    /// [`MAX_DENSE_VARS`] variables.
    pub fn amplitudes(&self, edge: Edge, num_vars: usize) -> DdResult<Vec<Complex64>> {
        if num_vars > MAX_DENSE_VARS {
            return Err(DdError::DenseTooLarge {
                vars: num_vars,
                limit: MAX_DENSE_VARS,
            });
        }
        let mut out = vec![Complex64::new(0.0, 0.0); 1usize << num_vars];
        self.fill_amplitudes(edge, Complex64::new(1.0, 0.0), 0, &mut out);
        Ok(out)
    }

    fn fill_amplitudes(&self, edge: Edge, acc: Complex64, index: usize, out: &mut [Complex64]) {
        if edge.is_zero() {
            return;
        }
        let acc = acc * self.weight(edge.weight);
        if edge.is_terminal() {
            out[index] = acc;
            return;
        }
        let node = self.node(edge.node);
        let bit = 1usize << node.var;
        self.fill_amplitudes(node.children[0], acc, index, out);
        self.fill_amplitudes(node.children[2], acc, index | bit, out);
    }

    // ------------------------------------------------------------------
    // Reference counting and collection
    // ------------------------------------------------------------------

    /// Increment the reference count of the node behind `edge`.
    ///
    /// Children are retained on the 0→1 transition. Prefer [`Package::retain`].
    pub fn incref(&mut self, edge: Edge) {
        if edge.is_terminal() {
            return;
        }
        let node = &mut self.nodes[edge.node.index()];
        node.ref_count = node.ref_count.saturating_add(1);
        if node.ref_count == 1 {
            self.active += 1;
            let children = node.children;
            for child in children {
                self.incref(child);
            }
        }
    }

    /// Decrement the reference count of the node behind `edge`.
    ///
    /// Children are released on the 1→0 transition. Prefer [`Package::release`].
    pub fn decref(&mut self, edge: Edge) {
        if edge.is_terminal() {
            return;
        }
        let node = &mut self.nodes[edge.node.index()];
        if node.ref_count == 0 {
            warn!(node = edge.node.index(), "decref on unreferenced node");
            return;
        }
        node.ref_count -= 1;
        if node.ref_count == 0 {
            self.active -= 1;
            let children = node.children;
            for child in children {
                self.decref(child);
            }
        }
    }

    /// Retain `edge` and return its ownership token.
    pub fn retain(&mut self, edge: Edge) -> Root {
        self.incref(edge);
        Root { edge }
    }

    /// Point `root` at `edge`: the new edge is retained before the old one
    /// is released.
    pub fn replace(&mut self, root: &mut Root, edge: Edge) {
        self.incref(edge);
        self.decref(root.edge);
        root.edge = edge;
    }

    /// Multiply the weight of a retained root by a scalar.
    pub fn rescale(&mut self, root: &mut Root, factor: Complex64) {
        let scaled = self.scale(root.edge, factor);
        self.replace(root, scaled);
    }

    /// Release a root.
    pub fn release(&mut self, root: Root) {
        self.decref(root.edge);
    }

    /// Free every node with a zero reference count and clear the compute
    /// tables. Returns the number of freed nodes.
    pub fn garbage_collect(&mut self) -> usize {
        let mut freed = 0;
        for idx in 1..self.nodes.len() {
            let node = &self.nodes[idx];
            if !node.live || node.ref_count > 0 {
                continue;
            }
            let id = NodeId(idx as u32);
            let key = (node.var, node.children);
            if self.unique.get(&key) == Some(&id) {
                self.unique.remove(&key);
            }
            self.nodes[idx].live = false;
            self.free.push(id);
            freed += 1;
        }
        if freed > 0 {
            self.multiply_cache.clear();
            self.add_cache.clear();
        }
        trace!(freed, active = self.active, "garbage collection");
        freed
    }

    /// Rebuild the weight table keeping only weights used by live nodes and
    /// by `roots`, rewriting every stored weight id.
    pub fn compact_weights(&mut self, roots: &mut [Root]) {
        let before = self.weights.len();
        let mut live: Vec<WeightId> = roots.iter().map(|r| r.edge.weight).collect();
        for node in self.nodes.iter().skip(1).filter(|n| n.live) {
            live.extend(node.children.iter().map(|c| c.weight));
        }
        let remap = self.weights.compact(live);

        self.unique.clear();
        for idx in 1..self.nodes.len() {
            if !self.nodes[idx].live {
                continue;
            }
            let node = &mut self.nodes[idx];
            for child in &mut node.children {
                child.weight = remap.get(&child.weight).copied().unwrap_or(child.weight);
            }
            let key = (node.var, node.children);
            self.unique.entry(key).or_insert(NodeId(idx as u32));
        }
        for root in roots.iter_mut() {
            root.edge.weight = remap
                .get(&root.edge.weight)
                .copied()
                .unwrap_or(root.edge.weight);
        }
        self.multiply_cache.clear();
        self.add_cache.clear();
        debug!(before, after = self.weights.len(), "compacted weight table");
    }
}
