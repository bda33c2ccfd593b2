//! Canonical complex edge weights.
//!
//! Every weight that appears on an edge is interned here and addressed by a
//! [`WeightId`]. Two values within the table tolerance map to the same id, so
//! weight equality is id equality and the unique table can hash edges
//! directly.

use num_complex::Complex64;
use rustc_hash::FxHashMap;

/// Default interning tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-13;

/// Handle to an interned complex value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeightId(pub(crate) u32);

impl WeightId {
    /// The canonical zero weight.
    pub const ZERO: WeightId = WeightId(0);
    /// The canonical one weight.
    pub const ONE: WeightId = WeightId(1);

    /// Returns true for the canonical zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Returns true for the canonical one.
    #[inline]
    pub fn is_one(self) -> bool {
        self == Self::ONE
    }

    /// Raw table index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interning table for complex weights.
#[derive(Debug, Clone)]
pub struct ComplexTable {
    values: Vec<Complex64>,
    buckets: FxHashMap<(i64, i64), Vec<u32>>,
    tolerance: f64,
}

impl Default for ComplexTable {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

#[allow(clippy::cast_possible_truncation)]
impl ComplexTable {
    /// Create a table holding only zero and one.
    pub fn new(tolerance: f64) -> Self {
        let mut table = Self {
            values: Vec::with_capacity(1024),
            buckets: FxHashMap::default(),
            tolerance,
        };
        table.insert(Complex64::new(0.0, 0.0));
        table.insert(Complex64::new(1.0, 0.0));
        table
    }

    /// Interning tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of interned values, including zero and one.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// A table always holds zero and one.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The value behind an id.
    #[inline]
    pub fn value(&self, id: WeightId) -> Complex64 {
        self.values[id.index()]
    }

    /// Squared magnitude of an interned value.
    #[inline]
    pub fn mag2(&self, id: WeightId) -> f64 {
        self.values[id.index()].norm_sqr()
    }

    /// Intern a value, returning the id of an existing value within tolerance
    /// when there is one.
    pub fn lookup(&mut self, value: Complex64) -> WeightId {
        let value = self.snap(value);
        if value.re == 0.0 && value.im == 0.0 {
            return WeightId::ZERO;
        }
        if let Some(id) = self.find(value) {
            return id;
        }
        self.insert(value)
    }

    /// Product of two weights.
    pub fn mul(&mut self, a: WeightId, b: WeightId) -> WeightId {
        if a.is_zero() || b.is_zero() {
            return WeightId::ZERO;
        }
        if a.is_one() {
            return b;
        }
        if b.is_one() {
            return a;
        }
        let product = self.value(a) * self.value(b);
        self.lookup(product)
    }

    /// Sum of two weights.
    pub fn add(&mut self, a: WeightId, b: WeightId) -> WeightId {
        if a.is_zero() {
            return b;
        }
        if b.is_zero() {
            return a;
        }
        let sum = self.value(a) + self.value(b);
        self.lookup(sum)
    }

    /// Quotient `a / b`. Division by the zero weight follows `f64` semantics.
    pub fn div(&mut self, a: WeightId, b: WeightId) -> WeightId {
        if a == b {
            return WeightId::ONE;
        }
        if a.is_zero() {
            return WeightId::ZERO;
        }
        if b.is_one() {
            return a;
        }
        let quotient = self.value(a) / self.value(b);
        self.lookup(quotient)
    }

    /// Rebuild the table keeping only `live` ids.
    ///
    /// Returns the old→new id mapping; callers must rewrite every stored id
    /// through it. Zero and one keep their ids.
    pub fn compact<I>(&mut self, live: I) -> FxHashMap<WeightId, WeightId>
    where
        I: IntoIterator<Item = WeightId>,
    {
        let mut ids: Vec<WeightId> = live.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let old = std::mem::take(&mut self.values);
        self.buckets.clear();
        self.insert(old[0]);
        self.insert(old[1]);

        let mut remap = FxHashMap::default();
        remap.insert(WeightId::ZERO, WeightId::ZERO);
        remap.insert(WeightId::ONE, WeightId::ONE);
        for id in ids {
            if id.is_zero() || id.is_one() {
                continue;
            }
            let fresh = self.lookup(old[id.index()]);
            remap.insert(id, fresh);
        }
        remap
    }

    fn snap(&self, value: Complex64) -> Complex64 {
        let re = if value.re.abs() <= self.tolerance { 0.0 } else { value.re };
        let im = if value.im.abs() <= self.tolerance { 0.0 } else { value.im };
        Complex64::new(re, im)
    }

    fn bucket(&self, value: Complex64) -> (i64, i64) {
        (
            (value.re / self.tolerance).floor() as i64,
            (value.im / self.tolerance).floor() as i64,
        )
    }

    fn find(&self, value: Complex64) -> Option<WeightId> {
        let (br, bi) = self.bucket(value);
        for dr in -1..=1 {
            for di in -1..=1 {
                let Some(slots) = self.buckets.get(&(br.saturating_add(dr), bi.saturating_add(di)))
                else {
                    continue;
                };
                for &slot in slots {
                    let candidate = self.values[slot as usize];
                    if (candidate.re - value.re).abs() <= self.tolerance
                        && (candidate.im - value.im).abs() <= self.tolerance
                    {
                        return Some(WeightId(slot));
                    }
                }
            }
        }
        None
    }

    fn insert(&mut self, value: Complex64) -> WeightId {
        let slot = self.values.len() as u32;
        self.values.push(value);
        let key = self.bucket(value);
        self.buckets.entry(key).or_default().push(slot);
        WeightId(slot)
    }
}
