//! Gate parameter expressions with eager constant folding.
//!
//! Expressions are built through the smart constructors [`Expr::binary`],
//! [`Expr::negate`] and [`Expr::call`], which fold any operation whose
//! operands are all numbers. A tree therefore only keeps the shape that
//! depends on a named parameter.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    /// Apply the operator. Division by zero follows `f64` semantics.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Pow => lhs.powf(rhs),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// The six unary functions of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFn {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
}

impl UnaryFn {
    /// Evaluate the function.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryFn::Sin => x.sin(),
            UnaryFn::Cos => x.cos(),
            UnaryFn::Tan => x.tan(),
            UnaryFn::Exp => x.exp(),
            UnaryFn::Ln => x.ln(),
            UnaryFn::Sqrt => x.sqrt(),
        }
    }

    /// Source spelling.
    pub fn name(self) -> &'static str {
        match self {
            UnaryFn::Sin => "sin",
            UnaryFn::Cos => "cos",
            UnaryFn::Tan => "tan",
            UnaryFn::Exp => "exp",
            UnaryFn::Ln => "ln",
            UnaryFn::Sqrt => "sqrt",
        }
    }
}

/// A folded parameter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal (or a folded constant subtree).
    Number(f64),
    /// Reference to a gate parameter.
    Param(String),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary operation with at least one non-constant operand.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Unary function of a non-constant argument.
    Call { func: UnaryFn, arg: Box<Expr> },
}

impl Expr {
    /// A numeric literal.
    pub fn number(value: f64) -> Self {
        Expr::Number(value)
    }

    /// The circle constant.
    pub fn pi() -> Self {
        Expr::Number(std::f64::consts::PI)
    }

    /// A parameter reference.
    pub fn param(name: impl Into<String>) -> Self {
        Expr::Param(name.into())
    }

    /// `lhs op rhs`, folded when both sides are numbers.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        match (lhs, rhs) {
            (Expr::Number(a), Expr::Number(b)) => Expr::Number(op.apply(a, b)),
            (lhs, rhs) => Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        }
    }

    /// `-expr`, folded when `expr` is a number.
    pub fn negate(expr: Expr) -> Self {
        match expr {
            Expr::Number(v) => Expr::Number(-v),
            other => Expr::Neg(Box::new(other)),
        }
    }

    /// `func(arg)`, folded when `arg` is a number.
    pub fn call(func: UnaryFn, arg: Expr) -> Self {
        match arg {
            Expr::Number(v) => Expr::Number(func.apply(v)),
            other => Expr::Call {
                func,
                arg: Box::new(other),
            },
        }
    }

    /// The value of a fully folded expression.
    pub fn value(&self) -> Option<f64> {
        match self {
            Expr::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Parameter names this expression still depends on.
    pub fn params(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_params(&mut names);
        names
    }

    fn collect_params<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Param(name) => {
                names.insert(name.as_str());
            }
            Expr::Neg(e) | Expr::Call { arg: e, .. } => e.collect_params(names),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_params(names);
                rhs.collect_params(names);
            }
        }
    }

    /// Substitute bound parameters and fold again bottom-up.
    ///
    /// Parameters missing from `bindings` are kept as references.
    pub fn rewrite(&self, bindings: &FxHashMap<String, Expr>) -> Expr {
        match self {
            Expr::Number(v) => Expr::Number(*v),
            Expr::Param(name) => bindings
                .get(name)
                .cloned()
                .unwrap_or_else(|| Expr::Param(name.clone())),
            Expr::Neg(e) => Expr::negate(e.rewrite(bindings)),
            Expr::Binary { op, lhs, rhs } => {
                Expr::binary(*op, lhs.rewrite(bindings), rhs.rewrite(bindings))
            }
            Expr::Call { func, arg } => Expr::call(*func, arg.rewrite(bindings)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{v}"),
            Expr::Param(name) => write!(f, "{name}"),
            Expr::Neg(e) => write!(f, "(-{e})"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Call { func, arg } => write!(f, "{}({arg})", func.name()),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Number(value)
    }
}
