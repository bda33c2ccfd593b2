//! User-declared compound gates and their expansion.
//!
//! A compound gate body only ever holds the two basis gates: calls to other
//! compound gates are expanded when the enclosing gate is declared, so an
//! instantiation is a single substitution pass over a flat body.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{QasmError, QasmResult};
use crate::expr::Expr;

/// A contiguous qubit range: a whole register or a single indexed qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegRange {
    pub base: usize,
    pub width: usize,
}

impl RegRange {
    /// A range of one qubit.
    pub fn single(qubit: usize) -> Self {
        Self {
            base: qubit,
            width: 1,
        }
    }

    /// The qubit used in the `i`-th broadcast step.
    fn qubit(&self, i: usize) -> usize {
        if self.width == 1 { self.base } else { self.base + i }
    }
}

/// A statement inside a compound gate body, referring to formal arguments
/// by name.
#[derive(Debug, Clone, PartialEq)]
pub enum GateTemplate {
    U {
        theta: Expr,
        phi: Expr,
        lambda: Expr,
        target: String,
    },
    Cx {
        control: String,
        target: String,
    },
}

/// A declared compound gate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundGate {
    pub params: Vec<String>,
    pub args: Vec<String>,
    pub body: Vec<GateTemplate>,
}

/// A basis gate with concrete angles over register ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementaryGate {
    U {
        theta: f64,
        phi: f64,
        lambda: f64,
        target: RegRange,
    },
    Cx {
        control: RegRange,
        target: RegRange,
    },
}

/// One basis gate on concrete qubits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateApplication {
    U {
        theta: f64,
        phi: f64,
        lambda: f64,
        qubit: usize,
    },
    Cx {
        control: usize,
        target: usize,
    },
}

impl ElementaryGate {
    /// Broadcast over the register ranges.
    ///
    /// `U` applies once per target qubit. `CX` pairs equal-width ranges
    /// element-wise and repeats a width-1 side against the other one.
    pub fn applications(&self) -> QasmResult<Vec<GateApplication>> {
        match *self {
            ElementaryGate::U {
                theta,
                phi,
                lambda,
                target,
            } => Ok((0..target.width)
                .map(|i| GateApplication::U {
                    theta,
                    phi,
                    lambda,
                    qubit: target.base + i,
                })
                .collect()),
            ElementaryGate::Cx { control, target } => {
                let width = if control.width == target.width || control.width == 1 {
                    target.width
                } else if target.width == 1 {
                    control.width
                } else {
                    return Err(QasmError::SizeMismatch {
                        operation: "CX".into(),
                        left: control.width,
                        right: target.width,
                    });
                };
                (0..width)
                    .map(|i| {
                        let (c, t) = (control.qubit(i), target.qubit(i));
                        if c == t {
                            Err(QasmError::DuplicateQubit(c))
                        } else {
                            Ok(GateApplication::Cx {
                                control: c,
                                target: t,
                            })
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Name → definition store for compound and opaque gates.
#[derive(Debug, Clone, Default)]
pub struct GateCatalog {
    gates: FxHashMap<String, CompoundGate>,
    opaque: FxHashMap<String, (usize, usize)>,
}

impl GateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a gate, replacing any earlier definition of the same name.
    pub fn declare(&mut self, name: impl Into<String>, gate: CompoundGate) {
        let name = name.into();
        debug!(
            gate = %name,
            params = gate.params.len(),
            args = gate.args.len(),
            body = gate.body.len(),
            "declared gate"
        );
        self.opaque.remove(&name);
        self.gates.insert(name, gate);
    }

    /// Record an opaque gate. Calling it is an error.
    pub fn declare_opaque(&mut self, name: impl Into<String>, params: usize, args: usize) {
        let name = name.into();
        self.gates.remove(&name);
        self.opaque.insert(name, (params, args));
    }

    pub fn get(&self, name: &str) -> Option<&CompoundGate> {
        self.gates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gates.contains_key(name) || self.opaque.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn clear(&mut self) {
        self.gates.clear();
        self.opaque.clear();
    }

    fn resolve(&self, name: &str, params: usize, args: usize) -> QasmResult<&CompoundGate> {
        let Some(gate) = self.gates.get(name) else {
            return Err(if self.opaque.contains_key(name) {
                QasmError::OpaqueGate(name.to_string())
            } else {
                QasmError::UndefinedGate(name.to_string())
            });
        };
        if gate.params.len() != params {
            return Err(QasmError::WrongParameterCount {
                gate: name.to_string(),
                expected: gate.params.len(),
                got: params,
            });
        }
        if gate.args.len() != args {
            return Err(QasmError::WrongQubitCount {
                gate: name.to_string(),
                expected: gate.args.len(),
                got: args,
            });
        }
        Ok(gate)
    }

    /// Expand a call inside another gate's body into that body's terms.
    ///
    /// Parameter expressions are substituted symbolically and formal
    /// arguments renamed, so the result can be stored in the caller.
    pub fn expand(&self, name: &str, params: &[Expr], args: &[String]) -> QasmResult<Vec<GateTemplate>> {
        let gate = self.resolve(name, params.len(), args.len())?;
        let bindings = bind(&gate.params, params);
        let rename: FxHashMap<&str, &str> = gate
            .args
            .iter()
            .map(String::as_str)
            .zip(args.iter().map(String::as_str))
            .collect();
        let renamed = |formal: &str| -> QasmResult<String> {
            rename
                .get(formal)
                .map(|actual| (*actual).to_string())
                .ok_or_else(|| QasmError::UndefinedIdentifier {
                    gate: name.to_string(),
                    name: formal.to_string(),
                })
        };

        gate.body
            .iter()
            .map(|stmt| {
                Ok(match stmt {
                    GateTemplate::U {
                        theta,
                        phi,
                        lambda,
                        target,
                    } => GateTemplate::U {
                        theta: theta.rewrite(&bindings),
                        phi: phi.rewrite(&bindings),
                        lambda: lambda.rewrite(&bindings),
                        target: renamed(target)?,
                    },
                    GateTemplate::Cx { control, target } => GateTemplate::Cx {
                        control: renamed(control)?,
                        target: renamed(target)?,
                    },
                })
            })
            .collect()
    }

    /// Instantiate a call with concrete parameters and register ranges.
    ///
    /// Every rotation angle must fold to a number. Registers wider than one
    /// qubit must all have the same width.
    pub fn instantiate(
        &self,
        name: &str,
        params: &[Expr],
        args: &[RegRange],
    ) -> QasmResult<Vec<ElementaryGate>> {
        let gate = self.resolve(name, params.len(), args.len())?;

        let mut width = 1;
        for range in args.iter().filter(|r| r.width > 1) {
            if width != 1 && range.width != width {
                return Err(QasmError::SizeMismatch {
                    operation: name.to_string(),
                    left: width,
                    right: range.width,
                });
            }
            width = range.width;
        }

        let bindings = bind(&gate.params, params);
        let ranges: FxHashMap<&str, RegRange> =
            gate.args.iter().map(String::as_str).zip(args.iter().copied()).collect();
        let range = |formal: &str| -> QasmResult<RegRange> {
            ranges
                .get(formal)
                .copied()
                .ok_or_else(|| QasmError::UndefinedIdentifier {
                    gate: name.to_string(),
                    name: formal.to_string(),
                })
        };
        let angle = |expr: &Expr| -> QasmResult<f64> {
            let folded = expr.rewrite(&bindings);
            folded.value().ok_or_else(|| QasmError::UnboundParameter {
                gate: name.to_string(),
                name: folded.params().into_iter().next().unwrap_or_default().to_string(),
            })
        };

        gate.body
            .iter()
            .map(|stmt| {
                Ok(match stmt {
                    GateTemplate::U {
                        theta,
                        phi,
                        lambda,
                        target,
                    } => ElementaryGate::U {
                        theta: angle(theta)?,
                        phi: angle(phi)?,
                        lambda: angle(lambda)?,
                        target: range(target)?,
                    },
                    GateTemplate::Cx { control, target } => ElementaryGate::Cx {
                        control: range(control)?,
                        target: range(target)?,
                    },
                })
            })
            .collect()
    }
}

fn bind(formals: &[String], actuals: &[Expr]) -> FxHashMap<String, Expr> {
    formals.iter().cloned().zip(actuals.iter().cloned()).collect()
}
