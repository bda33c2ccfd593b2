//! `OpenQASM` 2 front end for quiver
//!
//! This crate reads `OpenQASM` 2.0 programs and drives any backend that
//! implements [`Executor`]. There is no intermediate circuit: statements are
//! compiled and executed one at a time, and only gate declarations are kept.
//!
//! # Supported Features
//!
//! | Feature | Status | Example |
//! |---------|--------|---------|
//! | Version declaration | ✅ | `OPENQASM 2.0;` |
//! | Registers | ✅ | `qreg q[5];`, `creg c[5];` |
//! | Basis gates | ✅ | `U(pi/2,0,pi) q[0];`, `CX q[0],q[1];` |
//! | Gate declarations | ✅ | `gate rz(phi) a { U(0,0,phi) a; }` |
//! | Register broadcast | ✅ | `h q;`, `CX q[0],r;` |
//! | Includes | ✅ | `include "qelib1.inc";` |
//! | Measurements | ✅ | `measure q -> c;` |
//! | Reset | ✅ | `reset q[0];` |
//! | Conditionals | ✅ | `if (c == 1) x q[0];` |
//! | Barriers | parsed, no effect | `barrier q;` |
//! | Opaque gates | declared, calls rejected | `opaque magic a;` |
//! | Snapshots | ✅ | `snapshot(1) q;`, `show_probabilities;` |
//!
//! `qelib1.inc` is looked up next to the including file first and falls
//! back to a bundled copy.
//!
//! # Example
//!
//! ```rust
//! use quiver_qasm::{Executor, QasmCompiler, QasmError};
//!
//! #[derive(Default)]
//! struct Counter {
//!     qubits: usize,
//!     gates: usize,
//! }
//!
//! impl Executor for Counter {
//!     type Error = QasmError;
//!     fn num_qubits(&self) -> usize { self.qubits }
//!     fn add_qubits(&mut self, count: usize, _: &str) -> Result<(), QasmError> {
//!         self.qubits += count;
//!         Ok(())
//!     }
//!     fn apply_u(&mut self, _: f64, _: f64, _: f64, _: usize) -> Result<(), QasmError> {
//!         self.gates += 1;
//!         Ok(())
//!     }
//!     fn apply_cx(&mut self, _: usize, _: usize) -> Result<(), QasmError> {
//!         self.gates += 1;
//!         Ok(())
//!     }
//!     fn measure(&mut self, _: usize) -> Result<u8, QasmError> { Ok(0) }
//!     fn reset(&mut self, _: usize) -> Result<(), QasmError> { Ok(()) }
//!     fn show_probabilities(&mut self) -> Result<(), QasmError> { Ok(()) }
//!     fn snapshot(&mut self, _: &str) -> Result<(), QasmError> { Ok(()) }
//! }
//!
//! let source = r#"
//!     OPENQASM 2.0;
//!     include "qelib1.inc";
//!     qreg q[3];
//!     h q;
//!     cx q[0], q[1];
//! "#;
//!
//! let mut counter = Counter::default();
//! QasmCompiler::new("ghz.qasm", source).run(&mut counter).unwrap();
//! assert_eq!(counter.qubits, 3);
//! assert_eq!(counter.gates, 4);
//! ```

mod catalog;
mod compiler;
mod error;
mod executor;
mod expr;
mod lexer;

pub use catalog::{CompoundGate, ElementaryGate, GateApplication, GateCatalog, GateTemplate, RegRange};
pub use compiler::{QasmCompiler, parse_expression};
pub use error::{QasmError, QasmResult};
pub use executor::Executor;
pub use expr::{BinaryOp, Expr, UnaryFn};
pub use lexer::{LexError, Lexer, QELIB1, SpannedToken, Token, tokenize};
