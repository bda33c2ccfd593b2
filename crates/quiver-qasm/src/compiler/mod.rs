//! Single-pass compiler from `OpenQASM` 2 source to [`Executor`] calls.
//!
//! There is no syntax tree: each statement is parsed and immediately
//! turned into register allocations, gate applications or measurements on
//! the executor. Gate declarations are the only thing kept around, in the
//! [`GateCatalog`].

mod declaration;
mod expression;
mod statement;

use std::fmt;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, warn};

use crate::catalog::{GateCatalog, RegRange};
use crate::error::{QasmError, QasmResult};
use crate::executor::Executor;
use crate::expr::Expr;
use crate::lexer::{Lexer, SpannedToken, Token};

/// Parse a standalone parameter expression such as `pi/2 + 0.1`.
pub fn parse_expression(source: &str) -> QasmResult<Expr> {
    let mut compiler = QasmCompiler::new("<expression>", source);
    compiler.lookahead = compiler.lexer.next();
    let expr = compiler.expression()?;
    match compiler.advance() {
        None => Ok(expr),
        Some(extra) => Err(QasmError::UnexpectedToken {
            line: extra.line,
            column: extra.column,
            expected: "end of expression".into(),
            found: extra.token.to_string(),
        }),
    }
}

/// Where the program text came from, kept so that [`QasmCompiler::rewind`]
/// can start over without touching the file system again.
#[derive(Debug, Clone)]
struct Origin {
    name: String,
    text: String,
    dir: Option<PathBuf>,
}

/// Compiler state for one program.
pub struct QasmCompiler {
    origin: Origin,
    lexer: Lexer,
    lookahead: Option<SpannedToken>,
    qregs: FxHashMap<String, RegRange>,
    cregs: FxHashMap<String, Vec<u8>>,
    catalog: GateCatalog,
    intermediate_measurement: bool,
}

impl fmt::Debug for QasmCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QasmCompiler")
            .field("source", &self.origin.name)
            .field("qregs", &self.qregs)
            .field("cregs", &self.cregs)
            .field("gates", &self.catalog.len())
            .field("intermediate_measurement", &self.intermediate_measurement)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::needless_pass_by_value)]
impl QasmCompiler {
    /// Compile an in-memory program. Includes are resolved against the
    /// working directory.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let origin = Origin {
            name: name.into(),
            text: text.into(),
            dir: None,
        };
        Self::from_origin(origin)
    }

    /// Compile a program file. Includes are also looked up next to it.
    pub fn from_file(path: &Path) -> QasmResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| QasmError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_origin(Origin {
            name: path.display().to_string(),
            text,
            dir: path.parent().map(Path::to_path_buf),
        }))
    }

    fn from_origin(origin: Origin) -> Self {
        let lexer = Lexer::with_dir(origin.name.clone(), &origin.text, origin.dir.clone());
        Self {
            origin,
            lexer,
            lookahead: None,
            qregs: FxHashMap::default(),
            cregs: FxHashMap::default(),
            catalog: GateCatalog::new(),
            intermediate_measurement: false,
        }
    }

    /// Compile the whole program against `executor`.
    ///
    /// A compiler runs once; call [`rewind`](Self::rewind) before running it
    /// again.
    #[instrument(skip(self, executor), fields(source = %self.origin.name))]
    pub fn run<E: Executor>(&mut self, executor: &mut E) -> Result<(), E::Error> {
        self.lookahead = self.lexer.next();
        self.header()?;
        while self.lookahead.is_some() {
            self.statement(executor)?;
        }

        debug!(
            qubits = executor.num_qubits(),
            gates = self.catalog.len(),
            lexical_errors = self.lexer.errors().len(),
            intermediate_measurement = self.intermediate_measurement,
            "compiled program"
        );
        Ok(())
    }

    /// Reset to the state right after construction: the token stream starts
    /// over and registers, gate declarations and the measurement flag are
    /// cleared.
    pub fn rewind(&mut self) {
        self.lexer = Lexer::with_dir(
            self.origin.name.clone(),
            &self.origin.text,
            self.origin.dir.clone(),
        );
        self.lookahead = None;
        self.qregs.clear();
        self.cregs.clear();
        self.catalog.clear();
        self.intermediate_measurement = false;
    }

    /// Whether a `measure` or `reset` has been executed.
    pub fn intermediate_measurement(&self) -> bool {
        self.intermediate_measurement
    }

    /// Name of the program source.
    pub fn source_name(&self) -> &str {
        &self.origin.name
    }

    pub fn quantum_register(&self, name: &str) -> Option<RegRange> {
        self.qregs.get(name).copied()
    }

    /// Current bits of a classical register, index 0 first.
    pub fn classical_register(&self, name: &str) -> Option<&[u8]> {
        self.cregs.get(name).map(Vec::as_slice)
    }

    pub fn catalog(&self) -> &GateCatalog {
        &self.catalog
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    pub(super) fn peek(&self) -> Option<&Token> {
        self.lookahead.as_ref().map(|t| &t.token)
    }

    /// Take the lookahead and pull the next token from the lexer.
    pub(super) fn advance(&mut self) -> Option<SpannedToken> {
        std::mem::replace(&mut self.lookahead, self.lexer.next())
    }

    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, expected: Token) -> QasmResult<SpannedToken> {
        match self.advance() {
            Some(found) if std::mem::discriminant(&found.token) == std::mem::discriminant(&expected) => {
                Ok(found)
            }
            found => Err(mismatch(&expected.to_string(), found)),
        }
    }

    /// Error for the current lookahead not being `expected`.
    pub(super) fn unexpected(&self, expected: &str) -> QasmError {
        mismatch(expected, self.lookahead.clone())
    }

    pub(super) fn expect_identifier(&mut self) -> QasmResult<String> {
        match self.advance() {
            Some(SpannedToken {
                token: Token::Identifier(name),
                ..
            }) => Ok(name),
            found => Err(mismatch("identifier", found)),
        }
    }

    pub(super) fn expect_int(&mut self) -> QasmResult<u64> {
        match self.advance() {
            Some(SpannedToken {
                token: Token::IntLiteral(v),
                ..
            }) => Ok(v),
            found => Err(mismatch("integer", found)),
        }
    }

    pub(super) fn expect_index(&mut self) -> QasmResult<usize> {
        Ok(self.expect_int()? as usize)
    }

    pub(super) fn expect_string(&mut self) -> QasmResult<String> {
        match self.advance() {
            Some(SpannedToken {
                token: Token::StringLiteral(s),
                ..
            }) => Ok(s),
            found => Err(mismatch("string", found)),
        }
    }

    pub(super) fn identifier_list(&mut self) -> QasmResult<Vec<String>> {
        let mut names = vec![self.expect_identifier()?];
        while self.consume(&Token::Comma) {
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    /// `OPENQASM <version> ;`
    fn header(&mut self) -> QasmResult<()> {
        self.expect(Token::OpenQasm)?;
        let version = match self.advance() {
            Some(SpannedToken {
                token: Token::RealLiteral(v),
                ..
            }) => v,
            Some(SpannedToken {
                token: Token::IntLiteral(v),
                ..
            }) => v as f64,
            found => return Err(mismatch("version number", found)),
        };
        if (version - 2.0).abs() > f64::EPSILON {
            warn!(version, "only OpenQASM 2.0 is supported");
        }
        self.expect(Token::Semicolon)?;
        Ok(())
    }
}

fn mismatch(expected: &str, found: Option<SpannedToken>) -> QasmError {
    match found {
        Some(found) => QasmError::UnexpectedToken {
            line: found.line,
            column: found.column,
            expected: expected.to_string(),
            found: found.token.to_string(),
        },
        None => QasmError::UnexpectedEof(expected.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Executor that only records what it is asked to do.
    #[derive(Debug, Default)]
    struct Recorder {
        qubits: usize,
        registers: Vec<(String, usize)>,
        ops: Vec<String>,
        outcome: u8,
    }

    impl Executor for Recorder {
        type Error = QasmError;

        fn num_qubits(&self) -> usize {
            self.qubits
        }

        fn add_qubits(&mut self, count: usize, register: &str) -> QasmResult<()> {
            self.qubits += count;
            self.registers.push((register.to_string(), count));
            Ok(())
        }

        fn apply_u(&mut self, theta: f64, phi: f64, lambda: f64, qubit: usize) -> QasmResult<()> {
            self.ops
                .push(format!("U({theta:.4},{phi:.4},{lambda:.4}) {qubit}"));
            Ok(())
        }

        fn apply_cx(&mut self, control: usize, target: usize) -> QasmResult<()> {
            self.ops.push(format!("CX {control},{target}"));
            Ok(())
        }

        fn measure(&mut self, qubit: usize) -> QasmResult<u8> {
            self.ops.push(format!("measure {qubit}"));
            Ok(self.outcome)
        }

        fn reset(&mut self, qubit: usize) -> QasmResult<()> {
            self.ops.push(format!("reset {qubit}"));
            Ok(())
        }

        fn show_probabilities(&mut self) -> QasmResult<()> {
            self.ops.push("show_probabilities".into());
            Ok(())
        }

        fn snapshot(&mut self, label: &str) -> QasmResult<()> {
            self.ops.push(format!("snapshot {label}"));
            Ok(())
        }
    }

    fn compile(source: &str) -> QasmResult<(QasmCompiler, Recorder)> {
        let mut compiler = QasmCompiler::new("test.qasm", source);
        let mut recorder = Recorder::default();
        compiler.run(&mut recorder)?;
        Ok((compiler, recorder))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    #[test]
    fn test_expression_precedence() {
        let value = |s: &str| parse_expression(s).unwrap().value().unwrap();
        assert!((value("1 + 2 * 3") - 7.0).abs() < 1e-12);
        assert!((value("(1 + 2) * 3") - 9.0).abs() < 1e-12);
        assert!((value("2 ^ 3 ^ 2") - 512.0).abs() < 1e-9);
        assert!((value("-pi / 2") + PI / 2.0).abs() < 1e-12);
        assert!((value("8 / 4 / 2") - 1.0).abs() < 1e-12);
        assert!((value("cos(0) + sqrt(4)") - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_expression_keeps_parameters() {
        let e = parse_expression("theta / 2").unwrap();
        assert!(e.value().is_none());
        assert_eq!(e.to_string(), "(theta / 2)");
    }

    #[test]
    fn test_expression_trailing_tokens() {
        assert!(matches!(
            parse_expression("1 2"),
            Err(QasmError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_expression("1 +"),
            Err(QasmError::UnexpectedEof(_))
        ));
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    #[test]
    fn test_registers_and_basis_gates() {
        let (compiler, recorder) = compile(
            "OPENQASM 2.0;\nqreg q[2];\nqreg r[1];\ncreg c[2];\nU(pi,0,pi) q[1];\nCX q[0],r[0];\n",
        )
        .unwrap();
        assert_eq!(
            recorder.registers,
            vec![("q".to_string(), 2), ("r".to_string(), 1)]
        );
        assert_eq!(compiler.quantum_register("r"), Some(RegRange { base: 2, width: 1 }));
        assert_eq!(compiler.classical_register("c"), Some(&[0u8, 0][..]));
        assert_eq!(recorder.ops, vec!["U(3.1416,0.0000,3.1416) 1", "CX 0,2"]);
        assert!(!compiler.intermediate_measurement());
    }

    #[test]
    fn test_debug_summary() {
        let (compiler, _) = compile("OPENQASM 2.0;\nqreg q[2];\n").unwrap();
        let text = format!("{compiler:?}");
        assert!(text.contains("test.qasm"));
        assert!(text.contains("RegRange { base: 0, width: 2 }"));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            compile("qreg q[1];"),
            Err(QasmError::UnexpectedToken { line: 1, column: 1, .. })
        ));
    }

    #[test]
    fn test_gate_call_broadcasts() {
        let (_, recorder) = compile(
            "OPENQASM 2.0;\nqreg q[3];\ngate flip a { U(pi,0,pi) a; }\nflip q;\n",
        )
        .unwrap();
        assert_eq!(recorder.ops.len(), 3);
        assert_eq!(recorder.ops[2], "U(3.1416,0.0000,3.1416) 2");
    }

    #[test]
    fn test_nested_gate_declaration() {
        let source = "OPENQASM 2.0;\n\
            qreg q[2];\n\
            gate rot(t) a { U(t,0,0) a; }\n\
            gate pair(t) a,b { rot(t/2) a; CX a,b; rot(-t) b; }\n\
            pair(pi) q[0],q[1];\n";
        let (compiler, recorder) = compile(source).unwrap();
        assert_eq!(compiler.catalog().get("pair").map(|g| g.body.len()), Some(3));
        assert_eq!(
            recorder.ops,
            vec![
                "U(1.5708,0.0000,0.0000) 0",
                "CX 0,1",
                "U(-3.1416,0.0000,0.0000) 1",
            ]
        );
    }

    #[test]
    fn test_gate_body_rejects_unknown_names() {
        let err = compile("OPENQASM 2.0;\ngate g(a) x { U(b,0,0) x; }\n").unwrap_err();
        assert!(matches!(err, QasmError::UndefinedIdentifier { ref name, .. } if name == "b"));

        let err = compile("OPENQASM 2.0;\ngate g x { CX x,y; }\n").unwrap_err();
        assert!(matches!(err, QasmError::UndefinedIdentifier { ref name, .. } if name == "y"));
    }

    #[test]
    fn test_measure_and_conditional() {
        let source = "OPENQASM 2.0;\n\
            qreg q[2];\n\
            creg c[2];\n\
            measure q -> c;\n\
            if (c == 3) U(0,0,0) q[0];\n\
            if (c == 0) reset q[1];\n";
        let mut compiler = QasmCompiler::new("test.qasm", source);
        let mut recorder = Recorder {
            outcome: 1,
            ..Recorder::default()
        };
        compiler.run(&mut recorder).unwrap();
        assert_eq!(compiler.classical_register("c"), Some(&[1u8, 1][..]));
        assert_eq!(
            recorder.ops,
            vec!["measure 0", "measure 1", "U(0.0000,0.0000,0.0000) 0"]
        );
        assert!(compiler.intermediate_measurement());
    }

    #[test]
    fn test_measure_size_errors() {
        let err = compile("OPENQASM 2.0;\nqreg q[2];\ncreg c[3];\nmeasure q -> c;\n").unwrap_err();
        assert!(matches!(err, QasmError::SizeMismatch { left: 2, right: 3, .. }));

        let err = compile("OPENQASM 2.0;\nqreg q[2];\ncreg c[1];\nmeasure q[0] -> c[1];\n").unwrap_err();
        assert!(matches!(err, QasmError::IndexOutOfBounds { index: 1, size: 1, .. }));
    }

    #[test]
    fn test_register_errors() {
        let err = compile("OPENQASM 2.0;\nqreg q[1];\nqreg q[2];\n").unwrap_err();
        assert!(matches!(err, QasmError::DuplicateDeclaration(ref n) if n == "q"));

        let err = compile("OPENQASM 2.0;\nU(0,0,0) z[0];\n").unwrap_err();
        assert!(matches!(err, QasmError::UndefinedRegister(ref n) if n == "z"));

        let err = compile("OPENQASM 2.0;\nqreg q[2];\nU(0,0,0) q[2];\n").unwrap_err();
        assert!(matches!(err, QasmError::IndexOutOfBounds { index: 2, size: 2, .. }));
    }

    #[test]
    fn test_unexpected_statement_position() {
        let err = compile("OPENQASM 2.0;\nqreg q[1];\n  ;\n").unwrap_err();
        assert!(matches!(
            err,
            QasmError::UnexpectedStatement { line: 3, column: 3, .. }
        ));
    }

    #[test]
    fn test_opaque_barrier_snapshot() {
        let source = "OPENQASM 2.0;\n\
            qreg q[2];\n\
            opaque magic(a) x, y;\n\
            barrier q;\n\
            snapshot(1) q;\n\
            show_probabilities;\n";
        let (compiler, recorder) = compile(source).unwrap();
        assert!(compiler.catalog().contains("magic"));
        assert_eq!(recorder.ops, vec!["snapshot 1", "show_probabilities"]);

        let err = compile("OPENQASM 2.0;\nqreg q[2];\nopaque magic x;\nmagic q[0];\n").unwrap_err();
        assert!(matches!(err, QasmError::OpaqueGate(_)));
    }

    #[test]
    fn test_builtin_library_include() {
        let (compiler, recorder) = compile(
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\nh q[0];\ncx q[0],q[1];\n",
        )
        .unwrap();
        assert!(compiler.catalog().contains("ccx"));
        assert_eq!(recorder.ops.len(), 2);
        assert_eq!(recorder.ops[1], "CX 0,1");
    }

    #[test]
    fn test_rewind_starts_over() {
        let source = "OPENQASM 2.0;\nqreg q[1];\ncreg c[1];\nmeasure q -> c;\n";
        let mut compiler = QasmCompiler::new("test.qasm", source);
        let mut first = Recorder::default();
        compiler.run(&mut first).unwrap();
        assert!(compiler.intermediate_measurement());

        compiler.rewind();
        assert!(!compiler.intermediate_measurement());
        assert!(compiler.quantum_register("q").is_none());

        let mut second = Recorder::default();
        compiler.run(&mut second).unwrap();
        assert_eq!(first.ops, second.ops);
    }
}
