//! Lexer for `OpenQASM` 2 with nested file inclusion.
//!
//! Each source is tokenized eagerly with [`logos`]; the [`Lexer`] keeps a
//! stack of sources so that `include` can push a file whose tokens are
//! drained before the enclosing source resumes. Running off the end of an
//! included file is invisible to the caller: only the outermost source ever
//! ends.

use std::path::{Path, PathBuf};

use logos::Logos;
use tracing::{debug, warn};

use crate::error::{QasmError, QasmResult};

/// The standard gate library, used when `qelib1.inc` is not found on disk.
pub const QELIB1: &str = include_str!("qelib1.inc");

/// Tokens for `OpenQASM` 2.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Keywords
    #[token("OPENQASM")]
    OpenQasm,

    #[token("include")]
    Include,

    #[token("qreg")]
    Qreg,

    #[token("creg")]
    Creg,

    #[token("gate")]
    Gate,

    #[token("opaque")]
    Opaque,

    #[token("measure")]
    Measure,

    #[token("reset")]
    Reset,

    #[token("barrier")]
    Barrier,

    #[token("if")]
    If,

    #[token("snapshot")]
    Snapshot,

    #[token("show_probabilities")]
    ShowProbabilities,

    // Built-in gates (higher priority than identifier)
    #[token("U", priority = 3)]
    GateU,

    #[token("CX", priority = 3)]
    GateCX,

    // Constants and unary functions
    #[token("pi")]
    Pi,

    #[token("sin")]
    Sin,

    #[token("cos")]
    Cos,

    #[token("tan")]
    Tan,

    #[token("exp")]
    Exp,

    #[token("ln")]
    Ln,

    #[token("sqrt")]
    Sqrt,

    // Literals
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    RealLiteral(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    StringLiteral(String),

    // Identifiers
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators and punctuation
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("^")]
    Caret,

    #[token("==")]
    EqEq,

    #[token("->")]
    Arrow,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::OpenQasm => write!(f, "OPENQASM"),
            Token::Include => write!(f, "include"),
            Token::Qreg => write!(f, "qreg"),
            Token::Creg => write!(f, "creg"),
            Token::Gate => write!(f, "gate"),
            Token::Opaque => write!(f, "opaque"),
            Token::Measure => write!(f, "measure"),
            Token::Reset => write!(f, "reset"),
            Token::Barrier => write!(f, "barrier"),
            Token::If => write!(f, "if"),
            Token::Snapshot => write!(f, "snapshot"),
            Token::ShowProbabilities => write!(f, "show_probabilities"),
            Token::GateU => write!(f, "U"),
            Token::GateCX => write!(f, "CX"),
            Token::Pi => write!(f, "pi"),
            Token::Sin => write!(f, "sin"),
            Token::Cos => write!(f, "cos"),
            Token::Tan => write!(f, "tan"),
            Token::Exp => write!(f, "exp"),
            Token::Ln => write!(f, "ln"),
            Token::Sqrt => write!(f, "sqrt"),
            Token::RealLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::EqEq => write!(f, "=="),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token with its 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// A character sequence no token matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: usize,
    pub column: usize,
    pub text: String,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unexpected character '{}' in line {}, column {}",
            self.text, self.line, self.column
        )
    }
}

/// Maps byte offsets to line/column pairs.
struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        let column = self.source[start..offset].chars().count() + 1;
        (line, column)
    }
}

/// Tokenize a single QASM source string.
pub fn tokenize(source: &str) -> Vec<Result<SpannedToken, LexError>> {
    let index = LineIndex::new(source);
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let (line, column) = index.position(span.start);
        match result {
            Ok(token) => tokens.push(Ok(SpannedToken {
                token,
                line,
                column,
            })),
            Err(()) => tokens.push(Err(LexError {
                line,
                column,
                text: source[span].to_string(),
            })),
        }
    }

    tokens
}

/// One entry of the include stack.
struct Source {
    name: String,
    dir: Option<PathBuf>,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

/// Token stream over a stack of sources.
pub struct Lexer {
    sources: Vec<Source>,
    errors: Vec<LexError>,
}

impl Lexer {
    /// Create a lexer over an in-memory source.
    pub fn new(name: impl Into<String>, text: &str) -> Self {
        Self::with_dir(name, text, None)
    }

    /// Create a lexer over an in-memory source whose includes may also be
    /// found in `dir`.
    pub fn with_dir(name: impl Into<String>, text: &str, dir: Option<PathBuf>) -> Self {
        let mut lexer = Self {
            sources: Vec::new(),
            errors: Vec::new(),
        };
        lexer.push_source(name, text, dir);
        lexer
    }

    /// Create a lexer over a file. Includes are also looked up next to it.
    pub fn from_file(path: &Path) -> QasmResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| QasmError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::with_dir(
            path.display().to_string(),
            &text,
            path.parent().map(Path::to_path_buf),
        ))
    }

    /// Push a source whose tokens are produced before the rest of the
    /// current one.
    pub fn push_source(&mut self, name: impl Into<String>, text: &str, dir: Option<PathBuf>) {
        let name = name.into();
        let mut tokens = Vec::new();
        for result in tokenize(text) {
            match result {
                Ok(token) => tokens.push(token),
                Err(err) => {
                    warn!(source = %name, "{err}");
                    self.errors.push(err);
                }
            }
        }
        debug!(source = %name, tokens = tokens.len(), depth = self.sources.len(), "opened source");
        self.sources.push(Source {
            name,
            dir,
            tokens,
            pos: 0,
        });
    }

    /// Push the file named by an `include` statement.
    ///
    /// The path is tried as given (relative to the working directory), then
    /// relative to the directory of the including file. A missing
    /// `qelib1.inc` falls back to the bundled standard library.
    pub fn push_file(&mut self, path: &str) -> QasmResult<()> {
        let mut candidates = vec![PathBuf::from(path)];
        if let Some(dir) = self.sources.iter().rev().find_map(|s| s.dir.as_ref()) {
            candidates.push(dir.join(path));
        }

        let found = candidates.into_iter().find(|p| p.is_file());
        match found {
            Some(file) => {
                let text = std::fs::read_to_string(&file).map_err(|source| QasmError::Io {
                    path: path.to_string(),
                    source,
                })?;
                let dir = file.parent().map(Path::to_path_buf);
                self.push_source(file.display().to_string(), &text, dir);
                Ok(())
            }
            None if Path::new(path).file_name().is_some_and(|n| n == "qelib1.inc") => {
                self.push_source("qelib1.inc", QELIB1, None);
                Ok(())
            }
            None => Err(QasmError::Io {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            }),
        }
    }

    /// Number of open sources, 1 when no include is active.
    pub fn depth(&self) -> usize {
        self.sources.len()
    }

    /// Name of the source currently producing tokens.
    pub fn current_source(&self) -> Option<&str> {
        self.sources.last().map(|s| s.name.as_str())
    }

    /// Lexical errors seen so far. They are skipped, not fatal.
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }
}

impl Iterator for Lexer {
    type Item = SpannedToken;

    fn next(&mut self) -> Option<SpannedToken> {
        loop {
            let top = self.sources.last_mut()?;
            if let Some(token) = top.tokens.get(top.pos) {
                top.pos += 1;
                return Some(token.clone());
            }
            if self.sources.len() == 1 {
                return None;
            }
            if let Some(done) = self.sources.pop() {
                debug!(source = %done.name, "closed source");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .into_iter()
            .filter_map(Result::ok)
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_header() {
        let tokens = kinds("OPENQASM 2.0;");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::OpenQasm);
        assert!(matches!(tokens[1], Token::RealLiteral(v) if (v - 2.0).abs() < 1e-12));
        assert_eq!(tokens[2], Token::Semicolon);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = kinds("qreg qregs U Ux CX cx pi pie sqrt show_probabilities");
        assert_eq!(tokens[0], Token::Qreg);
        assert!(matches!(tokens[1], Token::Identifier(ref s) if s == "qregs"));
        assert_eq!(tokens[2], Token::GateU);
        assert!(matches!(tokens[3], Token::Identifier(ref s) if s == "Ux"));
        assert_eq!(tokens[4], Token::GateCX);
        assert!(matches!(tokens[5], Token::Identifier(ref s) if s == "cx"));
        assert_eq!(tokens[6], Token::Pi);
        assert!(matches!(tokens[7], Token::Identifier(ref s) if s == "pie"));
        assert_eq!(tokens[8], Token::Sqrt);
        assert_eq!(tokens[9], Token::ShowProbabilities);
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("42 3.25 1.5e-3 2.E2 .5");
        assert_eq!(tokens[0], Token::IntLiteral(42));
        assert!(matches!(tokens[1], Token::RealLiteral(v) if (v - 3.25).abs() < 1e-12));
        assert!(matches!(tokens[2], Token::RealLiteral(v) if (v - 1.5e-3).abs() < 1e-15));
        assert!(matches!(tokens[3], Token::RealLiteral(v) if (v - 200.0).abs() < 1e-12));
        assert!(matches!(tokens[4], Token::RealLiteral(v) if (v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_measure_arrow_and_comparison() {
        let tokens = kinds("measure q[0] -> c[0]; if(c==1)");
        assert_eq!(tokens[0], Token::Measure);
        assert_eq!(tokens[5], Token::Arrow);
        assert!(tokens.contains(&Token::EqEq));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("// header\nqreg q[1]; // trailing\n");
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0], Token::Qreg);
    }

    #[test]
    fn test_string_literal() {
        let tokens = kinds(r#"include "qelib1.inc";"#);
        assert_eq!(tokens[0], Token::Include);
        assert!(matches!(tokens[1], Token::StringLiteral(ref s) if s == "qelib1.inc"));
    }

    #[test]
    fn test_positions() {
        let tokens: Vec<_> = tokenize("qreg q[2];\n  creg c[2];")
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 6));
        assert_eq!((tokens[6].line, tokens[6].column), (2, 3));
    }

    #[test]
    fn test_invalid_characters_are_reported_and_skipped() {
        let mut lexer = Lexer::new("bad", "qreg $ q = [1];");
        let tokens: Vec<_> = lexer.by_ref().map(|t| t.token).collect();
        assert_eq!(tokens.len(), 6);
        assert_eq!(lexer.errors().len(), 2);
        assert_eq!(lexer.errors()[0].text, "$");
        assert_eq!(lexer.errors()[1].text, "=");
        assert_eq!(lexer.errors()[1].column, 10);
    }

    #[test]
    fn test_pushed_source_is_drained_first() {
        let mut lexer = Lexer::new("outer", "qreg q[1];\ncreg c[1];");
        let first: Vec<_> = lexer.by_ref().take(6).map(|t| t.token).collect();
        assert_eq!(first.last(), Some(&Token::Semicolon));

        lexer.push_source("inner", "U", None);
        assert_eq!(lexer.depth(), 2);
        assert_eq!(lexer.next().map(|t| t.token), Some(Token::GateU));

        let resumed = lexer.next().unwrap_or_else(|| panic!("outer source ended early"));
        assert_eq!(resumed.token, Token::Creg);
        assert_eq!((resumed.line, resumed.column), (2, 1));
        assert_eq!(lexer.depth(), 1);
    }

    #[test]
    fn test_empty_source_keeps_outer_position() {
        for inner in ["", "// nothing here\n   \n"] {
            let mut lexer = Lexer::new("outer", "include \"e.inc\";\n  qreg q[1];");
            let head: Vec<_> = lexer.by_ref().take(3).map(|t| t.token).collect();
            assert_eq!(head.last(), Some(&Token::Semicolon));

            lexer.push_source("e.inc", inner, None);
            let next = lexer.next().unwrap_or_else(|| panic!("outer source ended early"));
            assert_eq!(next.token, Token::Qreg);
            assert_eq!((next.line, next.column), (2, 3));
            assert_eq!(lexer.depth(), 1);
            assert_eq!(lexer.current_source(), Some("outer"));
        }
    }

    #[test]
    fn test_builtin_qelib_fallback() {
        let mut lexer = Lexer::new("outer", "");
        lexer.push_file("qelib1.inc").unwrap();
        assert_eq!(lexer.current_source(), Some("qelib1.inc"));
        assert!(lexer.any(|t| t.token == Token::Gate));
    }

    #[test]
    fn test_missing_include_is_an_error() {
        let mut lexer = Lexer::new("outer", "");
        let err = lexer.push_file("definitely/not/here.inc").unwrap_err();
        assert!(matches!(err, QasmError::Io { .. }));
    }
}
