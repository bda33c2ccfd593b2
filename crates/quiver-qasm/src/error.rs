//! Error types for the QASM front end.

use thiserror::Error;

/// Errors raised while scanning, parsing or expanding a QASM program.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QasmError {
    /// Expected-token mismatch.
    #[error("expected '{expected}' but found '{found}' in line {line}, column {column}")]
    UnexpectedToken {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    /// Input ended in the middle of a statement.
    #[error("unexpected end of input: expected '{0}'")]
    UnexpectedEof(String),

    /// A statement starts with a token no statement can start with.
    #[error("unexpected statement '{found}' in line {line}, column {column}")]
    UnexpectedStatement {
        line: usize,
        column: usize,
        found: String,
    },

    /// Reference to an undeclared quantum or classical register.
    #[error("undefined register: {0}")]
    UndefinedRegister(String),

    /// Call of an undeclared gate.
    #[error("undefined gate: {0}")]
    UndefinedGate(String),

    /// Call of a gate declared `opaque`.
    #[error("gate '{0}' is opaque and has no definition")]
    OpaqueGate(String),

    /// A gate body names something that is not one of its formals.
    #[error("gate '{gate}' refers to unknown name '{name}'")]
    UndefinedIdentifier { gate: String, name: String },

    /// Register declared twice.
    #[error("duplicate declaration: {0}")]
    DuplicateDeclaration(String),

    /// Wrong number of parameters in a gate call.
    #[error("gate '{gate}' expects {expected} parameters, got {got}")]
    WrongParameterCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Wrong number of register arguments in a gate call.
    #[error("gate '{gate}' expects {expected} arguments, got {got}")]
    WrongQubitCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Register widths cannot be broadcast against each other.
    #[error("register size does not match for {operation}: {left} vs {right}")]
    SizeMismatch {
        operation: String,
        left: usize,
        right: usize,
    },

    /// Register index outside the declared width.
    #[error("index {index} out of bounds for register '{register}' of size {size}")]
    IndexOutOfBounds {
        register: String,
        index: usize,
        size: usize,
    },

    /// A rotation angle still depends on a parameter nobody bound.
    #[error("parameter '{name}' of gate '{gate}' is not bound to a value")]
    UnboundParameter { gate: String, name: String },

    /// Control and target of a CX resolve to the same qubit.
    #[error("CX control and target are both qubit {0}")]
    DuplicateQubit(usize),

    /// A source or include file could not be read.
    #[error("failed to open file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for front-end operations.
pub type QasmResult<T> = Result<T, QasmError>;
