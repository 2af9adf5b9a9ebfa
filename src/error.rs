// ABOUTME: Error types for the lexer, parser, and evaluator stages

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("lexical error: {message} at offset {offset}")]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse error: expected {expected}, got {found} ('{lexeme}') at offset {offset}")]
pub struct ParseError {
    pub expected: String,
    pub found: String,
    pub lexeme: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(
        expected: impl Into<String>,
        found: impl Into<String>,
        lexeme: impl Into<String>,
        offset: usize,
    ) -> Self {
        ParseError {
            expected: expected.into(),
            found: found.into(),
            lexeme: lexeme.into(),
            offset,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),

    #[error("'{0}' is not callable")]
    NotCallable(String),

    #[error("{op}: expected {expected}, got {actual}")]
    TypeMismatch {
        op: String,
        expected: String,
        actual: String,
    },

    #[error("{name}: expected {expected} argument(s), got {actual}")]
    ArityError {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("division by zero in {op}")]
    DivisionByZero { op: String },

    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("{receiver} has no member '{member}'")]
    MemberNotFound { receiver: String, member: String },
}

impl EvalError {
    pub fn type_mismatch(op: &str, expected: &str, actual: &str) -> Self {
        EvalError::TypeMismatch {
            op: op.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn arity_error(name: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvalError::ArityError {
            name: name.to_string(),
            expected: expected.into(),
            actual,
        }
    }
}

/// Unified error type composing all three pipeline stages, used by the CLI
/// so `?` can thread errors from lexing, parsing, and evaluation alike.
#[derive(Error, Debug, Clone)]
pub enum TlError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for TlError {
    fn from(err: std::io::Error) -> Self {
        TlError::Io(err.to_string())
    }
}
