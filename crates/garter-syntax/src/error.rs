//! Error handling types and utilities for the garter toolchain.
//!
//! Every stage of the pipeline (lexer, parser, code generator, backend and
//! execution engine) reports failures through the single [`Error`] type
//! defined here. An error carries a human-readable message, an
//! [`ErrorKind`] naming the stage that failed, and an optional source
//! location.
//!
//! # Propagation
//!
//! All errors are fatal to the unit being processed: one source file when
//! compiling ahead of time, one top-level item in the REPL. Nothing is
//! retried and nothing is swallowed; callers receive the `Err` and decide
//! how to render it.
//!
//! # Examples
//!
//! ```rust
//! use garter_syntax::error::{error, error_at, ErrorKind, Result};
//!
//! fn lookup(name: &str) -> Result<i32> {
//!     if name == "f" {
//!         Ok(0)
//!     } else {
//!         error(ErrorKind::Semantic, format!("Unknown function '{}'", name))
//!     }
//! }
//!
//! fn expect_semicolon(line: usize, col: usize) -> Result<()> {
//!     error_at(ErrorKind::Syntax, line, col, "Expected ';'")
//! }
//!
//! assert!(lookup("g").is_err());
//! assert_eq!(
//!     expect_semicolon(3, 7).unwrap_err().to_string(),
//!     "Expected ';' at 3:7"
//! );
//! ```

use std::fmt;

/// The stage of the toolchain an [`Error`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid character, embedded NUL, oversized integer literal or a
    /// malformed `!`.
    Lexical,
    /// A token appeared where a different token or construct was required.
    Syntax,
    /// Duplicate definition, unknown callee or wrong argument count.
    Semantic,
    /// No usable target, assembler failure or an unwritable output file.
    Backend,
    /// A fault while executing generated code in the engine.
    Runtime,
    /// Reading source input failed.
    Io,
}

impl ErrorKind {
    /// Short label used as a diagnostic header.
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::Lexical => "Lex error",
            ErrorKind::Syntax => "Parse error",
            ErrorKind::Semantic => "Compile error",
            ErrorKind::Backend => "Backend error",
            ErrorKind::Runtime => "Runtime error",
            ErrorKind::Io => "I/O error",
        }
    }
}

/// An error that occurred while processing garter source.
///
/// # Fields
///
/// - `kind`: Which stage produced the error
/// - `msg`: Human-readable error description
/// - `line`: Optional 1-based line number in the source
/// - `col`: Optional 1-based column number in the source
///
/// # Examples
///
/// ```rust
/// use garter_syntax::{Error, ErrorKind};
///
/// let unlocated = Error::new(ErrorKind::Backend, "no usable target");
/// assert_eq!(unlocated.to_string(), "no usable target");
///
/// let located = Error::with_span(ErrorKind::Syntax, "Expected ')'", 2, 14);
/// assert_eq!(located.to_string(), "Expected ')' at 2:14");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Stage that produced the error
    pub kind: ErrorKind,

    /// Human-readable error message
    pub msg: String,

    /// Optional line number in source file (1-based)
    pub line: Option<usize>,

    /// Optional column number in source file (1-based)
    pub col: Option<usize>,
}

impl Error {
    /// Creates a new error without source location.
    ///
    /// Suitable for code generation, backend and runtime failures, which
    /// are not tied to a single token.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            line: None,
            col: None,
        }
    }

    /// Creates a new error pointing at a 1-based line and column.
    pub fn with_span(kind: ErrorKind, msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            msg: msg.into(),
            line: Some(line),
            col: Some(col),
        }
    }

    /// Returns `true` if the error came from the lexer or the parser.
    pub fn is_frontend(&self) -> bool {
        matches!(self.kind, ErrorKind::Lexical | ErrorKind::Syntax)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(l), Some(c)) = (self.line, self.col) {
            write!(f, "{} at {}:{}", self.msg, l, c)
        } else {
            write!(f, "{}", self.msg)
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, e.to_string())
    }
}

/// A specialized `Result` type for garter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for `Err(Error::new(kind, msg))`.
pub fn error<T>(kind: ErrorKind, msg: impl Into<String>) -> Result<T> {
    Err(Error::new(kind, msg))
}

/// Shorthand for `Err(Error::with_span(kind, msg, line, col))`.
pub fn error_at<T>(kind: ErrorKind, line: usize, col: usize, msg: impl Into<String>) -> Result<T> {
    Err(Error::with_span(kind, msg, line, col))
}
