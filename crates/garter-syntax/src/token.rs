//! Token definitions for the garter language.
//!
//! Tokens are produced one at a time by the lexer and consumed immediately by
//! the parser. Only identifiers and numbers carry a payload; an identifier's
//! name moves into whichever AST node stores it.
//!
//! # Token Categories
//!
//! - **Identifiers**: variable and function names (`count`, `fib_2`)
//! - **Numbers**: non-negative 32-bit integer literals (`0`, `2147483647`)
//! - **Keywords**: the reserved words listed in [`KEYWORDS`]
//! - **Operators and punctuation**: 18 single- and double-character kinds
//! - **Special**: end-of-file and lexical errors
//!
//! Negative literals do not exist at the token level: `-5` is [`Minus`]
//! followed by `Number(5)`, and the parser decides whether the minus is
//! unary or binary.
//!
//! [`Minus`]: TokenKind::Minus

use std::fmt;

use crate::error::{Error, ErrorKind};

/// Token types that can be produced by the garter lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // === Literals ===
    /// An identifier: `[A-Za-z_][A-Za-z0-9_]*` that is not a keyword.
    Ident(String),

    /// A numeric literal, already range-checked against `i32::MAX`.
    Number(i32),

    // === Keywords ===
    And,
    Def,
    Elif,
    Else,
    EndDef,
    EndFor,
    EndIf,
    EndWhile,
    Extern,
    For,
    If,
    In,
    Not,
    Or,
    Pass,
    Print,
    Return,
    While,

    // === Punctuation ===
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `,`
    Comma,

    // === Operators ===
    /// Assignment `=`
    Equal,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `/`
    Slash,
    /// `%`
    Percent,

    // === Special ===
    /// A lexical error; the scan of the current token stopped here.
    Error(LexError),

    /// End-of-file marker, produced exactly once at the end of input.
    Eof,
}

impl TokenKind {
    /// Returns `true` for reserved words.
    pub fn is_keyword(&self) -> bool {
        self.keyword_str().is_some()
    }

    fn keyword_str(&self) -> Option<&'static str> {
        let s = match self {
            TokenKind::And => "and",
            TokenKind::Def => "def",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::EndDef => "enddef",
            TokenKind::EndFor => "endfor",
            TokenKind::EndIf => "endif",
            TokenKind::EndWhile => "endwhile",
            TokenKind::Extern => "extern",
            TokenKind::For => "for",
            TokenKind::If => "if",
            TokenKind::In => "in",
            TokenKind::Not => "not",
            TokenKind::Or => "or",
            TokenKind::Pass => "pass",
            TokenKind::Print => "print",
            TokenKind::Return => "return",
            TokenKind::While => "while",
            _ => return None,
        };
        Some(s)
    }

    fn symbol_str(&self) -> Option<&'static str> {
        let s = match self {
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Equal => "=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEq => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEq => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            _ => return None,
        };
        Some(s)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.keyword_str().or_else(|| self.symbol_str()) {
            return write!(f, "'{}'", s);
        }
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Error(e) => write!(f, "invalid token ({})", e),
            TokenKind::Eof => write!(f, "end of file"),
            _ => unreachable!("keywords and symbols handled above"),
        }
    }
}

/// Reserved words, resolved by exact (case-sensitive) match after an
/// identifier-shaped run has been scanned.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "and" => TokenKind::And,
    "def" => TokenKind::Def,
    "elif" => TokenKind::Elif,
    "else" => TokenKind::Else,
    "enddef" => TokenKind::EndDef,
    "endfor" => TokenKind::EndFor,
    "endif" => TokenKind::EndIf,
    "endwhile" => TokenKind::EndWhile,
    "extern" => TokenKind::Extern,
    "for" => TokenKind::For,
    "if" => TokenKind::If,
    "in" => TokenKind::In,
    "not" => TokenKind::Not,
    "or" => TokenKind::Or,
    "pass" => TokenKind::Pass,
    "print" => TokenKind::Print,
    "return" => TokenKind::Return,
    "while" => TokenKind::While,
};

/// Why the lexer produced an [`Error`](TokenKind::Error) token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A character that cannot start any token.
    UnexpectedChar(char),
    /// `!` followed by something other than `=`; `None` at end of input.
    BangWithoutEq(Option<char>),
    /// A NUL character before the true end of input.
    EmbeddedNull,
    /// An integer literal larger than `i32::MAX`.
    IntegerTooLarge,
    /// The input source failed to deliver more characters.
    Read(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedChar(c) => write!(f, "Unexpected character '{}'", c.escape_debug()),
            LexError::BangWithoutEq(Some(c)) => {
                write!(f, "Unexpected character '{}' after '!'", c.escape_debug())
            }
            LexError::BangWithoutEq(None) => write!(f, "Unexpected end of input after '!'"),
            LexError::EmbeddedNull => write!(f, "Unexpected embedded null character"),
            LexError::IntegerTooLarge => write!(f, "Integer constant is too large"),
            LexError::Read(e) => write!(f, "Failed to read input: {}", e),
        }
    }
}

/// A token with its source position.
///
/// `line` and `col` are 1-based and point at the first character of the
/// token (for `Eof`, at the position just past the input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The type and payload of this token
    pub kind: TokenKind,

    /// Line number in the source (1-based)
    pub line: usize,

    /// Column number in the source (1-based)
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, col: usize) -> Self {
        Self { kind, line, col }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Converts an error token into a located lexical [`Error`].
    pub fn to_error(&self) -> Option<Error> {
        match &self.kind {
            TokenKind::Error(e) => Some(Error::with_span(
                ErrorKind::Lexical,
                e.to_string(),
                self.line,
                self.col,
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keyword_table_round_trips_display() {
        for (text, kind) in KEYWORDS.entries() {
            assert!(kind.is_keyword());
            assert_eq!(kind.to_string(), format!("'{}'", text));
        }
        assert_eq!(KEYWORDS.len(), 18);
    }

    #[test]
    fn display_payload_tokens() {
        assert_eq!(TokenKind::Ident("x".into()).to_string(), "identifier 'x'");
        assert_eq!(TokenKind::Number(7).to_string(), "number 7");
        assert_eq!(TokenKind::StarStar.to_string(), "'**'");
        assert_eq!(TokenKind::Eof.to_string(), "end of file");
    }
}
