//! garter lexer: converts source text into tokens, one token per request.
//!
//! The lexer pulls characters lazily from its source, so a REPL can hand it
//! standard input and have each token read only when the parser asks for
//! it.
use std::io::{self, BufRead};

use garter_syntax::error::Result;
use garter_syntax::token::{LexError, Token, TokenKind, KEYWORDS};

type CharSource<'a> = Box<dyn Iterator<Item = io::Result<char>> + 'a>;

/// Streaming character scanner that produces tokens with positions.
pub struct Lexer<'a> {
    chars: CharSource<'a>,
    peeked: Option<char>,
    read_error: Option<String>,
    line: usize,
    col: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over the given source string.
    pub fn new(input: &'a str) -> Self {
        Self::from_source(Box::new(input.chars().map(Ok)))
    }

    /// Create a lexer that reads from `reader` one line at a time, only when
    /// more characters are needed.
    pub fn from_reader<R: BufRead + 'a>(reader: R) -> Self {
        Self::from_source(Box::new(ReaderChars::new(reader)))
    }

    fn from_source(chars: CharSource<'a>) -> Self {
        Self {
            chars,
            peeked: None,
            read_error: None,
            line: 1,
            col: 1,
            finished: false,
        }
    }

    /// Current 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    fn peek(&mut self) -> Option<char> {
        if self.peeked.is_none() && self.read_error.is_none() {
            match self.chars.next() {
                Some(Ok(c)) => self.peeked = Some(c),
                Some(Err(e)) => self.read_error = Some(e.to_string()),
                None => {}
            }
        }
        self.peeked
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if let Some(c) = ch {
            self.peeked = None;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c' => {
                    self.advance();
                }
                '#' => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Digits accumulate into an `i32` with overflow checked at every step.
    /// An oversized literal is consumed whole and reported as one error.
    fn read_number(&mut self, first: char) -> TokenKind {
        let mut value = first.to_digit(10).map(|d| d as i32);
        while let Some(c) = self.peek() {
            let Some(digit) = c.to_digit(10) else { break };
            self.advance();
            value = value
                .and_then(|n| n.checked_mul(10))
                .and_then(|n| n.checked_add(digit as i32));
        }
        match value {
            Some(n) => TokenKind::Number(n),
            None => TokenKind::Error(LexError::IntegerTooLarge),
        }
    }

    fn read_ident_or_keyword(&mut self, first: char) -> TokenKind {
        let mut s = String::new();
        s.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match KEYWORDS.get(s.as_str()) {
            Some(keyword) => keyword.clone(),
            None => TokenKind::Ident(s),
        }
    }

    /// Consumes `second` if it is next, choosing between a two-character and
    /// a one-character operator.
    fn either(&mut self, second: char, long: TokenKind, short: TokenKind) -> TokenKind {
        if self.peek() == Some(second) {
            self.advance();
            long
        } else {
            short
        }
    }

    /// Scans and returns the next token.
    ///
    /// `Eof` is produced once the source is exhausted; further calls keep
    /// returning `Eof`.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let line = self.line;
        let col = self.col;
        let Some(c) = self.advance() else {
            let kind = match self.read_error.take() {
                Some(e) => TokenKind::Error(LexError::Read(e)),
                None => {
                    self.finished = true;
                    TokenKind::Eof
                }
            };
            return Token::new(kind, line, col);
        };
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '*' => self.either('*', TokenKind::StarStar, TokenKind::Star),
            '=' => self.either('=', TokenKind::EqEq, TokenKind::Equal),
            '<' => self.either('=', TokenKind::LessEq, TokenKind::Less),
            '>' => self.either('=', TokenKind::GreaterEq, TokenKind::Greater),
            '!' => match self.peek() {
                Some('=') => {
                    self.advance();
                    TokenKind::NotEq
                }
                other => TokenKind::Error(LexError::BangWithoutEq(other)),
            },
            '\0' => TokenKind::Error(LexError::EmbeddedNull),
            c if c.is_ascii_digit() => self.read_number(c),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_ident_or_keyword(c),
            other => TokenKind::Error(LexError::UnexpectedChar(other)),
        };
        Token::new(kind, line, col)
    }

    /// Tokenize the entire input into a vector of tokens ending with `Eof`.
    ///
    /// Stops at the first error token and reports it as a lexical error.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let tk = self.next_token();
            if let Some(e) = tk.to_error() {
                return Err(e);
            }
            let is_eof = tk.is_eof();
            tokens.push(tk);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

/// Yields every token up to and including the single `Eof`.
impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        Some(self.next_token())
    }
}

/// Character iterator over a `BufRead`, refilled one line at a time.
struct ReaderChars<R> {
    reader: R,
    line: Vec<char>,
    pos: usize,
}

impl<R: BufRead> ReaderChars<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            pos: 0,
        }
    }
}

impl<R: BufRead> Iterator for ReaderChars<R> {
    type Item = io::Result<char>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.line.len() {
            let mut buf = String::new();
            match self.reader.read_line(&mut buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line = buf.chars().collect();
                    self.pos = 0;
                }
                Err(e) => return Some(Err(e)),
            }
        }
        let c = self.line[self.pos];
        self.pos += 1;
        Some(Ok(c))
    }
}
