pub mod parser;

pub use parser::Parser;

use garter_lexer::Lexer;
use garter_syntax::ast::Program;
use garter_syntax::error::Result;

/// Parses a complete source string.
pub fn parse_source(source: &str) -> Result<Program> {
    Parser::new(Lexer::new(source)).parse_program()
}
