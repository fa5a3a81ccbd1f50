use std::io::{self, BufRead, Read, Write};

use garter_codegen::CodeGenerator;
use garter_lexer::Lexer;
use garter_parser::Parser;
use owo_colors::OwoColorize;

use crate::common::render_error;

const PROMPT: &str = "garter> ";

/// Line reader that shows a prompt each time it has to wait for input.
///
/// The parser only pulls a new line once it needs another token, so the
/// prompt appears exactly when the session is idle or an item is still
/// incomplete.
pub struct Prompt<R> {
    inner: R,
    line: String,
    pos: usize,
    interactive: bool,
}

impl<R: BufRead> Prompt<R> {
    pub fn new(inner: R, interactive: bool) -> Self {
        Self { inner, line: String::new(), pos: 0, interactive }
    }
}

impl<R: BufRead> Read for Prompt<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for Prompt<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.line.len() {
            self.line.clear();
            self.pos = 0;
            if self.interactive {
                let mut out = io::stdout();
                write!(out, "{}", PROMPT.cyan())?;
                out.flush()?;
            }
            self.inner.read_line(&mut self.line)?;
        }
        Ok(&self.line.as_bytes()[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.line.len());
    }
}

/// Reads, defines and executes top-level items until end of input.
///
/// Returns the process exit code: 0 once the input is exhausted, 1 when a
/// lexical or syntax error stops the session. Errors from code generation
/// or execution only cost the item that raised them.
pub fn run<R: BufRead>(input: R, interactive: bool) -> i32 {
    if interactive {
        println!("{}", "garter REPL. Press Ctrl-D to exit.".bold().green());
    }
    let mut parser = Parser::new(Lexer::from_reader(Prompt::new(input, interactive)));
    let mut cg = CodeGenerator::new("garteri");
    loop {
        match parser.parse_top_level_item() {
            Ok(Some(item)) => {
                if let Err(e) = cg.execute_top_level_item(&item) {
                    render_error(None, &e);
                }
            }
            Ok(None) => {
                if interactive {
                    println!();
                }
                return 0;
            }
            Err(e) => {
                render_error(None, &e);
                return 1;
            }
        }
    }
}
