mod common;
mod repl;

use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use garter_syntax::error::{Error, ErrorKind};

use crate::common::render_error;

#[derive(Parser, Debug)]
#[command(name = "garteri", version, about = "Run garter programs interactively, one item at a time")]
struct Cli {
    /// Read items from this file instead of standard input.
    file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let code = match &cli.file {
        Some(path) => match File::open(path) {
            Ok(f) => repl::run(BufReader::new(f), false),
            Err(e) => {
                let err = Error::new(ErrorKind::Io, format!("Failed to read {}: {}", path.display(), e));
                render_error(None, &err);
                1
            }
        },
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            repl::run(stdin.lock(), interactive)
        }
    };
    std::process::exit(code);
}
