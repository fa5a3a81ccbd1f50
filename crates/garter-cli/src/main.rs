mod common;
mod target;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use garter_codegen::CodeGenerator;
use garter_syntax::error::{error, Error, ErrorKind, Result};
use owo_colors::OwoColorize;

use crate::common::render_error;
use crate::target::Target;

#[derive(Parser, Debug)]
#[command(name = "garterc", version, about = "Compile a garter program ahead of time")]
struct Cli {
    /// Source file to compile.
    file: PathBuf,

    /// Output path. Defaults to FILE with the extension of the emitted kind.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// What to write.
    #[arg(long = "emit", value_enum, default_value_t = Emit::Obj)]
    emit: Emit,

    /// Target for `obj` and `asm` output. Defaults to the host.
    #[arg(long = "target", value_enum)]
    target: Option<Target>,

    /// Report each phase on stderr.
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Relocatable object file.
    Obj,
    /// x86_64 assembly.
    Asm,
    /// Textual IR.
    Ir,
    /// The parsed syntax tree.
    Ast,
}

impl Emit {
    const fn extension(self) -> &'static str {
        match self {
            Emit::Obj => "o",
            Emit::Asm => "s",
            Emit::Ir => "ll",
            Emit::Ast => "ast",
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let source = match fs::read_to_string(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            let err = Error::new(ErrorKind::Io, format!("Failed to read {}: {}", cli.file.display(), e));
            render_error(None, &err);
            std::process::exit(1);
        }
    };
    if let Err(e) = compile(&cli, &source) {
        render_error(Some(&source), &e);
        std::process::exit(1);
    }
}

fn compile(cli: &Cli, source: &str) -> Result<()> {
    let output = output_path(cli)?;

    let program = garter_parser::parse_source(source)?;
    if cli.verbose {
        progress(format!("parsed {} top-level items", program.items.len()));
    }
    if cli.emit == Emit::Ast {
        return write_ast(&output, &program.to_string());
    }

    let module_name = cli.file.file_name().map_or_else(|| "garter".into(), |n| n.to_string_lossy());
    let mut cg = CodeGenerator::new(&module_name);
    cg.compile_program(&program)?;
    if cli.verbose {
        progress(format!("generated {} functions", cg.module().functions().count()));
    }

    match cli.emit {
        Emit::Ir => cg.finalize_to_text(&output)?,
        Emit::Asm => cg.finalize_to_assembly(&output, target(cli)?)?,
        Emit::Obj => cg.finalize_to_object(&output, target(cli)?)?,
        Emit::Ast => unreachable!("handled before code generation"),
    }
    if cli.verbose {
        progress(format!("wrote {}", output.display()));
    }
    Ok(())
}

fn target(cli: &Cli) -> Result<garter_codegen::Target> {
    match cli.target.map(garter_codegen::Target::from).or_else(garter_codegen::Target::host) {
        Some(target) => Ok(target),
        None => error(ErrorKind::Backend, "No usable target for this host; pass --target"),
    }
}

fn output_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(out) = &cli.output {
        return Ok(out.clone());
    }
    let derived = default_output(&cli.file, cli.emit);
    match derived {
        Some(out) if out != cli.file => Ok(out),
        _ => error(
            ErrorKind::Io,
            format!("Cannot derive an output name from '{}'; pass -o", cli.file.display()),
        ),
    }
}

/// One dimmed progress line, shown with `--verbose`.
fn progress(msg: impl std::fmt::Display) {
    eprintln!("{}", msg.to_string().dimmed());
}

/// `FILE` with its extension swapped for the emitted kind's.
fn default_output(file: &Path, emit: Emit) -> Option<PathBuf> {
    file.extension()?;
    Some(file.with_extension(emit.extension()))
}

fn write_ast(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)
        .or_else(|e| error(ErrorKind::Backend, format!("Could not write '{}': {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_swaps_extension() {
        let file = Path::new("dir/prog.garter");
        assert_eq!(default_output(file, Emit::Obj), Some(PathBuf::from("dir/prog.o")));
        assert_eq!(default_output(file, Emit::Ir), Some(PathBuf::from("dir/prog.ll")));
        assert_eq!(default_output(Path::new("prog"), Emit::Asm), None);
    }

    #[test]
    fn test_output_never_overwrites_input() {
        let cli = Cli::parse_from(["garterc", "prog.s", "--emit", "asm"]);
        assert_eq!(output_path(&cli).unwrap_err().kind, ErrorKind::Io);
        let cli = Cli::parse_from(["garterc", "prog.s", "--emit", "asm", "-o", "out.s"]);
        assert_eq!(output_path(&cli).unwrap(), PathBuf::from("out.s"));
    }

    #[test]
    fn test_explicit_target_wins() {
        let cli = Cli::parse_from(["garterc", "p.g", "--target", "x86_64_darwin"]);
        assert_eq!(target(&cli).unwrap(), garter_codegen::Target::x86_64_darwin);
    }
}
