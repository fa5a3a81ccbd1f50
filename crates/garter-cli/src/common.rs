use owo_colors::OwoColorize;
use garter_syntax::error::{Error, ErrorKind};

/// Prints `err` to stderr under its kind's label. With the source at hand
/// the offending line is shown with a caret under the column; otherwise
/// only the position is.
pub fn render_error(source: Option<&str>, err: &Error) {
    eprintln!("{}: {}", err.kind.label().red().bold(), err.msg.red());
    if let (Some(line), Some(col)) = (err.line, err.col) {
        match source.and_then(|s| s.lines().nth(line.saturating_sub(1))) {
            Some(src_line) => {
                let line_num_str = format!("{:3} | ", line);
                eprintln!("  --> line {}, column {}", line, col);
                eprintln!("{}{}", line_num_str.bright_black(), src_line);
                let mut marker = " ".repeat(line_num_str.len() + col.saturating_sub(1));
                marker.push('^');
                eprintln!("{}", marker.red());
            }
            None => eprintln!("  at {}:{}", line, col),
        }
    }
    provide_error_suggestions(err);
}

fn provide_error_suggestions(err: &Error) {
    let help = match err.kind {
        ErrorKind::Semantic if err.msg.starts_with("Unknown function") => {
            "Functions must be defined before the statement that calls them runs; 'main' is reserved."
        }
        ErrorKind::Semantic if err.msg.starts_with("Duplicate definition") => {
            "Every function name may be defined once; top-level code already occupies 'main'."
        }
        ErrorKind::Semantic if err.msg.contains("is not supported") => {
            "Membership tests parse but have no meaning for integers."
        }
        ErrorKind::Lexical if err.msg.contains("too large") => {
            "Integer literals must fit in a signed 32-bit integer (at most 2147483647)."
        }
        ErrorKind::Runtime if err.msg.starts_with("Unresolved external") => {
            "Declared-only 'extern' functions can be called from compiled programs linked against them, not from the REPL."
        }
        _ => return,
    };
    eprintln!("{} {}", "help:".yellow().bold(), help.yellow());
}
