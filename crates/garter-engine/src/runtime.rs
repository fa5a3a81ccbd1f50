//! Native implementations of the runtime library entry points.
//!
//! Ahead-of-time output links against a C runtime providing the same two
//! symbols; the engine maps these functions in their place.

use std::io::{self, Write};

pub const PRINT_SYMBOL: &str = "__garter_print";
pub const EXPONENTIATE_SYMBOL: &str = "__garter_exponentiate";

/// Signature shared by every native the engine can call: the print sink
/// and the already evaluated `i32` arguments.
pub type NativeFn = fn(&mut dyn Write, &[i32]) -> io::Result<i32>;

/// Writes one line of space-separated decimals and returns the number of
/// bytes written. The first argument is the count of values that follow.
pub fn print(out: &mut dyn Write, args: &[i32]) -> io::Result<i32> {
    let values = match args.split_first() {
        Some((&count, rest)) => &rest[..(count.max(0) as usize).min(rest.len())],
        None => &[],
    };
    let line = values
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{}", line)?;
    out.flush()?;
    Ok(line.len() as i32 + 1)
}

/// `base ** exponent` with wrapping 32-bit multiplication.
///
/// Every exponent `<= 0` yields 1, negative ones included.
pub fn exponentiate(base: i32, exponent: i32) -> i32 {
    if exponent <= 0 {
        return 1;
    }
    let half = exponentiate(base, exponent / 2);
    let square = half.wrapping_mul(half);
    if exponent % 2 == 1 {
        square.wrapping_mul(base)
    } else {
        square
    }
}

pub(crate) fn native_exponentiate(_: &mut dyn Write, args: &[i32]) -> io::Result<i32> {
    match args {
        [base, exponent] => Ok(exponentiate(*base, *exponent)),
        _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "exponentiate takes two arguments")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_edge_cases() {
        assert_eq!(exponentiate(7, 0), 1);
        assert_eq!(exponentiate(7, -1), 1);
        assert_eq!(exponentiate(0, 0), 1);
        assert_eq!(exponentiate(-2, 3), -8);
        assert_eq!(exponentiate(10, 2), 100);
        assert_eq!(exponentiate(2, 31), i32::MIN);
        assert_eq!(exponentiate(2, 32), 0);
        assert_eq!(exponentiate(3, 40), 3i32.wrapping_pow(40));
        assert_eq!(exponentiate(1, i32::MAX), 1);
    }

    #[test]
    fn print_formats_one_line() {
        let mut out = Vec::new();
        assert_eq!(print(&mut out, &[3, 1, -2, 30]).unwrap(), 8);
        assert_eq!(print(&mut out, &[0]).unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "1 -2 30\n\n");
    }
}
