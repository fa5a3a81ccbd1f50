//! garter code generator: lowers the AST into the garter IR.
//!
//! Every function body is built as a control-flow graph. Conditions of
//! `if` and `while`, the operands of `and`/`or` and the operand of `not`
//! are turned into 1-bit values by a small branch-and-phi diamond; all
//! other values are `i32`. Variables live in entry-block slots inside
//! functions and in module globals at the top level.
//!
//! The module is then either written out (textual IR, x86_64 assembly or
//! an object file) or, in a REPL, executed statement by statement on a
//! [`garter_engine::Engine`].

mod builder;
pub mod compiler;
pub mod target;

pub use compiler::{CodeGenerator, ANONYMOUS_PREFIX, ENTRY_POINT, RESERVED_PREFIX};
pub use target::{Target, CC_ENV};
