//! garter execution engine: runs IR functions in-process.
//!
//! This is the immediate-execution half of the backend. The REPL compiles
//! each statement into a transient function, runs it here, and erases it;
//! global cells keep their values inside the [`Engine`] between runs.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

pub mod engine;
pub mod runtime;

pub use engine::{Engine, MAX_CALL_DEPTH};
pub use runtime::{exponentiate, NativeFn, EXPONENTIATE_SYMBOL, PRINT_SYMBOL};

/// A clonable in-memory print sink; every clone appends to the same buffer.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Returns the buffered output and clears the buffer.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garter_ir::{BinOp, Builder, CmpPred, FuncId, Function, Linkage, Module, Type, Value};
    use garter_syntax::error::ErrorKind;

    fn engine() -> (Engine, SharedOutput) {
        let out = SharedOutput::new();
        let mut engine = Engine::with_output(Box::new(out.clone()));
        engine.map_runtime();
        (engine, out)
    }

    /// `def f(a, b): return a <op> b; enddef`
    fn binary_function(m: &mut Module, name: &str, op: BinOp) -> FuncId {
        let f = m.add_function(Function::new(name, 2, Linkage::Internal)).unwrap();
        let mut b = Builder::new(m, f);
        let entry = b.append_block("entry");
        b.position_at_end(entry);
        let r = b.build_binary(op, Value::Param(0), Value::Param(1));
        b.build_ret(r);
        f
    }

    /// `def fact(n): if n < 2: return 1; endif return n * fact(n - 1); enddef`
    fn factorial(m: &mut Module) -> FuncId {
        let f = m.add_function(Function::new("fact", 1, Linkage::Internal)).unwrap();
        let mut b = Builder::new(m, f);
        let entry = b.append_block("entry");
        let base = b.append_block("base");
        let rec = b.append_block("rec");
        b.position_at_end(entry);
        let n = b.build_entry_alloca("n", Value::Param(0));
        let v = b.build_load(n);
        let small = b.build_icmp(CmpPred::Slt, v, Value::Int(2));
        b.build_cond_br(small, base, rec);
        b.position_at_end(base);
        b.build_ret(Value::Int(1));
        b.position_at_end(rec);
        let v = b.build_load(n);
        let m1 = b.build_binary(BinOp::Sub, v, Value::Int(1));
        let sub = b.build_call(f, vec![m1]);
        let prod = b.build_binary(BinOp::Mul, v, sub);
        b.build_ret(prod);
        f
    }

    #[test]
    fn test_arithmetic_and_faults() {
        let mut m = Module::new("arith");
        let div = binary_function(&mut m, "div", BinOp::SDiv);
        let rem = binary_function(&mut m, "rem", BinOp::SRem);
        let add = binary_function(&mut m, "add", BinOp::Add);
        let (mut e, _) = engine();

        assert_eq!(e.run_function(&m, div, &[-7, 2]).unwrap(), -3);
        assert_eq!(e.run_function(&m, rem, &[-7, 2]).unwrap(), -1);
        assert_eq!(e.run_function(&m, add, &[i32::MAX, 1]).unwrap(), i32::MIN);

        let err = e.run_function(&m, div, &[1, 0]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.msg, "Division by zero");
        assert_eq!(e.run_function(&m, rem, &[1, 0]).unwrap_err().msg, "Division by zero");
        assert_eq!(
            e.run_function(&m, div, &[i32::MIN, -1]).unwrap_err().msg,
            "Integer overflow in division"
        );
    }

    #[test]
    fn test_recursion_and_branches() {
        let mut m = Module::new("fact");
        let fact = factorial(&mut m);
        let (mut e, _) = engine();
        assert_eq!(e.run_function(&m, fact, &[1]).unwrap(), 1);
        assert_eq!(e.run_function(&m, fact, &[10]).unwrap(), 3_628_800);
    }

    #[test]
    fn test_call_depth_is_bounded() {
        let mut m = Module::new("deep");
        let f = m.add_function(Function::new("forever", 0, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, f);
        let entry = b.append_block("entry");
        b.position_at_end(entry);
        let r = b.build_call(f, vec![]);
        b.build_ret(r);
        let (mut e, _) = engine();
        let err = e.run_function(&m, f, &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert!(err.msg.contains("call depth"));
    }

    #[test]
    fn test_natives_and_globals_persist() {
        let mut m = Module::new("persist");
        let print = m.get_or_insert_declaration(PRINT_SYMBOL, 1, true);
        let pow = m.get_or_insert_declaration(EXPONENTIATE_SYMBOL, 2, false);
        let x = m.global_cell("x", 0);

        // x = x + 2 ** 3; print x, 2 ** -1;
        let f = m.add_function(Function::new("step", 0, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, f);
        let entry = b.append_block("entry");
        b.position_at_end(entry);
        let cur = b.build_load(Value::Global(x));
        let p = b.build_call(pow, vec![Value::Int(2), Value::Int(3)]);
        let sum = b.build_binary(BinOp::Add, cur, p);
        b.build_store(sum, Value::Global(x));
        let neg = b.build_call(pow, vec![Value::Int(2), Value::Int(-1)]);
        let now = b.build_load(Value::Global(x));
        b.build_call(print, vec![Value::Int(2), now, neg]);
        b.build_ret(Value::Int(0));

        let (mut e, out) = engine();
        e.run_function(&m, f, &[]).unwrap();
        e.run_function(&m, f, &[]).unwrap();
        assert_eq!(out.take(), "8 1\n16 1\n");
        assert_eq!(e.global_value(&m, "x"), Some(16));

        // A cell added later starts at its initial value.
        m.global_cell("late", 5);
        assert_eq!(e.global_value(&m, "late"), Some(5));
    }

    #[test]
    fn test_phi_selects_incoming_edge() {
        let mut m = Module::new("phi");
        let f = m.add_function(Function::new("truthy", 1, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, f);
        let entry = b.append_block("entry");
        let zero = b.append_block("zero");
        let nonzero = b.append_block("nonzero");
        let cont = b.append_block("cont");
        b.position_at_end(entry);
        let c = b.build_icmp(CmpPred::Eq, Value::Int(0), Value::Param(0));
        b.build_cond_br(c, zero, nonzero);
        for blk in [zero, nonzero] {
            b.position_at_end(blk);
            b.build_br(cont);
        }
        b.position_at_end(cont);
        let phi = b.build_phi(Type::I1, vec![(Value::Bool(false), zero), (Value::Bool(true), nonzero)]);
        let both = b.build_binary(BinOp::And, phi, Value::Bool(true));
        let wide = b.build_zext(both);
        b.build_ret(wide);

        let (mut e, _) = engine();
        assert_eq!(e.run_function(&m, f, &[0]).unwrap(), 0);
        assert_eq!(e.run_function(&m, f, &[-4]).unwrap(), 1);
    }

    #[test]
    fn test_unmapped_declaration_is_runtime_error() {
        let mut m = Module::new("weak");
        let ext = m.add_function(Function::new("missing", 0, Linkage::ExternWeak)).unwrap();
        let mut e = Engine::with_output(Box::new(SharedOutput::new()));
        let err = e.run_function(&m, ext, &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.msg, "Unresolved external function 'missing'");

        // Without the runtime mapped, print is unresolved too.
        let print = m.get_or_insert_declaration(PRINT_SYMBOL, 1, true);
        assert!(e.run_function(&m, print, &[0]).is_err());
        e.map_runtime();
        assert_eq!(e.run_function(&m, print, &[0]).unwrap(), 1);
    }
}
