//! Low-level IR for the garter compiler.
//!
//! A [`Module`] holds functions and module-scope `i32` cells. Each defined
//! function is a control-flow graph of basic blocks; every block is a list
//! of instructions closed by exactly one [`Terminator`]. Values are either
//! constants, parameters, globals, or the results of earlier instructions.
//!
//! The same module feeds three consumers: the textual printer
//! (`Display for Module`), the x86_64 emitter, and the execution engine.

pub mod builder;
pub mod display;
pub mod instruction;
pub mod module;
pub mod types;

pub use builder::Builder;
pub use instruction::{BinOp, CmpPred, Inst, Terminator};
pub use module::{Block, Function, Global, Module};
pub use types::{BlockId, FuncId, GlobalId, InstId, Linkage, Type, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use garter_syntax::error::ErrorKind;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_runtime_declarations_are_synthetic() {
        let mut m = Module::new("test");
        let print = m.get_or_insert_declaration("__garter_print", 1, true);
        let func = m.function(print).unwrap();
        assert!(func.synthetic && func.variadic && func.is_declaration());
        assert_eq!(func.linkage, Linkage::External);
        assert_eq!(m.get_or_insert_declaration("__garter_print", 1, true), print);
    }

    #[test]
    fn test_prints_straight_line_function() {
        let mut m = Module::new("test");
        let print = m.get_or_insert_declaration("__garter_print", 1, true);
        let x = m.global_cell("x", 0);
        let f = m.add_function(Function::new("f", 1, Linkage::Internal)).unwrap();

        let mut b = Builder::new(&mut m, f);
        let entry = b.append_block("entry");
        b.position_at_end(entry);
        let a = b.build_entry_alloca("a", Value::Param(0));
        let v = b.build_load(a);
        let sum = b.build_binary(BinOp::Add, v, Value::Int(1));
        b.build_store(sum, Value::Global(x));
        b.build_call(print, vec![Value::Int(1), sum]);
        b.build_ret(Value::Int(0));

        assert_eq!(
            m.to_string(),
            indoc! {"
                ; ModuleID = 'test'

                @x = internal global i32 0

                declare i32 @__garter_print(i32, ...)

                define internal i32 @f(i32 %0) {
                entry:
                  %a = alloca i32
                  store i32 %0, ptr %a
                  %1 = load i32, ptr %a
                  %2 = add i32 %1, 1
                  store i32 %2, ptr @x
                  %3 = call i32 (i32, ...) @__garter_print(i32 1, i32 %2)
                  ret i32 0
                }
            "}
        );
        assert!(m.verify().is_ok());
    }

    /// Builds `zext (x != 0)` through explicit zero/nonzero blocks.
    fn build_is_nonzero(m: &mut Module) -> FuncId {
        let f = m.add_function(Function::new("nz", 1, Linkage::External)).unwrap();
        let mut b = Builder::new(m, f);
        let entry = b.append_block("entry");
        let zero = b.append_block("zero");
        let nonzero = b.append_block("nonzero");
        let cont = b.append_block("cont");
        b.position_at_end(entry);
        let is_zero = b.build_icmp(CmpPred::Eq, Value::Int(0), Value::Param(0));
        b.build_cond_br(is_zero, zero, nonzero);
        b.position_at_end(zero);
        b.build_br(cont);
        b.position_at_end(nonzero);
        b.build_br(cont);
        b.position_at_end(cont);
        let phi = b.build_phi(Type::I1, vec![(Value::Bool(false), zero), (Value::Bool(true), nonzero)]);
        let wide = b.build_zext(phi);
        b.build_ret(wide);
        f
    }

    #[test]
    fn test_prints_branches_and_phi() {
        let mut m = Module::new("phi");
        let f = build_is_nonzero(&mut m);
        let func = m.function(f).unwrap();
        assert_eq!(
            func.display(&m).to_string(),
            indoc! {"
                define i32 @nz(i32 %0) {
                entry:
                  %1 = icmp eq i32 0, %0
                  br i1 %1, label %zero, label %nonzero

                zero:
                  br label %cont

                nonzero:
                  br label %cont

                cont:
                  %2 = phi i1 [ false, %zero ], [ true, %nonzero ]
                  %3 = zext i1 %2 to i32
                  ret i32 %3
                }
            "}
        );
        assert_eq!(func.predecessors()[3], vec![BlockId(1), BlockId(2)]);
        assert!(m.verify().is_ok());
    }

    #[test]
    fn test_block_names_are_unique() {
        let mut m = Module::new("names");
        let f = m.add_function(Function::new("f", 0, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, f);
        let first = b.append_block("body");
        let second = b.append_block("body");
        let func = m.function(f).unwrap();
        assert_eq!(func.block(first).name, "body");
        assert_eq!(func.block(second).name, "body1");
    }

    #[test]
    fn test_entry_prologue_keeps_slots_before_stores() {
        let mut m = Module::new("prologue");
        let f = m.add_function(Function::new("f", 1, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, f);
        let entry = b.append_block("entry");
        let later = b.append_block("later");
        b.position_at_end(entry);
        let p = b.build_entry_alloca("p", Value::Param(0));
        let v = b.build_load(p);
        b.build_br(later);
        b.position_at_end(later);
        // A variable first seen in a later block still gets its slot and
        // zero store in the entry prologue.
        let y = b.build_entry_alloca("y", Value::Int(0));
        b.build_store(v, y);
        b.build_ret(Value::Int(0));

        let func = m.function(f).unwrap();
        let kinds: Vec<&str> = func
            .block(entry)
            .insts
            .iter()
            .map(|&i| match func.inst(i) {
                Inst::Alloca { .. } => "alloca",
                Inst::Store { .. } => "store",
                Inst::Load { .. } => "load",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["alloca", "alloca", "store", "store", "load"]);
        assert!(m.verify().is_ok());
    }

    #[test]
    fn test_verify_rejects_malformed_functions() {
        let mut m = Module::new("bad");
        let f = m.add_function(Function::new("open", 0, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, f);
        let entry = b.append_block("entry");
        b.position_at_end(entry);
        b.build_load(Value::Int(0));
        let err = m.verify().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Backend);
        assert_eq!(err.msg, "Invalid IR in function 'open': block 'entry' has no terminator");

        let mut m = Module::new("bad-phi");
        let f = m.add_function(Function::new("g", 0, Linkage::Internal)).unwrap();
        let mut b = Builder::new(&mut m, f);
        let entry = b.append_block("entry");
        let cont = b.append_block("cont");
        b.position_at_end(entry);
        b.build_br(cont);
        b.position_at_end(cont);
        let phi = b.build_phi(Type::I32, vec![(Value::Int(1), entry), (Value::Int(2), cont)]);
        b.build_ret(phi);
        assert!(m.verify().unwrap_err().msg.contains("phi in block 'cont'"));
    }

    #[test]
    fn test_erase_leaves_tombstone() {
        let mut m = Module::new("erase");
        let a = m.add_function(Function::new("a", 0, Linkage::Internal)).unwrap();
        let b = m.add_function(Function::new("b", 0, Linkage::Internal)).unwrap();

        let dup = m.add_function(Function::new("a", 2, Linkage::Internal)).unwrap_err();
        assert_eq!(dup.kind, ErrorKind::Semantic);
        assert_eq!(dup.msg, "Duplicate definition of function 'a'");

        assert_eq!(m.erase_function(a).map(|f| f.name), Some("a".to_string()));
        assert!(m.function(a).is_none());
        assert!(m.erase_function(a).is_none());
        assert_eq!(m.function(b).map(|f| f.name.as_str()), Some("b"));
        assert_eq!(m.get_function("a"), None);

        let again = m.add_function(Function::new("a", 0, Linkage::Internal)).unwrap();
        assert_ne!(again, a);
        assert_eq!(m.functions().map(|(id, _)| id).collect::<Vec<_>>(), vec![b, again]);
    }

    #[test]
    fn test_global_cells_are_reused() {
        let mut m = Module::new("globals");
        let x = m.global_cell("x", 0);
        assert_eq!(m.global_cell("x", 7), x);
        assert_eq!(m.global(x).init, 0);
        assert_eq!(m.get_global("y"), None);
    }

    #[test]
    fn test_extern_weak_declaration() {
        let mut m = Module::new("decl");
        m.add_function(Function::new("ext", 2, Linkage::ExternWeak)).unwrap();
        assert_eq!(
            m.to_string(),
            "; ModuleID = 'decl'\n\ndeclare extern_weak i32 @ext(i32, i32)\n"
        );
    }
}
