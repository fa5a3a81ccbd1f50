//! LLVM-flavored textual form of a module.

use std::collections::HashMap;
use std::fmt;

use crate::instruction::{Inst, Terminator};
use crate::module::{Function, Module};
use crate::types::{InstId, Value};

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        let mut globals = self.globals().peekable();
        if globals.peek().is_some() {
            writeln!(f)?;
        }
        for (_, g) in globals {
            writeln!(f, "@{} = internal global i32 {}", g.name, g.init)?;
        }
        for (_, func) in self.functions() {
            writeln!(f)?;
            write!(f, "{}", func.display(self))?;
        }
        Ok(())
    }
}

impl Function {
    /// Printable form of this function; `module` resolves callee and
    /// global names.
    pub fn display<'a>(&'a self, module: &'a Module) -> FunctionDisplay<'a> {
        FunctionDisplay { module, func: self }
    }
}

pub struct FunctionDisplay<'a> {
    module: &'a Module,
    func: &'a Function,
}

struct Names<'a> {
    module: &'a Module,
    func: &'a Function,
    locals: HashMap<InstId, String>,
}

impl Names<'_> {
    fn value(&self, v: Value) -> String {
        match v {
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Param(i) => format!("%{}", i),
            Value::Inst(id) => match self.locals.get(&id) {
                Some(name) => format!("%{}", name),
                None => format!("%<unnamed {}>", id.index()),
            },
            Value::Global(g) => format!("@{}", self.module.global(g).name),
        }
    }

    fn typed(&self, v: Value) -> String {
        format!("{} {}", self.func.value_type(v), self.value(v))
    }
}

fn signature(f: &mut fmt::Formatter<'_>, func: &Function, named: bool) -> fmt::Result {
    write!(f, "{}i32 @{}(", func.linkage.keyword(), func.name)?;
    for i in 0..func.param_count {
        if i > 0 {
            write!(f, ", ")?;
        }
        if named {
            write!(f, "i32 %{}", i)?;
        } else {
            write!(f, "i32")?;
        }
    }
    if func.variadic {
        write!(f, "{}...", if func.param_count > 0 { ", " } else { "" })?;
    }
    write!(f, ")")
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.func;
        if func.is_declaration() {
            write!(f, "declare ")?;
            signature(f, func, false)?;
            return writeln!(f);
        }

        // Slots keep their variable names; other results are numbered after
        // the parameters.
        let mut locals = HashMap::new();
        let mut next = func.param_count;
        for (_, block) in func.blocks() {
            for &id in &block.insts {
                match func.inst(id) {
                    Inst::Alloca { name } => {
                        locals.insert(id, name.clone());
                    }
                    inst if inst.result_type().is_some() => {
                        locals.insert(id, next.to_string());
                        next += 1;
                    }
                    _ => {}
                }
            }
        }
        let names = Names { module: self.module, func, locals };

        write!(f, "define ")?;
        signature(f, func, true)?;
        writeln!(f, " {{")?;
        for (i, (_, block)) in func.blocks().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.name)?;
            for &id in &block.insts {
                write!(f, "  ")?;
                let inst = func.inst(id);
                if inst.result_type().is_some() {
                    write!(f, "{} = ", names.value(Value::Inst(id)))?;
                }
                match inst {
                    Inst::Alloca { .. } => write!(f, "alloca i32")?,
                    Inst::Load { ptr } => write!(f, "load i32, {}", names.typed(*ptr))?,
                    Inst::Store { value, ptr } => {
                        write!(f, "store {}, {}", names.typed(*value), names.typed(*ptr))?
                    }
                    Inst::Binary { op, ty, lhs, rhs } => write!(
                        f,
                        "{} {} {}, {}",
                        op.mnemonic(),
                        ty,
                        names.value(*lhs),
                        names.value(*rhs)
                    )?,
                    Inst::Icmp { pred, lhs, rhs } => write!(
                        f,
                        "icmp {} {}, {}",
                        pred.mnemonic(),
                        names.typed(*lhs),
                        names.value(*rhs)
                    )?,
                    Inst::Zext { value } => write!(f, "zext {} to i32", names.typed(*value))?,
                    Inst::Call { callee, args } => {
                        let (callee_name, variadic) = match self.module.function(*callee) {
                            Some(c) => (c.name.as_str(), c.variadic),
                            None => ("<erased>", false),
                        };
                        write!(f, "call i32 ")?;
                        if variadic {
                            write!(f, "(i32, ...) ")?;
                        }
                        write!(f, "@{}(", callee_name)?;
                        for (i, a) in args.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", names.typed(*a))?;
                        }
                        write!(f, ")")?;
                    }
                    Inst::Phi { ty, incoming } => {
                        write!(f, "phi {} ", ty)?;
                        for (i, (v, b)) in incoming.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "[ {}, %{} ]", names.value(*v), func.block(*b).name)?;
                        }
                    }
                }
                writeln!(f)?;
            }
            match &block.term {
                Some(Terminator::Br(dest)) => writeln!(f, "  br label %{}", func.block(*dest).name)?,
                Some(Terminator::CondBr { cond, then_dest, else_dest }) => writeln!(
                    f,
                    "  br {}, label %{}, label %{}",
                    names.typed(*cond),
                    func.block(*then_dest).name,
                    func.block(*else_dest).name
                )?,
                Some(Terminator::Ret(v)) => writeln!(f, "  ret {}", names.typed(*v))?,
                None => writeln!(f, "  ; missing terminator")?,
            }
        }
        writeln!(f, "}}")
    }
}
