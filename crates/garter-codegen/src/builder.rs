//! Function body lowering from AST to IR.

use std::collections::HashMap;

use garter_engine::{EXPONENTIATE_SYMBOL, PRINT_SYMBOL};
use garter_ir::{BinOp, Builder, CmpPred, FuncId, Module, Type, Value};
use garter_syntax::ast::*;
use garter_syntax::error::{error, ErrorKind, Result};

/// Where variables of the function being lowered live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Entry-block stack slots, one per parameter and assigned name.
    Local,
    /// Module globals shared by all top-level code.
    Global,
}

pub(crate) struct FuncBuilder<'m> {
    b: Builder<'m>,
    scope: Scope,
    locals: HashMap<String, Value>,
}

impl<'m> FuncBuilder<'m> {
    /// Starts the body of `func` with an entry block holding a slot for
    /// every parameter.
    pub(crate) fn new(module: &'m mut Module, func: FuncId, params: &[String], scope: Scope) -> Self {
        let mut b = Builder::new(module, func);
        let entry = b.append_block("entry");
        b.position_at_end(entry);
        let mut locals = HashMap::new();
        for (i, name) in params.iter().enumerate() {
            let slot = b.build_entry_alloca(name, Value::Param(i as u32));
            locals.insert(name.clone(), slot);
        }
        Self { b, scope, locals }
    }

    /// Lowers `body` and closes the function with `return 0`.
    pub(crate) fn finish<'s>(mut self, body: impl IntoIterator<Item = &'s Stmt>) -> Result<()> {
        for s in body {
            self.emit_stmt(s)?;
        }
        self.b.build_ret(Value::Int(0));
        Ok(())
    }

    /// Storage of a variable, created zero-initialized on first use.
    fn variable(&mut self, name: &str) -> Value {
        match self.scope {
            Scope::Global => Value::Global(self.b.module_mut().global_cell(name, 0)),
            Scope::Local => {
                if let Some(&slot) = self.locals.get(name) {
                    return slot;
                }
                let slot = self.b.build_entry_alloca(name, Value::Int(0));
                self.locals.insert(name.to_string(), slot);
                slot
            }
        }
    }

    fn emit_block(&mut self, body: &[Stmt]) -> Result<()> {
        for s in body {
            self.emit_stmt(s)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, s: &Stmt) -> Result<()> {
        match s {
            Stmt::Assign { target, value } => {
                let ptr = self.variable(target);
                let v = self.emit_expr(value)?;
                self.b.build_store(v, ptr);
                Ok(())
            }
            Stmt::Expr(e) => {
                self.emit_expr(e)?;
                Ok(())
            }
            Stmt::If { cond, body, elifs, else_body } => {
                let cont = self.b.append_block("if.end");
                let arms = std::iter::once((cond, body)).chain(elifs.iter().map(|c| (&c.cond, &c.body)));
                for (cond, body) in arms {
                    let c = self.emit_expr(cond)?;
                    let c = self.is_nonzero(c);
                    let then = self.b.append_block("if.then");
                    let next = self.b.append_block("if.else");
                    self.b.build_cond_br(c, then, next);
                    self.b.position_at_end(then);
                    self.emit_block(body)?;
                    self.b.build_br(cont);
                    // The following arm, or the else body, tests from here.
                    self.b.position_at_end(next);
                }
                self.emit_block(else_body)?;
                self.b.build_br(cont);
                self.b.position_at_end(cont);
                Ok(())
            }
            Stmt::While { cond, body } => {
                let test = self.b.append_block("while.cond");
                let work = self.b.append_block("while.body");
                let end = self.b.append_block("while.end");
                self.b.build_br(test);
                self.b.position_at_end(test);
                let c = self.emit_expr(cond)?;
                let c = self.is_nonzero(c);
                self.b.build_cond_br(c, work, end);
                self.b.position_at_end(work);
                self.emit_block(body)?;
                self.b.build_br(test);
                self.b.position_at_end(end);
                Ok(())
            }
            Stmt::Print(args) => {
                let print = self.b.module_mut().get_or_insert_declaration(PRINT_SYMBOL, 1, true);
                let mut values = Vec::with_capacity(args.len() + 1);
                values.push(Value::Int(args.len() as i32));
                for a in args {
                    values.push(self.emit_expr(a)?);
                }
                self.b.build_call(print, values);
                Ok(())
            }
            Stmt::Return(e) => {
                let v = self.emit_expr(e)?;
                self.b.build_ret(v);
                // Whatever follows is unreachable but still lowered.
                let dead = self.b.append_block("after.ret");
                self.b.position_at_end(dead);
                Ok(())
            }
            Stmt::Pass => Ok(()),
        }
    }

    fn emit_expr(&mut self, e: &Expr) -> Result<Value> {
        match e {
            Expr::Number(n) => Ok(Value::Int(*n)),
            Expr::Variable(name) => {
                let ptr = self.variable(name);
                Ok(self.b.build_load(ptr))
            }
            Expr::Unary { op, operand } => {
                let v = self.emit_expr(operand)?;
                Ok(match op {
                    UnaryOp::Negate => self.b.build_binary(BinOp::Sub, Value::Int(0), v),
                    UnaryOp::Identity => v,
                    UnaryOp::Not => {
                        let z = self.is_zero(v);
                        self.b.build_zext(z)
                    }
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                // Both operands are always evaluated, `and`/`or` included.
                let l = self.emit_expr(lhs)?;
                let r = self.emit_expr(rhs)?;
                self.emit_binary(*op, l, r)
            }
            Expr::Call { callee, args } => {
                let func = self.resolve_callee(callee, args.len())?;
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.emit_expr(a)?);
                }
                Ok(self.b.build_call(func, values))
            }
        }
    }

    fn emit_binary(&mut self, op: BinaryOp, l: Value, r: Value) -> Result<Value> {
        let pred = match op {
            BinaryOp::Add => return Ok(self.b.build_binary(BinOp::Add, l, r)),
            BinaryOp::Sub => return Ok(self.b.build_binary(BinOp::Sub, l, r)),
            BinaryOp::Mul => return Ok(self.b.build_binary(BinOp::Mul, l, r)),
            BinaryOp::Div => return Ok(self.b.build_binary(BinOp::SDiv, l, r)),
            BinaryOp::Mod => return Ok(self.b.build_binary(BinOp::SRem, l, r)),
            BinaryOp::And | BinaryOp::Or => {
                let l = self.is_nonzero(l);
                let r = self.is_nonzero(r);
                let op = if op == BinaryOp::And {
                    BinOp::And
                } else {
                    BinOp::Or
                };
                let both = self.b.build_binary(op, l, r);
                return Ok(self.b.build_zext(both));
            }
            BinaryOp::Pow => {
                let pow = self.b.module_mut().get_or_insert_declaration(EXPONENTIATE_SYMBOL, 2, false);
                return Ok(self.b.build_call(pow, vec![l, r]));
            }
            BinaryOp::In | BinaryOp::NotIn => {
                return error(ErrorKind::Semantic, format!("Operator '{}' is not supported", op.symbol()));
            }
            BinaryOp::Lt => CmpPred::Slt,
            BinaryOp::Gt => CmpPred::Sgt,
            BinaryOp::Le => CmpPred::Sle,
            BinaryOp::Ge => CmpPred::Sge,
            BinaryOp::Eq => CmpPred::Eq,
            BinaryOp::Ne => CmpPred::Ne,
        };
        let c = self.b.build_icmp(pred, l, r);
        Ok(self.b.build_zext(c))
    }

    fn resolve_callee(&self, name: &str, argc: usize) -> Result<FuncId> {
        let module = self.b.module();
        let found = module
            .get_function(name)
            .and_then(|id| module.function(id).map(|f| (id, f)))
            .filter(|(_, f)| !f.synthetic);
        let Some((id, func)) = found else {
            return error(ErrorKind::Semantic, format!("Unknown function '{}'", name));
        };
        let arity = func.param_count as usize;
        if argc != arity && !(func.variadic && argc >= arity) {
            return error(
                ErrorKind::Semantic,
                format!("Function '{}' takes {} argument(s) but {} were given", name, arity, argc),
            );
        }
        Ok(id)
    }

    /// `i1` that is true when `v` is nonzero, built as a branch on
    /// `v == 0` joined by a phi.
    fn is_nonzero(&mut self, v: Value) -> Value {
        self.zero_test(v, false)
    }

    fn is_zero(&mut self, v: Value) -> Value {
        self.zero_test(v, true)
    }

    fn zero_test(&mut self, v: Value, when_zero: bool) -> Value {
        let zero = self.b.append_block("zero");
        let nonzero = self.b.append_block("nonzero");
        let cont = self.b.append_block("zero.cont");
        let c = self.b.build_icmp(CmpPred::Eq, Value::Int(0), v);
        self.b.build_cond_br(c, zero, nonzero);
        for blk in [zero, nonzero] {
            self.b.position_at_end(blk);
            self.b.build_br(cont);
        }
        self.b.position_at_end(cont);
        self.b.build_phi(
            Type::I1,
            vec![(Value::Bool(when_zero), zero), (Value::Bool(!when_zero), nonzero)],
        )
    }
}
