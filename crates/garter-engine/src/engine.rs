//! Execution engine core.

use std::collections::HashMap;
use std::io::{self, Write};

use garter_ir::{BinOp, BlockId, FuncId, GlobalId, Inst, InstId, Module, Terminator, Value};
use garter_syntax::error::{error, ErrorKind, Result};

use crate::runtime::{self, NativeFn};

/// Deepest call nesting allowed before execution is aborted.
pub const MAX_CALL_DEPTH: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Undef,
    Int(i32),
    Bool(bool),
    Local(usize),
    Global(GlobalId),
}

struct Frame {
    func: FuncId,
    block: BlockId,
    prev_block: Option<BlockId>,
    ip: usize,
    params: Vec<i32>,
    values: Vec<Slot>,
    memory: Vec<i32>,
    /// Instruction waiting for the result of the active callee.
    pending: Option<InstId>,
}

enum Step {
    Next,
    Call(FuncId, Vec<i32>),
    Return(i32),
}

fn fault<T>(msg: impl Into<String>) -> Result<T> {
    error(ErrorKind::Runtime, msg)
}

/// Executes functions of a [`Module`] directly from their IR.
///
/// Global cells live in the engine, not the module, so their values persist
/// across runs for as long as the engine does. Cells the module gains after
/// the engine was created are picked up with their initial value on the
/// next run.
pub struct Engine {
    globals: Vec<i32>,
    natives: HashMap<String, NativeFn>,
    out: Box<dyn Write>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine printing to standard output, with no natives mapped.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self { globals: Vec::new(), natives: HashMap::new(), out }
    }

    /// Maps a declared symbol to a native implementation.
    pub fn add_global_mapping(&mut self, symbol: &str, native: NativeFn) {
        self.natives.insert(symbol.to_string(), native);
    }

    /// Maps the runtime library's print and exponentiation entry points.
    pub fn map_runtime(&mut self) {
        self.add_global_mapping(runtime::PRINT_SYMBOL, runtime::print);
        self.add_global_mapping(runtime::EXPONENTIATE_SYMBOL, runtime::native_exponentiate);
    }

    /// Current value of a named global cell, if it exists.
    pub fn global_value(&mut self, module: &Module, name: &str) -> Option<i32> {
        self.sync_globals(module);
        module.get_global(name).map(|g| self.globals[g.index()])
    }

    fn sync_globals(&mut self, module: &Module) {
        for (id, g) in module.globals().skip(self.globals.len()) {
            debug_assert_eq!(id.index(), self.globals.len());
            self.globals.push(g.init);
        }
    }

    /// Runs `func` to completion and returns its result.
    pub fn run_function(&mut self, module: &Module, func: FuncId, args: &[i32]) -> Result<i32> {
        self.sync_globals(module);
        let mut frames = Vec::new();
        match self.enter(module, func, args.to_vec())? {
            Ok(frame) => frames.push(frame),
            Err(result) => return Ok(result),
        }
        loop {
            let step = match frames.last_mut() {
                Some(frame) => self.step(module, frame)?,
                None => unreachable!("frame stack emptied without a return"),
            };
            match step {
                Step::Next => {}
                Step::Call(callee, args) => match self.enter(module, callee, args)? {
                    Ok(frame) => {
                        if frames.len() >= MAX_CALL_DEPTH {
                            return fault(format!("Maximum call depth of {} exceeded", MAX_CALL_DEPTH));
                        }
                        frames.push(frame);
                    }
                    Err(result) => Self::resume(&mut frames, result),
                },
                Step::Return(result) => {
                    frames.pop();
                    if frames.is_empty() {
                        return Ok(result);
                    }
                    Self::resume(&mut frames, result);
                }
            }
        }
    }

    fn resume(frames: &mut [Frame], result: i32) {
        if let Some(caller) = frames.last_mut() {
            if let Some(inst) = caller.pending.take() {
                caller.values[inst.index()] = Slot::Int(result);
            }
        }
    }

    /// Creates a frame for a defined function, or calls a native directly
    /// and hands back its result.
    fn enter(&mut self, module: &Module, func: FuncId, args: Vec<i32>) -> Result<std::result::Result<Frame, i32>> {
        let Some(f) = module.function(func) else {
            return fault("Call to a function that has been erased");
        };
        if f.is_declaration() {
            let Some(native) = self.natives.get(&f.name) else {
                return fault(format!("Unresolved external function '{}'", f.name));
            };
            return match native(&mut *self.out, &args) {
                Ok(result) => Ok(Err(result)),
                Err(e) => fault(format!("'{}' failed: {}", f.name, e)),
            };
        }
        let Some(entry) = f.entry() else {
            return fault(format!("Function '{}' has no entry block", f.name));
        };
        Ok(Ok(Frame {
            func,
            block: entry,
            prev_block: None,
            ip: 0,
            params: args,
            values: vec![Slot::Undef; f.inst_count()],
            memory: Vec::new(),
            pending: None,
        }))
    }

    fn eval(&self, frame: &Frame, v: Value) -> Slot {
        match v {
            Value::Bool(b) => Slot::Bool(b),
            Value::Int(n) => Slot::Int(n),
            Value::Param(i) => frame.params.get(i as usize).map_or(Slot::Undef, |&n| Slot::Int(n)),
            Value::Inst(id) => frame.values[id.index()],
            Value::Global(g) => Slot::Global(g),
        }
    }

    fn int(&self, frame: &Frame, v: Value) -> Result<i32> {
        match self.eval(frame, v) {
            Slot::Int(n) => Ok(n),
            Slot::Bool(b) => Ok(b as i32),
            other => fault(format!("Expected an integer operand, found {:?}", other)),
        }
    }

    fn step(&mut self, module: &Module, frame: &mut Frame) -> Result<Step> {
        let Some(func) = module.function(frame.func) else {
            return fault("Executing a function that has been erased");
        };
        let block = func.block(frame.block);

        let Some(&id) = block.insts.get(frame.ip) else {
            let to = |frame: &mut Frame, dest: BlockId| {
                frame.prev_block = Some(frame.block);
                frame.block = dest;
                frame.ip = 0;
            };
            return match &block.term {
                Some(Terminator::Br(dest)) => {
                    to(frame, *dest);
                    Ok(Step::Next)
                }
                Some(Terminator::CondBr { cond, then_dest, else_dest }) => {
                    let taken = self.int(frame, *cond)? != 0;
                    to(frame, if taken { *then_dest } else { *else_dest });
                    Ok(Step::Next)
                }
                Some(Terminator::Ret(v)) => Ok(Step::Return(self.int(frame, *v)?)),
                None => fault(format!("Block '{}' in '{}' has no terminator", block.name, func.name)),
            };
        };
        frame.ip += 1;

        let result = match func.inst(id) {
            Inst::Alloca { .. } => {
                frame.memory.push(0);
                Slot::Local(frame.memory.len() - 1)
            }
            Inst::Load { ptr } => match self.eval(frame, *ptr) {
                Slot::Local(i) => Slot::Int(frame.memory[i]),
                Slot::Global(g) => Slot::Int(self.globals[g.index()]),
                other => return fault(format!("Load through a non-pointer {:?}", other)),
            },
            Inst::Store { value, ptr } => {
                let value = self.int(frame, *value)?;
                match self.eval(frame, *ptr) {
                    Slot::Local(i) => frame.memory[i] = value,
                    Slot::Global(g) => self.globals[g.index()] = value,
                    other => return fault(format!("Store through a non-pointer {:?}", other)),
                }
                Slot::Undef
            }
            Inst::Binary { op, lhs, rhs, .. } => {
                let (a, b) = (self.eval(frame, *lhs), self.eval(frame, *rhs));
                match (op, a, b) {
                    (BinOp::And, Slot::Bool(a), Slot::Bool(b)) => Slot::Bool(a && b),
                    (BinOp::Or, Slot::Bool(a), Slot::Bool(b)) => Slot::Bool(a || b),
                    _ => Slot::Int(arith(*op, self.int(frame, *lhs)?, self.int(frame, *rhs)?)?),
                }
            }
            Inst::Icmp { pred, lhs, rhs } => {
                Slot::Bool(pred.holds(self.int(frame, *lhs)?, self.int(frame, *rhs)?))
            }
            Inst::Zext { value } => Slot::Int(self.int(frame, *value)?),
            Inst::Phi { incoming, .. } => {
                let from = incoming.iter().find(|(_, b)| Some(*b) == frame.prev_block);
                match from {
                    Some((v, _)) => self.eval(frame, *v),
                    None => return fault(format!("Phi in '{}' has no value for the incoming edge", func.name)),
                }
            }
            Inst::Call { callee, args } => {
                let args = args.iter().map(|a| self.int(frame, *a)).collect::<Result<Vec<_>>>()?;
                frame.pending = Some(id);
                return Ok(Step::Call(*callee, args));
            }
        };
        frame.values[id.index()] = result;
        Ok(Step::Next)
    }
}

fn arith(op: BinOp, a: i32, b: i32) -> Result<i32> {
    Ok(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::SDiv | BinOp::SRem if b == 0 => return fault("Division by zero"),
        BinOp::SDiv => match a.checked_div(b) {
            Some(q) => q,
            None => return fault("Integer overflow in division"),
        },
        BinOp::SRem => match a.checked_rem(b) {
            Some(r) => r,
            None => return fault("Integer overflow in division"),
        },
        BinOp::And => a & b,
        BinOp::Or => a | b,
    })
}
