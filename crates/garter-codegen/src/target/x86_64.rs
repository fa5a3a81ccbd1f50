use std::{format_args as f, io, marker::PhantomData};

use garter_ir::{BinOp, BlockId, CmpPred, FuncId, Function, Inst, InstId, Linkage, Module, Terminator, Value};

use crate::target::x86_64_env;

/// Integer argument registers of the System V calling convention.
const ARG_REGISTERS: [&str; 6] = ["%edi", "%esi", "%edx", "%ecx", "%r8d", "%r9d"];

/// Emits AT&T assembly for a whole module.
///
/// Code generation is deliberately naive: every register parameter and
/// every instruction result gets a 4-byte slot below `%rbp`, and each
/// instruction reloads its operands from there. Phi nodes are resolved by
/// copies on the incoming edges.
pub struct Generator<'m, W, E> {
    writer: W,
    module: &'m Module,
    indent: bool,
    error: Option<io::Error>,
    edges: usize,
    _env: PhantomData<E>,
}

impl<'m, W, E> Generator<'m, W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    pub fn new(writer: W, module: &'m Module) -> Generator<'m, W, E> {
        Generator {
            writer,
            module,
            indent: false,
            error: None,
            edges: 0,
            _env: PhantomData,
        }
    }

    /// Writes the module. The first write or lowering failure is returned.
    pub fn generate(mut self) -> io::Result<()> {
        self.g_program_prologue();
        self.g_functions();
        self.g_data();
        match self.error.take() {
            Some(e) => Err(e),
            None => self.writer.flush(),
        }
    }
}

/// Stack layout of one function.
struct Frame {
    params: Vec<i32>,
    insts: Vec<Option<i32>>,
    size: i32,
}

impl Frame {
    fn layout(func: &Function) -> Frame {
        let mut next = 0;
        let mut alloc = || {
            next += 4;
            -next
        };
        let params = (0..func.param_count.min(ARG_REGISTERS.len() as u32)).map(|_| alloc()).collect();
        let mut insts = vec![None; func.inst_count()];
        for (_, block) in func.blocks() {
            for &id in &block.insts {
                if func.inst(id).result_type().is_some() {
                    insts[id.index()] = Some(alloc());
                }
            }
        }
        // Keeps %rsp 16-byte aligned at every call site.
        let size = (next + 15) / 16 * 16;
        Frame { params, insts, size }
    }

    fn slot(&self, id: InstId) -> String {
        match self.insts[id.index()] {
            Some(offset) => format!("{}(%rbp)", offset),
            None => unreachable!("instruction without a result used as an operand"),
        }
    }
}

/// Target-specific functions.
impl<W, E> Generator<'_, W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    fn g_program_prologue(&mut self) {
        self.out(E::GLOBAL_PROLOGUE);
    }

    fn g_functions(&mut self) {
        self.out(f!(".section {}", E::SECTION_TEXT));
        let module = self.module;
        for (id, func) in module.functions() {
            if func.is_declaration() {
                if func.linkage == Linkage::ExternWeak {
                    self.out(f!("{} {}", E::WEAK_REFERENCE, self.symbol(func)));
                }
                continue;
            }
            self.g_function(id, func);
        }
        self.out_line();
    }

    fn g_function(&mut self, id: FuncId, func: &Function) {
        let frame = Frame::layout(func);
        let symbol = self.symbol(func);
        if func.linkage == Linkage::External {
            self.out(f!(".globl {symbol}"));
        }
        self.out(".p2align 4, 0x90");
        self.out(f!("{symbol}:"));
        self.indented(|this| {
            this.out("pushq %rbp");
            this.out("movq %rsp, %rbp");
            if frame.size > 0 {
                this.out(f!("subq ${}, %rsp", frame.size));
            }
            for (offset, reg) in frame.params.iter().zip(ARG_REGISTERS) {
                this.out(f!("movl {reg}, {offset}(%rbp)"));
            }

            let reachable = func.reachable();
            for (block_id, block) in func.blocks() {
                if !reachable[block_id.index()] {
                    continue;
                }
                this.label(&Self::block_label(id, block_id));
                for &inst in &block.insts {
                    this.g_inst(func, &frame, inst);
                }
                match &block.term {
                    Some(term) => this.g_terminator(id, func, &frame, block_id, term),
                    None => this.fail(format!("block '{}' in '{}' has no terminator", block.name, func.name)),
                }
            }
        });
    }

    fn g_inst(&mut self, func: &Function, frame: &Frame, id: InstId) {
        match func.inst(id) {
            // The slot of an alloca holds the variable itself.
            Inst::Alloca { .. } | Inst::Phi { .. } => {}
            Inst::Load { ptr } => {
                self.out(f!("movl {}, %eax", self.operand(frame, *ptr)));
                self.out(f!("movl %eax, {}", frame.slot(id)));
            }
            Inst::Store { value, ptr } => {
                self.out(f!("movl {}, %eax", self.operand(frame, *value)));
                self.out(f!("movl %eax, {}", self.operand(frame, *ptr)));
            }
            Inst::Binary { op, lhs, rhs, .. } => {
                self.out(f!("movl {}, %eax", self.operand(frame, *lhs)));
                self.out(f!("movl {}, %ecx", self.operand(frame, *rhs)));
                let result = match op {
                    BinOp::Add => {
                        self.out("addl %ecx, %eax");
                        "%eax"
                    }
                    BinOp::Sub => {
                        self.out("subl %ecx, %eax");
                        "%eax"
                    }
                    BinOp::Mul => {
                        self.out("imull %ecx, %eax");
                        "%eax"
                    }
                    BinOp::And => {
                        self.out("andl %ecx, %eax");
                        "%eax"
                    }
                    BinOp::Or => {
                        self.out("orl %ecx, %eax");
                        "%eax"
                    }
                    BinOp::SDiv | BinOp::SRem => {
                        self.out("cltd");
                        self.out("idivl %ecx");
                        if *op == BinOp::SDiv { "%eax" } else { "%edx" }
                    }
                };
                self.out(f!("movl {result}, {}", frame.slot(id)));
            }
            Inst::Icmp { pred, lhs, rhs } => {
                self.out(f!("movl {}, %eax", self.operand(frame, *lhs)));
                self.out(f!("movl {}, %ecx", self.operand(frame, *rhs)));
                self.out("cmpl %ecx, %eax");
                self.out(f!("{} %al", set_instruction(*pred)));
                self.out("movzbl %al, %eax");
                self.out(f!("movl %eax, {}", frame.slot(id)));
            }
            Inst::Zext { value } => {
                self.out(f!("movl {}, %eax", self.operand(frame, *value)));
                self.out(f!("movl %eax, {}", frame.slot(id)));
            }
            Inst::Call { callee, args } => {
                let module = self.module;
                let Some(target) = module.function(*callee) else {
                    return self.fail(format!("'{}' calls an erased function", func.name));
                };
                let stack_args = args.len().saturating_sub(ARG_REGISTERS.len());
                let padding = if stack_args % 2 == 1 { 8 } else { 0 };
                if padding > 0 {
                    self.out(f!("subq ${padding}, %rsp"));
                }
                for arg in args.iter().skip(ARG_REGISTERS.len()).rev() {
                    self.out(f!("movl {}, %eax", self.operand(frame, *arg)));
                    self.out("pushq %rax");
                }
                for (arg, reg) in args.iter().zip(ARG_REGISTERS) {
                    self.out(f!("movl {}, {reg}", self.operand(frame, *arg)));
                }
                if target.variadic {
                    // No vector registers carry arguments.
                    self.out("xorl %eax, %eax");
                }
                let suffix = if target.is_declaration() {
                    E::EXTERN_CALL_SUFFIX
                } else {
                    ""
                };
                self.out(f!("call {}{suffix}", self.symbol(target)));
                if stack_args > 0 {
                    self.out(f!("addq ${}, %rsp", 8 * stack_args + padding));
                }
                self.out(f!("movl %eax, {}", frame.slot(id)));
            }
        }
    }

    fn g_terminator(&mut self, id: FuncId, func: &Function, frame: &Frame, from: BlockId, term: &Terminator) {
        match term {
            Terminator::Br(dest) => {
                self.g_phi_copies(func, frame, from, *dest);
                self.out(f!("jmp {}", Self::block_label(id, *dest)));
            }
            Terminator::CondBr { cond, then_dest, else_dest } => {
                self.out(f!("movl {}, %eax", self.operand(frame, *cond)));
                self.out("testl %eax, %eax");
                if Self::has_phi_from(func, from, *else_dest) {
                    let edge = format!("{}edge{}_{}", E::PRIVATE_PREFIX, id.index(), self.edges);
                    self.edges += 1;
                    self.out(f!("je {edge}"));
                    self.g_phi_copies(func, frame, from, *then_dest);
                    self.out(f!("jmp {}", Self::block_label(id, *then_dest)));
                    self.label(&edge);
                    self.g_phi_copies(func, frame, from, *else_dest);
                    self.out(f!("jmp {}", Self::block_label(id, *else_dest)));
                } else {
                    self.out(f!("je {}", Self::block_label(id, *else_dest)));
                    self.g_phi_copies(func, frame, from, *then_dest);
                    self.out(f!("jmp {}", Self::block_label(id, *then_dest)));
                }
            }
            Terminator::Ret(value) => {
                self.out(f!("movl {}, %eax", self.operand(frame, *value)));
                self.out("leave");
                self.out("ret");
            }
        }
    }

    /// Stores the values `to`'s phis take when entered from `from`.
    fn g_phi_copies(&mut self, func: &Function, frame: &Frame, from: BlockId, to: BlockId) {
        for &inst in &func.block(to).insts {
            if let Inst::Phi { incoming, .. } = func.inst(inst) {
                if let Some((value, _)) = incoming.iter().find(|(_, b)| *b == from) {
                    self.out(f!("movl {}, %eax", self.operand(frame, *value)));
                    self.out(f!("movl %eax, {}", frame.slot(inst)));
                }
            }
        }
    }

    fn has_phi_from(func: &Function, from: BlockId, to: BlockId) -> bool {
        func.block(to).insts.iter().any(|&inst| match func.inst(inst) {
            Inst::Phi { incoming, .. } => incoming.iter().any(|(_, b)| *b == from),
            _ => false,
        })
    }

    fn g_data(&mut self) {
        let module = self.module;
        if module.globals().next().is_none() {
            return;
        }
        self.out(f!(".section {}", E::SECTION_DATA));
        self.out(".p2align 2");
        for (_, global) in module.globals() {
            self.label(&format!("{}var_{}", E::PRIVATE_PREFIX, global.name));
            self.indented(|this| this.out(f!(".long {}", global.init)));
        }
    }

    /// Renders an operand. Allocas and globals render as the memory they
    /// name, so loads and stores address them directly.
    fn operand(&self, frame: &Frame, value: Value) -> String {
        match value {
            Value::Int(n) => format!("${}", n),
            Value::Bool(b) => format!("${}", b as i32),
            Value::Param(i) => match frame.params.get(i as usize) {
                Some(offset) => format!("{}(%rbp)", offset),
                // Return address and saved %rbp sit between the frame and
                // the caller's stack arguments.
                None => format!("{}(%rbp)", 16 + 8 * (i as usize).saturating_sub(ARG_REGISTERS.len())),
            },
            Value::Inst(id) => frame.slot(id),
            Value::Global(g) => format!("{}var_{}(%rip)", E::PRIVATE_PREFIX, self.module.global(g).name),
        }
    }

    fn symbol(&self, func: &Function) -> String {
        format!("{}{}", E::SYMBOL_PREFIX, func.name)
    }

    fn block_label(func: FuncId, block: BlockId) -> String {
        format!("{}BB{}_{}", E::PRIVATE_PREFIX, func.index(), block.index())
    }

    fn fail(&mut self, msg: String) {
        if self.error.is_none() {
            self.error = Some(io::Error::new(io::ErrorKind::InvalidInput, msg));
        }
    }
}

fn set_instruction(pred: CmpPred) -> &'static str {
    match pred {
        CmpPred::Eq => "sete",
        CmpPred::Ne => "setne",
        CmpPred::Slt => "setl",
        CmpPred::Sgt => "setg",
        CmpPred::Sle => "setle",
        CmpPred::Sge => "setge",
    }
}

/// Utility functions.
impl<W, E> Generator<'_, W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    /// Prints a line.
    fn out(&mut self, f: impl std::fmt::Display) {
        let indent = if self.indent { "    " } else { "" };
        if let Err(e) = writeln!(self.writer, "{indent}{f}") {
            self.error.get_or_insert(e);
        }
    }

    /// Prints an empty line.
    fn out_line(&mut self) {
        if let Err(e) = writeln!(self.writer) {
            self.error.get_or_insert(e);
        }
    }

    /// Prints a label at column zero, even inside an indented block.
    fn label(&mut self, name: &str) {
        let indent = std::mem::replace(&mut self.indent, false);
        self.out(f!("{name}:"));
        self.indent = indent;
    }

    /// Writes in an indented block that is finished with an empty line.
    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        self.out_line();
        res
    }
}
