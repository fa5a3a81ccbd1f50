//! Instruction builder positioned at the end of one block.

use crate::instruction::{BinOp, CmpPred, Inst, Terminator};
use crate::module::{Block, Function, Module};
use crate::types::{BlockId, FuncId, InstId, Type, Value};

/// Appends blocks and instructions to one function of a module.
///
/// The builder holds the module mutably for its whole lifetime; use
/// [`Builder::module`] for lookups while building.
pub struct Builder<'m> {
    module: &'m mut Module,
    func: FuncId,
    block: Option<BlockId>,
    entry_allocas: usize,
    entry_stores: usize,
}

impl<'m> Builder<'m> {
    /// Panics if `func` has been erased.
    pub fn new(module: &'m mut Module, func: FuncId) -> Self {
        assert!(module.function(func).is_some(), "builder created for an erased function");
        Self { module, func, block: None, entry_allocas: 0, entry_stores: 0 }
    }

    pub fn module(&self) -> &Module {
        &*self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut *self.module
    }

    pub fn func_id(&self) -> FuncId {
        self.func
    }

    fn func(&self) -> &Function {
        match self.module.function(self.func) {
            Some(f) => f,
            None => unreachable!("function erased while being built"),
        }
    }

    fn func_mut(&mut self) -> &mut Function {
        match self.module.function_mut(self.func) {
            Some(f) => f,
            None => unreachable!("function erased while being built"),
        }
    }

    /// Appends an empty block. Names are made unique within the function.
    pub fn append_block(&mut self, name: &str) -> BlockId {
        let func = self.func_mut();
        let id = BlockId(func.blocks.len() as u32);
        let name = if func.blocks.iter().any(|b| b.name == name) {
            format!("{}{}", name, id.0)
        } else {
            name.to_string()
        };
        func.blocks.push(Block { name, insts: Vec::new(), term: None });
        id
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.block = Some(block);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.block
    }

    /// `true` if the insertion block already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.block.map_or(false, |b| self.func().block(b).term.is_some())
    }

    pub fn value_type(&self, v: Value) -> Type {
        self.func().value_type(v)
    }

    fn insertion_block(&self) -> BlockId {
        match self.block {
            Some(b) => b,
            None => unreachable!("builder is not positioned at a block"),
        }
    }

    fn push(&mut self, inst: Inst) -> Value {
        let block = self.insertion_block();
        debug_assert!(!self.is_terminated(), "emitting into a terminated block");
        let func = self.func_mut();
        let id = InstId(func.insts.len() as u32);
        func.insts.push(inst);
        func.blocks[block.index()].insts.push(id);
        Value::Inst(id)
    }

    fn terminate(&mut self, term: Terminator) {
        let block = self.insertion_block();
        debug_assert!(!self.is_terminated(), "block terminated twice");
        self.func_mut().blocks[block.index()].term = Some(term);
    }

    /// Creates an `i32` slot initialized to `init` in the entry block
    /// prologue, regardless of the insertion point. The prologue holds all
    /// slots first, then their initializing stores, then ordinary code.
    pub fn build_entry_alloca(&mut self, name: &str, init: Value) -> Value {
        let (allocas, stores) = (self.entry_allocas, self.entry_stores);
        let func = self.func_mut();
        let slot = InstId(func.insts.len() as u32);
        func.insts.push(Inst::Alloca { name: name.to_string() });
        let store = InstId(func.insts.len() as u32);
        func.insts.push(Inst::Store { value: init, ptr: Value::Inst(slot) });
        let entry = &mut func.blocks[0];
        entry.insts.insert(allocas, slot);
        entry.insts.insert(allocas + 1 + stores, store);
        self.entry_allocas += 1;
        self.entry_stores += 1;
        Value::Inst(slot)
    }

    pub fn build_load(&mut self, ptr: Value) -> Value {
        self.push(Inst::Load { ptr })
    }

    pub fn build_store(&mut self, value: Value, ptr: Value) {
        self.push(Inst::Store { value, ptr });
    }

    /// Result type follows the left operand (`i1` for logical and/or).
    pub fn build_binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        let ty = self.value_type(lhs);
        self.push(Inst::Binary { op, ty, lhs, rhs })
    }

    pub fn build_icmp(&mut self, pred: CmpPred, lhs: Value, rhs: Value) -> Value {
        self.push(Inst::Icmp { pred, lhs, rhs })
    }

    pub fn build_zext(&mut self, value: Value) -> Value {
        self.push(Inst::Zext { value })
    }

    pub fn build_call(&mut self, callee: FuncId, args: Vec<Value>) -> Value {
        self.push(Inst::Call { callee, args })
    }

    pub fn build_phi(&mut self, ty: Type, incoming: Vec<(Value, BlockId)>) -> Value {
        self.push(Inst::Phi { ty, incoming })
    }

    pub fn build_br(&mut self, dest: BlockId) {
        self.terminate(Terminator::Br(dest));
    }

    pub fn build_cond_br(&mut self, cond: Value, then_dest: BlockId, else_dest: BlockId) {
        self.terminate(Terminator::CondBr { cond, then_dest, else_dest });
    }

    pub fn build_ret(&mut self, value: Value) {
        self.terminate(Terminator::Ret(value));
    }
}
