//! Module, function and block containers.

use std::collections::HashMap;

use garter_syntax::error::{error, ErrorKind, Result};

use crate::instruction::{Inst, Terminator};
use crate::types::{BlockId, FuncId, GlobalId, InstId, Linkage, Type, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    pub insts: Vec<InstId>,
    pub term: Option<Terminator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub param_count: u32,
    pub linkage: Linkage,
    /// Accepts extra `i32` arguments after the fixed ones.
    pub variadic: bool,
    /// Created by the compiler rather than written by the user; never
    /// resolvable from a call expression.
    pub synthetic: bool,
    pub(crate) blocks: Vec<Block>,
    pub(crate) insts: Vec<Inst>,
}

impl Function {
    pub fn new(name: impl Into<String>, param_count: u32, linkage: Linkage) -> Self {
        Self {
            name: name.into(),
            param_count,
            linkage,
            variadic: false,
            synthetic: false,
            blocks: Vec::new(),
            insts: Vec::new(),
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// A function without blocks only declares its symbol.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry(&self) -> Option<BlockId> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(BlockId(0))
        }
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i as u32), b))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.index()]
    }

    pub fn inst_count(&self) -> usize {
        self.insts.len()
    }

    pub fn value_type(&self, v: Value) -> Type {
        match v {
            Value::Bool(_) => Type::I1,
            Value::Int(_) | Value::Param(_) => Type::I32,
            Value::Global(_) => Type::Ptr,
            Value::Inst(id) => self.inst(id).result_type().unwrap_or(Type::I32),
        }
    }

    /// Predecessor list of every block, in block order.
    pub fn predecessors(&self) -> Vec<Vec<BlockId>> {
        let mut preds = vec![Vec::new(); self.blocks.len()];
        for (id, block) in self.blocks() {
            if let Some(term) = &block.term {
                for succ in term.successors() {
                    if !preds[succ.index()].contains(&id) {
                        preds[succ.index()].push(id);
                    }
                }
            }
        }
        preds
    }

    /// Blocks reachable from the entry block.
    pub fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.blocks.len()];
        let mut stack: Vec<BlockId> = self.entry().into_iter().collect();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            if let Some(term) = &self.block(id).term {
                stack.extend(term.successors());
            }
        }
        seen
    }
}

/// A module-scope `i32` cell with internal linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    pub init: i32,
}

/// Container of functions and global cells.
///
/// Erasing a function leaves a tombstone so the ids of the remaining
/// functions stay valid.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    functions: Vec<Option<Function>>,
    functions_by_name: HashMap<String, FuncId>,
    globals: Vec<Global>,
    globals_by_name: HashMap<String, GlobalId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Adds a function. Fails if a live function already has the name.
    pub fn add_function(&mut self, func: Function) -> Result<FuncId> {
        if self.functions_by_name.contains_key(&func.name) {
            return error(
                ErrorKind::Semantic,
                format!("Duplicate definition of function '{}'", func.name),
            );
        }
        let id = FuncId(self.functions.len() as u32);
        self.functions_by_name.insert(func.name.clone(), id);
        self.functions.push(Some(func));
        Ok(id)
    }

    /// Returns the named function, declaring it with external linkage first
    /// if it does not exist yet. Declarations made here are synthetic: they
    /// name runtime support routines, not user functions.
    pub fn get_or_insert_declaration(&mut self, name: &str, param_count: u32, variadic: bool) -> FuncId {
        if let Some(id) = self.get_function(name) {
            return id;
        }
        let mut func = Function::new(name, param_count, Linkage::External).synthetic();
        func.variadic = variadic;
        let id = FuncId(self.functions.len() as u32);
        self.functions_by_name.insert(name.to_string(), id);
        self.functions.push(Some(func));
        id
    }

    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.functions_by_name.get(name).copied()
    }

    /// `None` once the function has been erased.
    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.index()).and_then(Option::as_ref)
    }

    pub fn function_mut(&mut self, id: FuncId) -> Option<&mut Function> {
        self.functions.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn erase_function(&mut self, id: FuncId) -> Option<Function> {
        let func = self.functions.get_mut(id.index())?.take()?;
        self.functions_by_name.remove(&func.name);
        Some(func)
    }

    /// Live functions in creation order.
    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (FuncId(i as u32), f)))
    }

    /// Returns the named global, creating it with `init` if needed.
    pub fn global_cell(&mut self, name: &str, init: i32) -> GlobalId {
        if let Some(&id) = self.globals_by_name.get(name) {
            return id;
        }
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(Global { name: name.to_string(), init });
        self.globals_by_name.insert(name.to_string(), id);
        id
    }

    pub fn get_global(&self, name: &str) -> Option<GlobalId> {
        self.globals_by_name.get(name).copied()
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.index()]
    }

    pub fn globals(&self) -> impl Iterator<Item = (GlobalId, &Global)> {
        self.globals.iter().enumerate().map(|(i, g)| (GlobalId(i as u32), g))
    }

    /// Checks structural well-formedness of every defined function: each
    /// block ends in a terminator, branch targets exist, and each phi has
    /// exactly one incoming value per predecessor.
    pub fn verify(&self) -> Result<()> {
        for (_, func) in self.functions() {
            if func.is_declaration() {
                continue;
            }
            let fail = |msg: String| error(ErrorKind::Backend, format!("Invalid IR in function '{}': {}", func.name, msg));
            for (_, block) in func.blocks() {
                match &block.term {
                    None => return fail(format!("block '{}' has no terminator", block.name)),
                    Some(term) => {
                        if term.successors().iter().any(|s| s.index() >= func.block_count()) {
                            return fail(format!("block '{}' branches to a missing block", block.name));
                        }
                    }
                }
            }
            let preds = func.predecessors();
            for (id, block) in func.blocks() {
                for &inst in &block.insts {
                    if let Inst::Phi { incoming, .. } = func.inst(inst) {
                        let mut from: Vec<BlockId> = incoming.iter().map(|(_, b)| *b).collect();
                        from.sort();
                        let mut expected = preds[id.index()].clone();
                        expected.sort();
                        if from != expected {
                            return fail(format!("phi in block '{}' does not match its predecessors", block.name));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
