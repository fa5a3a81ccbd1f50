//! Instructions and block terminators.

use crate::types::{BlockId, FuncId, Type, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    And,
    Or,
}

impl BinOp {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::SRem => "srem",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

/// Signed integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Eq,
    Ne,
    Slt,
    Sgt,
    Sle,
    Sge,
}

impl CmpPred {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            CmpPred::Eq => "eq",
            CmpPred::Ne => "ne",
            CmpPred::Slt => "slt",
            CmpPred::Sgt => "sgt",
            CmpPred::Sle => "sle",
            CmpPred::Sge => "sge",
        }
    }

    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            CmpPred::Eq => lhs == rhs,
            CmpPred::Ne => lhs != rhs,
            CmpPred::Slt => lhs < rhs,
            CmpPred::Sgt => lhs > rhs,
            CmpPred::Sle => lhs <= rhs,
            CmpPred::Sge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    /// Stack slot for one `i32`, named after the variable it holds.
    Alloca { name: String },
    Load { ptr: Value },
    Store { value: Value, ptr: Value },
    Binary { op: BinOp, ty: Type, lhs: Value, rhs: Value },
    Icmp { pred: CmpPred, lhs: Value, rhs: Value },
    /// Widens an `i1` to `i32`.
    Zext { value: Value },
    Call { callee: FuncId, args: Vec<Value> },
    Phi { ty: Type, incoming: Vec<(Value, BlockId)> },
}

impl Inst {
    /// Type of the value the instruction produces, if any.
    pub fn result_type(&self) -> Option<Type> {
        match self {
            Inst::Alloca { .. } => Some(Type::Ptr),
            Inst::Load { .. } | Inst::Zext { .. } | Inst::Call { .. } => Some(Type::I32),
            Inst::Store { .. } => None,
            Inst::Binary { ty, .. } | Inst::Phi { ty, .. } => Some(*ty),
            Inst::Icmp { .. } => Some(Type::I1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Br(BlockId),
    CondBr { cond: Value, then_dest: BlockId, else_dest: BlockId },
    Ret(Value),
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br(dest) => vec![*dest],
            Terminator::CondBr { then_dest, else_dest, .. } => vec![*then_dest, *else_dest],
            Terminator::Ret(_) => Vec::new(),
        }
    }
}
