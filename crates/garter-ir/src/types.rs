//! Types, handles and operands of the garter IR.

use std::fmt;

/// The three value types the IR knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    I1,
    I32,
    Ptr,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I1 => write!(f, "i1"),
            Type::I32 => write!(f, "i32"),
            Type::Ptr => write!(f, "ptr"),
        }
    }
}

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

id_type!(
    /// A function in a [`Module`](crate::Module). Stays valid (and unused)
    /// after the function is erased.
    FuncId
);
id_type!(
    /// A module-scope `i32` cell.
    GlobalId
);
id_type!(
    /// A basic block within one function.
    BlockId
);
id_type!(
    /// An instruction within one function.
    InstId
);

/// Symbol visibility of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Visible to the linker.
    External,
    /// Private to the module.
    Internal,
    /// Declared only; resolves to null if nothing provides it at link time.
    ExternWeak,
}

impl Linkage {
    pub const fn keyword(self) -> &'static str {
        match self {
            Linkage::External => "",
            Linkage::Internal => "internal ",
            Linkage::ExternWeak => "extern_weak ",
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// `i1` constant.
    Bool(bool),
    /// `i32` constant.
    Int(i32),
    /// The n-th parameter of the enclosing function.
    Param(u32),
    /// The result of an instruction in the enclosing function.
    Inst(InstId),
    /// Address of a module global.
    Global(GlobalId),
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}
