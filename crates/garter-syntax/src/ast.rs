//! AST (abstract syntax tree) types for the garter language.
//!
//! The tree is a single owner of all of its children. Printing and code
//! generation both borrow it; nothing is shared or reference counted.
//!
//! `Display` renders a compact s-expression form, one top-level item per
//! line, which is what `garterc --emit ast` writes and what the parser
//! tests compare against.

use std::fmt;

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Negate,
    /// `+x`
    Identity,
    /// `not x`
    Not,
}

impl UnaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "neg",
            UnaryOp::Identity => "pos",
            UnaryOp::Not => "not",
        }
    }
}

/// Infix operators, from loosest to tightest binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }

    /// Comparison operators produce a 0/1 result.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::In
                | BinaryOp::NotIn
        )
    }
}

/// Expressions. Every value is a 32-bit signed integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i32),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

/// One `elif cond: body` arm of an `if` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElifClause {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// Statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign {
        target: String,
        value: Expr,
    },
    Expr(Expr),
    If {
        cond: Expr,
        body: Vec<Stmt>,
        elifs: Vec<ElifClause>,
        /// Empty when there is no `else` clause.
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Print(Vec<Expr>),
    Return(Expr),
    Pass,
}

/// `[extern] def name(params): body enddef`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub is_extern: bool,
}

impl FunctionDef {
    /// An `extern` definition with an empty body only declares the symbol.
    pub fn is_declaration(&self) -> bool {
        self.is_extern && self.body.is_empty()
    }
}

/// Top-level program items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Function(FunctionDef),
    Stmt(Stmt),
}

/// Entire program; item order is both declaration and execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            Item::Stmt(_) => None,
        })
    }

    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.items.iter().filter_map(|item| match item {
            Item::Stmt(s) => Some(s),
            Item::Function(_) => None,
        })
    }
}

fn write_all<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for item in items {
        write!(f, " {}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Unary { op, operand } => write!(f, "({} {})", op.symbol(), operand),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", op.symbol(), lhs, rhs),
            Expr::Call { callee, args } => {
                write!(f, "(call {}", callee)?;
                write_all(f, args)?;
                write!(f, ")")
            }
        }
    }
}

struct Block<'a>(&'a [Stmt]);

impl fmt::Display for Block<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { target, value } => write!(f, "(= {} {})", target, value),
            Stmt::Expr(e) => write!(f, "(expr {})", e),
            Stmt::If {
                cond,
                body,
                elifs,
                else_body,
            } => {
                write!(f, "(if {} {}", cond, Block(body))?;
                for clause in elifs {
                    write!(f, " (elif {} {})", clause.cond, Block(&clause.body))?;
                }
                if !else_body.is_empty() {
                    write!(f, " (else {})", Block(else_body))?;
                }
                write!(f, ")")
            }
            Stmt::While { cond, body } => write!(f, "(while {} {})", cond, Block(body)),
            Stmt::Print(args) => {
                write!(f, "(print")?;
                write_all(f, args)?;
                write!(f, ")")
            }
            Stmt::Return(e) => write!(f, "(return {})", e),
            Stmt::Pass => write!(f, "(pass)"),
        }
    }
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extern {
            write!(f, "(extern ")?;
        } else {
            write!(f, "(")?;
        }
        write!(f, "def {} ({}) {})", self.name, self.params.join(" "), Block(&self.body))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Function(func) => write!(f, "{}", func),
            Item::Stmt(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn displays_nested_expression() {
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::unary(
                UnaryOp::Negate,
                Expr::binary(BinaryOp::Pow, Expr::Number(10), Expr::Number(2)),
            ),
            Expr::Call {
                callee: "f".into(),
                args: vec![Expr::Variable("b".into()), Expr::Number(1)],
            },
        );
        assert_eq!(e.to_string(), "(+ (neg (** 10 2)) (call f b 1))");
    }

    #[test]
    fn displays_if_chain_and_functions() {
        let program = Program {
            items: vec![
                Item::Function(FunctionDef {
                    name: "ext".into(),
                    params: vec!["a".into(), "b".into()],
                    body: vec![],
                    is_extern: true,
                }),
                Item::Stmt(Stmt::If {
                    cond: Expr::Variable("x".into()),
                    body: vec![Stmt::Pass],
                    elifs: vec![ElifClause {
                        cond: Expr::Number(1),
                        body: vec![Stmt::Print(vec![])],
                    }],
                    else_body: vec![Stmt::Return(Expr::Number(0))],
                }),
            ],
        };
        assert_eq!(
            program.to_string(),
            "(extern def ext (a b) ())\n(if x ((pass)) (elif 1 ((print))) (else ((return 0))))\n"
        );
        assert!(program.functions().next().unwrap().is_declaration());
        assert_eq!(program.statements().count(), 1);
    }
}
