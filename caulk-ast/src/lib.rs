#![forbid(unsafe_code)]

use std::fmt;

pub mod lower;

pub use lower::{LowerError, ParseTree, lower_expr, lower_stmt};

/// Identifier of a hole occurrence, assigned in discovery order by the
/// synthesis session. Sketch builders may leave the default; hole detection
/// renumbers every occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HoleId(pub u32);

impl fmt::Display for HoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hole_{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Ne,
    Gt,
    Lt,
    Le,
    Ge,
    Eq,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Ne => "!=",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "=",
        }
    }

    pub fn from_tag(tag: &str) -> Option<BinOp> {
        Some(match tag {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "!=" => BinOp::Ne,
            ">" => BinOp::Gt,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            ">=" => BinOp::Ge,
            "=" => BinOp::Eq,
            _ => return None,
        })
    }
}

/// Raw rows of an array literal. Shape validation (equal row widths) happens
/// at array construction time, not here.
#[derive(Clone, Debug, PartialEq)]
pub enum Rows {
    Flat(Vec<Expr>),
    Nested(Vec<Vec<Expr>>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(i64),
    Variable(String),
    Hole(HoleId),
    BinaryOp {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    ArrayLiteral(Rows),
    ArrayAccess {
        array: String,
        outer: Box<Expr>,
        /// `None` is the one-dimensional access shape.
        inner: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn lit(n: i64) -> Expr {
        Expr::Literal(n)
    }

    pub fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    pub fn hole() -> Expr {
        Expr::Hole(HoleId::default())
    }

    pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn access(array: &str, outer: Expr) -> Expr {
        Expr::ArrayAccess {
            array: array.to_string(),
            outer: Box::new(outer),
            inner: None,
        }
    }

    pub fn access2(array: &str, outer: Expr, inner: Expr) -> Expr {
        Expr::ArrayAccess {
            array: array.to_string(),
            outer: Box::new(outer),
            inner: Some(Box::new(inner)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Skip,
    Assign {
        name: String,
        value: Expr,
    },
    ArrayInit {
        name: String,
        value: Rows,
    },
    ArrayUpdate {
        array: String,
        outer: Expr,
        /// `None` is the one-dimensional update shape.
        inner: Option<Expr>,
        value: Expr,
    },
    Seq(Box<Stmt>, Box<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Assert(Expr),
}

impl Stmt {
    pub fn assign(name: &str, value: Expr) -> Stmt {
        Stmt::Assign {
            name: name.to_string(),
            value,
        }
    }

    pub fn array_init(name: &str, value: Rows) -> Stmt {
        Stmt::ArrayInit {
            name: name.to_string(),
            value,
        }
    }

    /// Folds a statement list into right-nested sequences.
    pub fn seq(stmts: Vec<Stmt>) -> Stmt {
        let mut iter = stmts.into_iter().rev();
        let Some(last) = iter.next() else {
            return Stmt::Skip;
        };
        iter.fold(last, |acc, s| Stmt::Seq(Box::new(s), Box::new(acc)))
    }

    pub fn if_else(cond: Expr, then_branch: Stmt, else_branch: Stmt) -> Stmt {
        Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn while_do(cond: Expr, body: Stmt) -> Stmt {
        Stmt::While {
            cond,
            body: Box::new(body),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(n) => write!(f, "{n}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Hole(_) => write!(f, "??"),
            Expr::BinaryOp { op, lhs, rhs } => {
                write!(f, "({lhs} {} {rhs})", op.symbol())
            }
            Expr::ArrayLiteral(rows) => write_rows(f, rows),
            Expr::ArrayAccess {
                array,
                outer,
                inner,
            } => {
                write!(f, "{array}[{outer}]")?;
                if let Some(inner) = inner {
                    write!(f, "[{inner}]")?;
                }
                Ok(())
            }
        }
    }
}

fn write_rows(f: &mut fmt::Formatter<'_>, rows: &Rows) -> fmt::Result {
    let comma_sep = |f: &mut fmt::Formatter<'_>, items: &[Expr]| -> fmt::Result {
        for (i, e) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    };
    match rows {
        Rows::Flat(items) => {
            write!(f, "[")?;
            comma_sep(f, items)?;
            write!(f, "]")
        }
        Rows::Nested(rows) => {
            write!(f, "[")?;
            for (i, row) in rows.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "[")?;
                comma_sep(f, row)?;
                write!(f, "]")?;
            }
            write!(f, "]")
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Skip => write!(f, "skip"),
            Stmt::Assign { name, value } => write!(f, "{name} := {value}"),
            Stmt::ArrayInit { name, value } => {
                write!(f, "{name} := ")?;
                write_rows(f, value)
            }
            Stmt::ArrayUpdate {
                array,
                outer,
                inner,
                value,
            } => {
                write!(f, "{array}[{outer}]")?;
                if let Some(inner) = inner {
                    write!(f, "[{inner}]")?;
                }
                write!(f, " := {value}")
            }
            Stmt::Seq(a, b) => write!(f, "{a}; {b}"),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "if {cond} then ({then_branch}) else ({else_branch})"),
            Stmt::While { cond, body } => write!(f, "while {cond} do ({body})"),
            Stmt::Assert(e) => write!(f, "assert {e}"),
        }
    }
}
