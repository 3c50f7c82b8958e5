use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use compact_str::CompactString;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::{arena::TokenId, number::Number};

pub type Args = SmallVec<[Rc<Node>; 4]>;

/// An expression tree node, tied to the token it was parsed from.
///
/// Nodes are immutable once the parser returns; the token arena outlives the
/// tree and is consulted only for error spans.
#[derive(PartialEq, Debug, Clone)]
pub struct Node {
    pub token_id: TokenId,
    pub expr: Rc<Expr>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Ident {
    pub name: CompactString,
}

impl Ident {
    pub fn new(name: &str) -> Self {
        Self {
            name: CompactString::from(name),
        }
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum UnaryOp {
    Negate,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    NullCoalesce,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Lte => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Gte => write!(f, ">="),
            BinaryOp::NullCoalesce => write!(f, "??"),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expr {
    Number(Number),
    Ident(Ident),
    /// Member reference `lhs.member`. Auto-invoked when the member is a
    /// zero-argument callable, so `q.name` and `q.name()` are equivalent.
    Access(Rc<Node>, Ident),
    /// Invocation `lhs.member(args...)`; the callee node is always an
    /// [`Expr::Access`] by construction.
    Call(Rc<Node>, Args),
    Unary(UnaryOp, Rc<Node>),
    Binary(BinaryOp, Rc<Node>, Rc<Node>),
    Ternary {
        cond: Rc<Node>,
        then: Rc<Node>,
        otherwise: Rc<Node>,
    },
}

// Canonical printer. Binary and ternary expressions are always
// parenthesized, which keeps the output re-parseable without tracking
// precedence.
impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &*self.expr {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Ident(ident) => write!(f, "{}", ident),
            Expr::Access(lhs, member) => write!(f, "{}.{}", lhs, member),
            Expr::Call(access, args) => {
                write!(f, "{}({})", access, args.iter().join(", "))
            }
            Expr::Unary(UnaryOp::Negate, rhs) => write!(f, "-{}", rhs),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => write!(f, "({} ? {} : {})", cond, then, otherwise),
        }
    }
}
