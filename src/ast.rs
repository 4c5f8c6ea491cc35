//! Syntax tree produced by the parser.
//!
//! The tree is owned top-down with no sharing. Its shape is fixed once the
//! parser returns; the only thing later passes write is the `ty` slot on
//! [`Expr`].

use std::fmt;

use crate::tokenizer::Token;
use crate::ty::Type;

/// Source location of a node, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
  pub line: usize,
  pub column: usize,
}

impl From<&Token> for Position {
  fn from(token: &Token) -> Self {
    Self {
      line: token.line,
      column: token.column,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub name: String,
  pub declarations: Vec<Declaration>,
  pub body: Block,
  pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
  Var {
    name: String,
    ty: Type,
    pos: Position,
  },
  Const {
    name: String,
    ty: Type,
    value: Expr,
    pos: Position,
  },
}

impl Declaration {
  pub fn name(&self) -> &str {
    match self {
      Declaration::Var { name, .. } | Declaration::Const { name, .. } => name,
    }
  }

  pub fn ty(&self) -> Type {
    match self {
      Declaration::Var { ty, .. } | Declaration::Const { ty, .. } => *ty,
    }
  }

  pub fn pos(&self) -> Position {
    match self {
      Declaration::Var { pos, .. } | Declaration::Const { pos, .. } => *pos,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
  pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  Assign {
    target: String,
    value: Expr,
    pos: Position,
  },
  If {
    cond: Expr,
    then_block: Block,
    else_block: Option<Block>,
    pos: Position,
  },
  While {
    cond: Expr,
    body: Block,
    pos: Position,
  },
  Read {
    target: String,
    pos: Position,
  },
  Write {
    value: Expr,
    pos: Position,
  },
}

/// Binary operators, tightest-binding tier first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Lt,
  Gt,
  Le,
  Ge,
  Eq,
  Ne,
  And,
  Or,
}

impl BinaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Lt => "<",
      BinaryOp::Gt => ">",
      BinaryOp::Le => "<=",
      BinaryOp::Ge => ">=",
      BinaryOp::Eq => "=",
      BinaryOp::Ne => "!=",
      BinaryOp::And => "&&",
      BinaryOp::Or => "||",
    }
  }
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.symbol())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
}

impl UnaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      UnaryOp::Neg => "-",
      UnaryOp::Not => "!",
    }
  }
}

impl fmt::Display for UnaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.symbol())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
  Int(i64),
  Bool(bool),
  Ident(String),
  Unary {
    op: UnaryOp,
    operand: Box<Expr>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
  pub kind: ExprKind,
  pub pos: Position,
  /// Filled in by semantic analysis.
  pub ty: Option<Type>,
}

impl Expr {
  fn new(kind: ExprKind, pos: Position) -> Self {
    Self {
      kind,
      pos,
      ty: None,
    }
  }

  pub fn int(value: i64, pos: Position) -> Self {
    Self::new(ExprKind::Int(value), pos)
  }

  pub fn bool(value: bool, pos: Position) -> Self {
    Self::new(ExprKind::Bool(value), pos)
  }

  pub fn ident(name: impl Into<String>, pos: Position) -> Self {
    Self::new(ExprKind::Ident(name.into()), pos)
  }

  pub fn unary(op: UnaryOp, operand: Expr, pos: Position) -> Self {
    Self::new(
      ExprKind::Unary {
        op,
        operand: Box::new(operand),
      },
      pos,
    )
  }

  /// Binary nodes take the position of their left operand.
  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
    let pos = lhs.pos;
    Self::new(
      ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
      },
      pos,
    )
  }
}
