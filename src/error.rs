//! Shared error types used across the compilation pipeline.
//!
//! Parsing stops at the first problem and reports it as
//! [`CompileError::Syntax`]. Semantic analysis keeps going and hands back
//! every [`SemanticError`] it found, which the pipeline wraps in
//! [`CompileError::Semantic`].

use snafu::Snafu;

use crate::ast::{BinaryOp, Position, UnaryOp};
use crate::ty::Type;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("line {line}, column {column}: {message}"))]
  Syntax {
    line: usize,
    column: usize,
    message: String,
  },

  #[snafu(display("{} semantic error(s):\n{}", errors.len(), list(errors)))]
  Semantic { errors: Vec<SemanticError> },
}

impl CompileError {
  /// Construct a syntax error anchored at a source position.
  pub fn at(pos: Position, message: impl Into<String>) -> Self {
    SyntaxSnafu {
      line: pos.line,
      column: pos.column,
      message,
    }
    .build()
  }

  /// Format the error for a terminal, pointing at the offending column with a
  /// caret when the error has a single location.
  pub fn render(&self, source: &str) -> String {
    match self {
      CompileError::Syntax {
        line,
        column,
        message,
      } => {
        let text = source.lines().nth(line.saturating_sub(1)).unwrap_or("");
        let marker = format!("{}^", " ".repeat(column.saturating_sub(1)));
        format!("error: line {line}: {message}\n{text}\n{marker}")
      }
      CompileError::Semantic { errors } => errors
        .iter()
        .map(|e| format!("error: line {}: {e}", e.line()))
        .collect::<Vec<_>>()
        .join("\n"),
    }
  }
}

fn list(errors: &[SemanticError]) -> String {
  errors
    .iter()
    .map(|e| format!("  line {}: {e}", e.line()))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Operand requirement of a binary operator, used in diagnostics.
fn operand_rule(op: BinaryOp) -> (&'static str, &'static str) {
  match op {
    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
      ("Arithmetic", "integer operands")
    }
    BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => ("Relational", "integer operands"),
    BinaryOp::Eq | BinaryOp::Ne => ("Equality", "same type operands"),
    BinaryOp::And | BinaryOp::Or => ("Logical", "boolean operands"),
  }
}

fn unary_rule(op: UnaryOp) -> &'static str {
  match op {
    UnaryOp::Neg => "Unary minus requires integer operand",
    UnaryOp::Not => "Logical not requires boolean operand",
  }
}

/// One violated semantic rule.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SemanticError {
  #[snafu(display("Variable '{name}' is already declared"))]
  DuplicateDeclaration { name: String, line: usize },

  #[snafu(display("Variable '{name}' is not declared"))]
  Undeclared { name: String, line: usize },

  #[snafu(display("Type mismatch in assignment to '{name}': expected {expected}, got {found}"))]
  AssignmentMismatch {
    name: String,
    expected: Type,
    found: Type,
    line: usize,
  },

  #[snafu(display("Type mismatch in constant '{name}': expected {expected}, got {found}"))]
  ConstantMismatch {
    name: String,
    expected: Type,
    found: Type,
    line: usize,
  },

  #[snafu(display("{construct} condition must be boolean, got {found}"))]
  ConditionNotBoolean {
    construct: &'static str,
    found: Type,
    line: usize,
  },

  #[snafu(display(
    "{} operators require {}, got {left} and {right} (operator '{op}')",
    operand_rule(*op).0,
    operand_rule(*op).1
  ))]
  BinaryOperands {
    op: BinaryOp,
    left: Type,
    right: Type,
    line: usize,
  },

  #[snafu(display("{}, got {operand}", unary_rule(*op)))]
  UnaryOperand {
    op: UnaryOp,
    operand: Type,
    line: usize,
  },
}

impl SemanticError {
  pub fn line(&self) -> usize {
    match self {
      SemanticError::DuplicateDeclaration { line, .. }
      | SemanticError::Undeclared { line, .. }
      | SemanticError::AssignmentMismatch { line, .. }
      | SemanticError::ConstantMismatch { line, .. }
      | SemanticError::ConditionNotBoolean { line, .. }
      | SemanticError::BinaryOperands { line, .. }
      | SemanticError::UnaryOperand { line, .. } => *line,
    }
  }
}
