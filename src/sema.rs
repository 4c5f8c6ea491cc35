//! Semantic analysis: name resolution and type checking.
//!
//! The analyzer never stops at the first problem. It records every violated
//! rule and keeps walking, writing the resolved type of each expression into
//! its `ty` slot as it goes. An expression that breaks a rule resolves to
//! [`Type::Error`], which then satisfies no further constraint, so one
//! mistake may be reported again by the expressions that contain it.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{BinaryOp, Block, Declaration, Expr, ExprKind, Program, Stmt, UnaryOp};
use crate::error::{
  AssignmentMismatchSnafu, BinaryOperandsSnafu, ConditionNotBooleanSnafu, ConstantMismatchSnafu,
  DuplicateDeclarationSnafu, SemanticError, UnaryOperandSnafu, UndeclaredSnafu,
};
use crate::ty::Type;

/// Flat name to type mapping; the language has a single scope.
#[derive(Debug, Default)]
pub struct SymbolTable {
  symbols: HashMap<String, Type>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bind `name` unless it is already bound, in which case the existing
  /// binding is kept and its type returned as the error.
  pub fn declare(&mut self, name: &str, ty: Type) -> Result<(), Type> {
    if let Some(existing) = self.symbols.get(name) {
      return Err(*existing);
    }
    self.symbols.insert(name.to_string(), ty);
    Ok(())
  }

  pub fn lookup(&self, name: &str) -> Option<Type> {
    self.symbols.get(name).copied()
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }
}

/// Check `program`, annotating every expression with its resolved type.
/// An empty result means the program is well typed.
pub fn analyze(program: &mut Program) -> Vec<SemanticError> {
  let mut analyzer = Analyzer::default();

  for decl in &mut program.declarations {
    analyzer.declare(decl);
  }
  analyzer.visit_block(&mut program.body);

  debug!(
    symbols = analyzer.symbols.len(),
    errors = analyzer.errors.len(),
    "semantic analysis finished"
  );
  analyzer.errors
}

#[derive(Default)]
struct Analyzer {
  symbols: SymbolTable,
  errors: Vec<SemanticError>,
}

impl Analyzer {
  fn declare(&mut self, decl: &mut Declaration) {
    let line = decl.pos().line;

    // Constant initializers only see the names declared before them.
    if let Declaration::Const {
      name, ty, value, ..
    } = decl
    {
      let found = self.resolve(value);
      if found != *ty {
        self.errors.push(
          ConstantMismatchSnafu {
            name: name.as_str(),
            expected: *ty,
            found,
            line,
          }
          .build(),
        );
      }
    }

    if self.symbols.declare(decl.name(), decl.ty()).is_err() {
      self.errors.push(
        DuplicateDeclarationSnafu {
          name: decl.name(),
          line,
        }
        .build(),
      );
    }
  }

  fn visit_block(&mut self, block: &mut Block) {
    for stmt in &mut block.statements {
      self.visit_stmt(stmt);
    }
  }

  fn visit_stmt(&mut self, stmt: &mut Stmt) {
    match stmt {
      Stmt::Assign { target, value, pos } => {
        let found = self.resolve(value);
        match self.symbols.lookup(target) {
          None => self.undeclared(target, pos.line),
          Some(expected) if expected != found => self.errors.push(
            AssignmentMismatchSnafu {
              name: target.as_str(),
              expected,
              found,
              line: pos.line,
            }
            .build(),
          ),
          Some(_) => {}
        }
      }
      Stmt::If {
        cond,
        then_block,
        else_block,
        pos,
      } => {
        self.check_condition("If", cond, pos.line);
        self.visit_block(then_block);
        if let Some(else_block) = else_block {
          self.visit_block(else_block);
        }
      }
      Stmt::While { cond, body, pos } => {
        self.check_condition("While", cond, pos.line);
        self.visit_block(body);
      }
      Stmt::Read { target, pos } => {
        if self.symbols.lookup(target).is_none() {
          self.undeclared(target, pos.line);
        }
      }
      Stmt::Write { value, .. } => {
        self.resolve(value);
      }
    }
  }

  fn check_condition(&mut self, construct: &'static str, cond: &mut Expr, line: usize) {
    let found = self.resolve(cond);
    if !found.is_boolean() {
      self.errors.push(
        ConditionNotBooleanSnafu {
          construct,
          found,
          line,
        }
        .build(),
      );
    }
  }

  fn undeclared(&mut self, name: &str, line: usize) {
    self.errors.push(UndeclaredSnafu { name, line }.build());
  }

  /// Resolve the type of `expr` bottom-up and record it on the node.
  fn resolve(&mut self, expr: &mut Expr) -> Type {
    let line = expr.pos.line;

    let ty = match &mut expr.kind {
      ExprKind::Int(_) => Type::Integer,
      ExprKind::Bool(_) => Type::Boolean,
      ExprKind::Ident(name) => match self.symbols.lookup(name) {
        Some(ty) => ty,
        None => {
          self.undeclared(name, line);
          Type::Error
        }
      },
      ExprKind::Unary { op, operand } => {
        let op = *op;
        let operand = self.resolve(operand);
        let result = match op {
          UnaryOp::Neg => operand.is_integer().then_some(Type::Integer),
          UnaryOp::Not => operand.is_boolean().then_some(Type::Boolean),
        };
        result.unwrap_or_else(|| {
          self
            .errors
            .push(UnaryOperandSnafu { op, operand, line }.build());
          Type::Error
        })
      }
      ExprKind::Binary { op, lhs, rhs } => {
        let op = *op;
        let left = self.resolve(lhs);
        let right = self.resolve(rhs);
        let result = match op {
          BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            (left.is_integer() && right.is_integer()).then_some(Type::Integer)
          }
          BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            (left.is_integer() && right.is_integer()).then_some(Type::Boolean)
          }
          BinaryOp::Eq | BinaryOp::Ne => (left == right).then_some(Type::Boolean),
          BinaryOp::And | BinaryOp::Or => {
            (left.is_boolean() && right.is_boolean()).then_some(Type::Boolean)
          }
        };
        result.unwrap_or_else(|| {
          self.errors.push(
            BinaryOperandsSnafu {
              op,
              left,
              right,
              line,
            }
            .build(),
          );
          Type::Error
        })
      }
    };

    expr.ty = Some(ty);
    ty
  }
}
