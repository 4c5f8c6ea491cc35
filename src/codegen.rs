//! Code generation: lower the checked AST into stack machine text.
//!
//! Every expression leaves exactly one value on the operand stack, so
//! operands are emitted before their operator. Each declared name owns one
//! storage slot, numbered in declaration order from zero. Branch targets are
//! `<prefix>_<n>` with a single counter shared by all constructs.

use std::collections::HashMap;

use tracing::debug;

use crate::Options;
use crate::ast::{BinaryOp, Block, Declaration, Expr, ExprKind, Program, Stmt, UnaryOp};

/// Emit instructions for a program that has passed semantic analysis.
///
/// # Panics
///
/// Panics if the program refers to a name it never declared. Semantic
/// analysis rejects such programs, so this only happens when it was skipped.
pub fn generate(program: &Program) -> String {
  generate_with(program, &Options::default())
}

/// Like [`generate`], with output options.
pub fn generate_with(program: &Program, options: &Options) -> String {
  let mut generator = Generator::default();

  if options.emit_header {
    generator
      .code
      .push_str(&format!("// stack machine code for program {}\n\n", program.name));
  }

  for decl in &program.declarations {
    generator.allocate(decl.name());
  }
  if generator.next_address > 0 {
    generator.emit(&format!("PUSH {}", generator.next_address));
  }

  // Constants are materialised once at start-up, never inlined.
  for decl in &program.declarations {
    if let Declaration::Const { name, value, .. } = decl {
      generator.emit_expr(value);
      generator.emit_store(name);
    }
  }

  generator.emit_block(&program.body);
  generator.emit("HALT");

  debug!(
    slots = generator.next_address,
    labels = generator.label_counter,
    bytes = generator.code.len(),
    "code generation finished"
  );
  generator.code
}

#[derive(Default)]
struct Generator {
  code: String,
  addresses: HashMap<String, usize>,
  next_address: usize,
  label_counter: usize,
}

impl Generator {
  fn emit(&mut self, line: &str) {
    self.code.push_str(line);
    self.code.push('\n');
  }

  fn emit_label(&mut self, label: &str) {
    self.code.push_str(&format!("{label}:\n"));
  }

  fn allocate(&mut self, name: &str) {
    self.addresses.insert(name.to_string(), self.next_address);
    self.next_address += 1;
  }

  fn address(&self, name: &str) -> usize {
    match self.addresses.get(name) {
      Some(address) => *address,
      None => panic!("no storage slot assigned to '{name}'"),
    }
  }

  fn new_label(&mut self, prefix: &str) -> String {
    let label = format!("{prefix}_{}", self.label_counter);
    self.label_counter += 1;
    label
  }

  fn emit_store(&mut self, name: &str) {
    let address = self.address(name);
    self.emit(&format!("STORE {address}"));
  }

  fn emit_block(&mut self, block: &Block) {
    for stmt in &block.statements {
      self.emit_stmt(stmt);
    }
  }

  fn emit_stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Assign { target, value, .. } => {
        self.emit_expr(value);
        self.emit_store(target);
      }
      Stmt::If {
        cond,
        then_block,
        else_block,
        ..
      } => {
        let else_label = self.new_label("else");
        let end_label = self.new_label("endif");

        self.emit_expr(cond);
        self.emit(&format!("JUMPIF(0) {else_label}"));
        self.emit_block(then_block);
        self.emit(&format!("JUMP {end_label}"));

        self.emit_label(&else_label);
        if let Some(else_block) = else_block {
          self.emit_block(else_block);
        }
        self.emit_label(&end_label);
      }
      Stmt::While { cond, body, .. } => {
        let start_label = self.new_label("while");
        let end_label = self.new_label("endwhile");

        self.emit_label(&start_label);
        self.emit_expr(cond);
        self.emit(&format!("JUMPIF(0) {end_label}"));
        self.emit_block(body);
        self.emit(&format!("JUMP {start_label}"));
        self.emit_label(&end_label);
      }
      Stmt::Read { target, .. } => {
        self.emit("GETINT");
        self.emit_store(target);
      }
      Stmt::Write { value, .. } => {
        self.emit_expr(value);
        self.emit("PUTINT");
      }
    }
  }

  /// Emit stack-based code for a single expression node.
  fn emit_expr(&mut self, expr: &Expr) {
    match &expr.kind {
      ExprKind::Int(value) => self.emit(&format!("LOADL {value}")),
      ExprKind::Bool(value) => self.emit(&format!("LOADL {}", i64::from(*value))),
      ExprKind::Ident(name) => {
        let address = self.address(name);
        self.emit(&format!("LOAD {address}"));
      }
      ExprKind::Unary { op, operand } => {
        self.emit_expr(operand);
        self.emit(match op {
          UnaryOp::Neg => "NEG",
          UnaryOp::Not => "NOT",
        });
      }
      ExprKind::Binary { op, lhs, rhs } => {
        self.emit_expr(lhs);
        self.emit_expr(rhs);
        self.emit(mnemonic(*op));
      }
    }
  }
}

fn mnemonic(op: BinaryOp) -> &'static str {
  match op {
    BinaryOp::Add => "ADD",
    BinaryOp::Sub => "SUB",
    BinaryOp::Mul => "MULT",
    BinaryOp::Div => "DIV",
    BinaryOp::Lt => "LSS",
    BinaryOp::Gt => "GTR",
    BinaryOp::Le => "LEQ",
    BinaryOp::Ge => "GEQ",
    BinaryOp::Eq => "EQL",
    BinaryOp::Ne => "NEQ",
    BinaryOp::And => "AND",
    BinaryOp::Or => "OR",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::sema::analyze;
  use crate::tokenizer::tokenize;
  use rstest::rstest;

  fn checked(source: &str) -> Program {
    let mut program = parse(tokenize(source)).unwrap();
    let errors = analyze(&mut program);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    program
  }

  fn lines(source: &str) -> Vec<String> {
    generate(&checked(source))
      .lines()
      .map(str::to_string)
      .collect()
  }

  #[test]
  fn empty_program_only_halts() {
    assert_eq!(lines("program T; begin end;"), ["HALT"]);
  }

  #[test]
  fn assignment_and_write() {
    assert_eq!(
      lines("program T; var x: integer; begin x := 42; write x; end;"),
      ["PUSH 1", "LOADL 42", "STORE 0", "LOAD 0", "PUTINT", "HALT"]
    );
  }

  #[test]
  fn one_slot_per_declaration_in_order() {
    let code = lines("program T; var a, b: integer; var c: boolean; begin read b; c := true; end;");
    assert_eq!(
      code,
      ["PUSH 3", "GETINT", "STORE 1", "LOADL 1", "STORE 2", "HALT"]
    );
  }

  #[test]
  fn constants_are_stored_in_the_prologue() {
    let code = lines(
      "program T; var x: integer; const k: integer = 2 * 3; const f: boolean = false; begin x := k; end;",
    );
    assert_eq!(
      code,
      [
        "PUSH 3", "LOADL 2", "LOADL 3", "MULT", "STORE 1", "LOADL 0", "STORE 2", "LOAD 1",
        "STORE 0", "HALT",
      ]
    );
  }

  #[test]
  fn if_else_layout() {
    let code = lines(
      "program T; var x: integer; begin if x > 0 then write 1; else write 2; end; end;",
    );
    assert_eq!(
      code,
      [
        "PUSH 1",
        "LOAD 0",
        "LOADL 0",
        "GTR",
        "JUMPIF(0) else_0",
        "LOADL 1",
        "PUTINT",
        "JUMP endif_1",
        "else_0:",
        "LOADL 2",
        "PUTINT",
        "endif_1:",
        "HALT",
      ]
    );
  }

  #[test]
  fn if_without_else_still_emits_both_labels() {
    let code = lines("program T; begin if true then write 1; end; end;");
    assert_eq!(
      code,
      [
        "LOADL 1",
        "JUMPIF(0) else_0",
        "LOADL 1",
        "PUTINT",
        "JUMP endif_1",
        "else_0:",
        "endif_1:",
        "HALT",
      ]
    );
  }

  #[test]
  fn while_loop_layout() {
    let code = lines(
      "program T; var x: integer; begin x := 5; while x > 0 do x := x - 1; end; end;",
    );
    assert_eq!(
      code,
      [
        "PUSH 1",
        "LOADL 5",
        "STORE 0",
        "while_0:",
        "LOAD 0",
        "LOADL 0",
        "GTR",
        "JUMPIF(0) endwhile_1",
        "LOAD 0",
        "LOADL 1",
        "SUB",
        "STORE 0",
        "JUMP while_0",
        "endwhile_1:",
        "HALT",
      ]
    );
  }

  #[test]
  fn nested_labels_are_unique() {
    let code = lines(
      "program T; var i: integer;
       begin
         while i < 3 do
           if i = 1 then write i; end;
           while false do end;
           i := i + 1;
         end;
         if true then end;
       end;",
    );
    let labels: Vec<_> = code.iter().filter(|l| l.ends_with(':')).collect();
    assert_eq!(labels.len(), 8);
    let mut unique = labels.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), labels.len());
  }

  #[rstest]
  #[case::add("i + j", "ADD")]
  #[case::sub("i - j", "SUB")]
  #[case::mul("i * j", "MULT")]
  #[case::div("i / j", "DIV")]
  #[case::lss("i < j", "LSS")]
  #[case::gtr("i > j", "GTR")]
  #[case::leq("i <= j", "LEQ")]
  #[case::geq("i >= j", "GEQ")]
  #[case::eql("i = j", "EQL")]
  #[case::neq("i != j", "NEQ")]
  #[case::and("p && q", "AND")]
  #[case::or("p || q", "OR")]
  fn binary_operators_follow_operands(#[case] expr: &str, #[case] expected: &str) {
    let code = lines(&format!(
      "program T; var i, j: integer; var p, q: boolean; begin write {expr}; end;"
    ));
    assert!(code[1].starts_with("LOAD "));
    assert!(code[2].starts_with("LOAD "));
    assert_eq!(code[3], expected);
    assert_eq!(code[4], "PUTINT");
  }

  #[rstest]
  #[case::neg("-i", ["LOAD 0", "NEG"])]
  #[case::not("!p", ["LOAD 1", "NOT"])]
  fn unary_operators(#[case] expr: &str, #[case] expected: [&str; 2]) {
    let code = lines(&format!(
      "program T; var i: integer; var p: boolean; begin write {expr}; end;"
    ));
    assert_eq!(code[1..3], expected);
  }

  #[test]
  fn generation_is_repeatable() {
    let program = checked(
      "program T; var x: integer; begin while x < 2 do if x = 0 then x := 1; else x := 2; end; end; end;",
    );
    assert_eq!(generate(&program), generate(&program));
  }

  #[test]
  fn header_is_opt_in() {
    let program = checked("program Demo; begin end;");
    let options = Options { emit_header: true };
    assert_eq!(
      generate_with(&program, &options),
      "// stack machine code for program Demo\n\nHALT\n"
    );
    assert_eq!(generate(&program), "HALT\n");
  }

  #[test]
  #[should_panic(expected = "no storage slot assigned to 'ghost'")]
  fn unchecked_program_with_unknown_name_panics() {
    let program = parse(tokenize("program T; begin write ghost; end;")).unwrap();
    generate(&program);
  }
}
