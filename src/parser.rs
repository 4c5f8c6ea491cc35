//! Recursive-descent parser producing a [`Program`] tree.
//!
//! One function per grammar rule. Binary operators are parsed tier by tier,
//! lowest precedence outermost, each tier folding its operands to the left:
//!
//! ```text
//! program        := 'program' ident ';' declaration* 'begin' block 'end' ';'
//! declaration    := varDecl | constDecl
//! varDecl        := 'var' ident (',' ident)* ':' type ';'
//! constDecl      := 'const' ident ':' type '=' expression ';'
//! block          := statement*
//! statement      := assignment | if | while | read | write
//! expression     := or
//! or             := and ('||' and)*
//! and            := equality ('&&' equality)*
//! equality       := relational (('=' | '!=') relational)*
//! relational     := additive (('<' | '>' | '<=' | '>=') additive)*
//! additive       := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/') unary)*
//! unary          := ('!' | '-') unary | primary
//! primary        := int | bool | ident | '(' expression ')'
//! ```
//!
//! The first unexpected token aborts the parse.

use crate::ast::{BinaryOp, Block, Declaration, Expr, Position, Program, Stmt, UnaryOp};
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Literal, Token, TokenKind, describe_token};
use crate::ty::Type;

/// Parse a whole program from the token stream.
pub fn parse(tokens: Vec<Token>) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens);
  let program = parse_program(&mut stream)?;

  if !stream.is_eof() {
    return Err(stream.error("end of input after the program"));
  }

  Ok(program)
}

fn parse_program(stream: &mut TokenStream) -> CompileResult<Program> {
  let pos: Position = stream.skip(TokenKind::Program, "'program'")?.into();
  let name = stream.get_ident("program name")?.0;
  stream.skip(TokenKind::Semicolon, "';' after program name")?;

  let mut declarations = Vec::new();
  loop {
    match stream.peek_kind() {
      TokenKind::Var => declarations.extend(parse_var_decl(stream)?),
      TokenKind::Const => declarations.push(parse_const_decl(stream)?),
      _ => break,
    }
  }

  stream.skip(TokenKind::Begin, "'begin'")?;
  let body = parse_block(stream)?;
  stream.skip(TokenKind::End, "'end'")?;
  stream.skip(TokenKind::Semicolon, "';' after 'end'")?;

  Ok(Program {
    name,
    declarations,
    body,
    pos,
  })
}

/// `var a, b, c : integer;` yields one declaration per name.
fn parse_var_decl(stream: &mut TokenStream) -> CompileResult<Vec<Declaration>> {
  stream.skip(TokenKind::Var, "'var'")?;

  let mut names = vec![stream.get_ident("variable name")?];
  while stream.equal(TokenKind::Comma) {
    names.push(stream.get_ident("variable name")?);
  }

  stream.skip(TokenKind::Colon, "':' after variable name(s)")?;
  let ty = parse_type(stream)?;
  stream.skip(TokenKind::Semicolon, "';' after variable declaration")?;

  Ok(
    names
      .into_iter()
      .map(|(name, pos)| Declaration::Var { name, ty, pos })
      .collect(),
  )
}

fn parse_const_decl(stream: &mut TokenStream) -> CompileResult<Declaration> {
  stream.skip(TokenKind::Const, "'const'")?;
  let (name, pos) = stream.get_ident("constant name")?;
  stream.skip(TokenKind::Colon, "':' after constant name")?;
  let ty = parse_type(stream)?;
  stream.skip(TokenKind::Equal, "'=' after type")?;
  let value = parse_expr(stream)?;
  stream.skip(TokenKind::Semicolon, "';' after constant declaration")?;

  Ok(Declaration::Const {
    name,
    ty,
    value,
    pos,
  })
}

fn parse_type(stream: &mut TokenStream) -> CompileResult<Type> {
  let ty = match stream.peek_kind() {
    TokenKind::Integer => Type::Integer,
    TokenKind::Boolean => Type::Boolean,
    _ => return Err(stream.error("type name")),
  };
  stream.advance();
  Ok(ty)
}

/// Statements up to (not including) the `end` or `else` that closes the block.
fn parse_block(stream: &mut TokenStream) -> CompileResult<Block> {
  let mut statements = Vec::new();
  while !matches!(
    stream.peek_kind(),
    TokenKind::End | TokenKind::Else | TokenKind::Eof
  ) {
    statements.push(parse_stmt(stream)?);
  }
  Ok(Block { statements })
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  match stream.peek_kind() {
    TokenKind::Ident => parse_assign(stream),
    TokenKind::If => parse_if(stream),
    TokenKind::While => parse_while(stream),
    TokenKind::Read => parse_read(stream),
    TokenKind::Write => parse_write(stream),
    _ => Err(stream.error("a statement")),
  }
}

fn parse_assign(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let (target, pos) = stream.get_ident("variable name")?;
  stream.skip(TokenKind::Assign, "':=' in assignment")?;
  let value = parse_expr(stream)?;
  stream.skip(TokenKind::Semicolon, "';' after assignment")?;
  Ok(Stmt::Assign { target, value, pos })
}

fn parse_if(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let pos: Position = stream.skip(TokenKind::If, "'if'")?.into();
  let cond = parse_expr(stream)?;
  stream.skip(TokenKind::Then, "'then'")?;
  let then_block = parse_block(stream)?;

  let else_block = if stream.equal(TokenKind::Else) {
    Some(parse_block(stream)?)
  } else {
    None
  };

  stream.skip(TokenKind::End, "'end' after if statement")?;
  stream.skip(TokenKind::Semicolon, "';' after if statement")?;

  Ok(Stmt::If {
    cond,
    then_block,
    else_block,
    pos,
  })
}

fn parse_while(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let pos: Position = stream.skip(TokenKind::While, "'while'")?.into();
  let cond = parse_expr(stream)?;
  stream.skip(TokenKind::Do, "'do'")?;
  let body = parse_block(stream)?;
  stream.skip(TokenKind::End, "'end' after while statement")?;
  stream.skip(TokenKind::Semicolon, "';' after while statement")?;
  Ok(Stmt::While { cond, body, pos })
}

fn parse_read(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let pos: Position = stream.skip(TokenKind::Read, "'read'")?.into();
  let target = stream.get_ident("variable name")?.0;
  stream.skip(TokenKind::Semicolon, "';' after read statement")?;
  Ok(Stmt::Read { target, pos })
}

fn parse_write(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let pos: Position = stream.skip(TokenKind::Write, "'write'")?.into();
  let value = parse_expr(stream)?;
  stream.skip(TokenKind::Semicolon, "';' after write statement")?;
  Ok(Stmt::Write { value, pos })
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<Expr> {
  parse_or(stream)
}

fn parse_or(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_and(stream)?;

  while stream.equal(TokenKind::OrOr) {
    let rhs = parse_and(stream)?;
    node = Expr::binary(BinaryOp::Or, node, rhs);
  }

  Ok(node)
}

fn parse_and(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_equality(stream)?;

  while stream.equal(TokenKind::AndAnd) {
    let rhs = parse_equality(stream)?;
    node = Expr::binary(BinaryOp::And, node, rhs);
  }

  Ok(node)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_relational(stream)?;

  loop {
    let op = match stream.peek_kind() {
      TokenKind::Equal => BinaryOp::Eq,
      TokenKind::NotEqual => BinaryOp::Ne,
      _ => break,
    };

    stream.advance();
    let rhs = parse_relational(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_additive(stream)?;

  loop {
    let op = match stream.peek_kind() {
      TokenKind::Less => BinaryOp::Lt,
      TokenKind::Greater => BinaryOp::Gt,
      TokenKind::LessEqual => BinaryOp::Le,
      TokenKind::GreaterEqual => BinaryOp::Ge,
      _ => break,
    };

    stream.advance();
    let rhs = parse_additive(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_additive(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_multiplicative(stream)?;

  loop {
    let op = match stream.peek_kind() {
      TokenKind::Plus => BinaryOp::Add,
      TokenKind::Minus => BinaryOp::Sub,
      _ => break,
    };

    stream.advance();
    let rhs = parse_multiplicative(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_multiplicative(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_unary(stream)?;

  loop {
    let op = match stream.peek_kind() {
      TokenKind::Star => BinaryOp::Mul,
      TokenKind::Slash => BinaryOp::Div,
      _ => break,
    };

    stream.advance();
    let rhs = parse_unary(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<Expr> {
  let op = match stream.peek_kind() {
    TokenKind::Bang => UnaryOp::Not,
    TokenKind::Minus => UnaryOp::Neg,
    _ => return parse_primary(stream),
  };

  let pos = stream.position();
  stream.advance();
  let operand = parse_unary(stream)?;
  Ok(Expr::unary(op, operand, pos))
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<Expr> {
  let pos = stream.position();

  match stream.peek_kind() {
    TokenKind::IntLiteral => {
      let (value, pos) = stream.get_number()?;
      Ok(Expr::int(value, pos))
    }
    TokenKind::BoolLiteral => {
      let value = matches!(stream.advance().and_then(|t| t.value), Some(Literal::Bool(true)));
      Ok(Expr::bool(value, pos))
    }
    TokenKind::Ident => {
      let (name, pos) = stream.get_ident("identifier")?;
      Ok(Expr::ident(name, pos))
    }
    TokenKind::LeftParen => {
      stream.advance();
      let node = parse_expr(stream)?;
      stream.skip(TokenKind::RightParen, "')' after expression")?;
      Ok(node)
    }
    _ => Err(stream.error("an expression")),
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream {
  tokens: Vec<Token>,
  pos: usize,
}

impl TokenStream {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>) -> Self {
    Self { tokens, pos: 0 }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// Kind of the current token; a missing token reads as end of input.
  fn peek_kind(&self) -> TokenKind {
    self.peek().map_or(TokenKind::Eof, |token| token.kind)
  }

  fn position(&self) -> Position {
    self
      .peek()
      .or_else(|| self.tokens.last())
      .map(Position::from)
      .unwrap_or_default()
  }

  /// Step past the current token and return it. The end-of-input marker is
  /// never consumed.
  fn advance(&mut self) -> Option<&Token> {
    if self.is_eof() {
      return None;
    }
    self.pos += 1;
    self.tokens.get(self.pos - 1)
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> bool {
    if self.peek_kind() == kind && !self.is_eof() {
      self.pos += 1;
      return true;
    }
    false
  }

  /// Consume a token of the given kind or fail naming what was expected.
  fn skip(&mut self, kind: TokenKind, expected: &str) -> CompileResult<&Token> {
    if self.peek_kind() != kind || self.is_eof() {
      return Err(self.error(expected));
    }
    self.pos += 1;
    Ok(&self.tokens[self.pos - 1])
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i64, Position)> {
    let pos = self.position();
    let Some(token) = self.peek().filter(|t| t.kind == TokenKind::IntLiteral) else {
      return Err(self.error("a number"));
    };
    let Some(Literal::Int(value)) = token.value else {
      return Err(CompileError::at(
        pos,
        format!("integer literal {} out of range", token.lexeme),
      ));
    };
    self.pos += 1;
    Ok((value, pos))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self, expected: &str) -> CompileResult<(String, Position)> {
    match self.peek() {
      Some(token) if token.kind == TokenKind::Ident => {
        let ident = (token.lexeme.clone(), Position::from(token));
        self.pos += 1;
        Ok(ident)
      }
      _ => Err(self.error(expected)),
    }
  }

  fn is_eof(&self) -> bool {
    self.peek_kind() == TokenKind::Eof
  }

  /// Error at the current token: `expected <what>, but got "<lexeme>"`.
  fn error(&self, expected: &str) -> CompileError {
    let token = self.peek();
    let got = describe_token(token);
    let message = match token {
      Some(token) if token.kind == TokenKind::Unknown => {
        format!("expected {expected}, but got unrecognized character \"{got}\"")
      }
      _ => format!("expected {expected}, but got \"{got}\""),
    };
    CompileError::at(self.position(), message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::ExprKind;
  use crate::tokenizer::tokenize;
  use rstest::rstest;

  fn parse_source(source: &str) -> CompileResult<Program> {
    parse(tokenize(source))
  }

  /// Parse `expr` as the right-hand side of an assignment.
  fn parse_rhs(expr: &str) -> Expr {
    let source = format!("program T; begin x := {expr}; end;");
    let program = parse_source(&source).unwrap();
    match program.body.statements.into_iter().next() {
      Some(Stmt::Assign { value, .. }) => value,
      other => panic!("expected assignment, got {other:?}"),
    }
  }

  /// Fully parenthesised rendering, handy for checking shape.
  fn show(expr: &Expr) -> String {
    match &expr.kind {
      ExprKind::Int(v) => v.to_string(),
      ExprKind::Bool(b) => b.to_string(),
      ExprKind::Ident(name) => name.clone(),
      ExprKind::Unary { op, operand } => format!("({op}{})", show(operand)),
      ExprKind::Binary { op, lhs, rhs } => format!("({} {op} {})", show(lhs), show(rhs)),
    }
  }

  #[test]
  fn empty_program() {
    let program = parse_source("program T; begin end;").unwrap();
    assert_eq!(program.name, "T");
    assert!(program.declarations.is_empty());
    assert!(program.body.statements.is_empty());
  }

  #[test]
  fn shared_type_declaration_expands_per_name() {
    let program = parse_source("program T; var x, y, z: boolean; begin end;").unwrap();
    let names: Vec<_> = program.declarations.iter().map(|d| d.name()).collect();
    assert_eq!(names, ["x", "y", "z"]);
    assert!(program.declarations.iter().all(|d| d.ty() == Type::Boolean));
  }

  #[test]
  fn constant_declaration_keeps_initializer() {
    let program = parse_source("program T; const max: integer = 10 * 2; begin end;").unwrap();
    match &program.declarations[0] {
      Declaration::Const { name, ty, value, .. } => {
        assert_eq!(name, "max");
        assert_eq!(*ty, Type::Integer);
        assert_eq!(show(value), "(10 * 2)");
      }
      other => panic!("expected constant, got {other:?}"),
    }
  }

  #[rstest]
  #[case::mul_over_add("1 + 2 * 3", "(1 + (2 * 3))")]
  #[case::left_assoc_sub("a - b - c", "((a - b) - c)")]
  #[case::left_assoc_div("a / b / c", "((a / b) / c)")]
  #[case::parens("(1 + 2) * 3", "((1 + 2) * 3)")]
  #[case::relational_over_equality("a < b = c > d", "((a < b) = (c > d))")]
  #[case::and_over_or("a || b && c", "(a || (b && c))")]
  #[case::equality_over_and("a = b && c != d", "((a = b) && (c != d))")]
  #[case::unary_binds_tightest("-a * !b", "((-a) * (!b))")]
  #[case::nested_unary("!!true", "(!(!true))")]
  #[case::double_negation("--1", "(-(-1))")]
  fn precedence(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(show(&parse_rhs(source)), expected);
  }

  #[test]
  fn if_with_else_and_while() {
    let program = parse_source(
      "program T; var x: integer;
       begin
         if x > 0 then write x; else x := 1; end;
         while x < 10 do x := x + 1; end;
       end;",
    )
    .unwrap();
    let statements = &program.body.statements;
    assert_eq!(statements.len(), 2);
    match &statements[0] {
      Stmt::If {
        then_block,
        else_block: Some(else_block),
        ..
      } => {
        assert_eq!(then_block.statements.len(), 1);
        assert_eq!(else_block.statements.len(), 1);
      }
      other => panic!("expected if/else, got {other:?}"),
    }
    assert!(matches!(&statements[1], Stmt::While { body, .. } if body.statements.len() == 1));
  }

  #[test]
  fn if_without_else() {
    let program = parse_source("program T; begin if true then end; end;").unwrap();
    assert!(matches!(
      &program.body.statements[0],
      Stmt::If { else_block: None, .. }
    ));
  }

  #[test]
  fn statement_positions() {
    let program = parse_source("program T;\nbegin\n  read x;\nend;").unwrap();
    match &program.body.statements[0] {
      Stmt::Read { target, pos } => {
        assert_eq!(target, "x");
        assert_eq!(*pos, Position { line: 3, column: 3 });
      }
      other => panic!("expected read, got {other:?}"),
    }
  }

  #[rstest]
  #[case::missing_semicolon("program T begin end;", 1, "expected ';' after program name, but got \"begin\"")]
  #[case::missing_program("begin end;", 1, "expected 'program', but got \"begin\"")]
  #[case::bad_type("program T; var x: real; begin end;", 1, "expected type name, but got \"real\"")]
  #[case::missing_end("program T; begin write 1;", 1, "expected 'end', but got \"end of input\"")]
  #[case::bad_statement("program T;\nbegin\n  1 := x;\nend;", 3, "expected a statement, but got \"1\"")]
  #[case::missing_operand("program T; begin write 1 + ; end;", 1, "expected an expression, but got \";\"")]
  #[case::unknown_char("program T; begin write a & b; end;", 1, "expected ';' after write statement, but got unrecognized character \"&\"")]
  #[case::trailing_tokens("program T; begin end; write", 1, "expected end of input after the program, but got \"write\"")]
  #[case::overflow("program T; begin write 99999999999999999999; end;", 1, "integer literal 99999999999999999999 out of range")]
  fn syntax_errors(#[case] source: &str, #[case] line: usize, #[case] expected: &str) {
    match parse_source(source) {
      Err(CompileError::Syntax {
        line: got_line,
        message,
        ..
      }) => {
        assert_eq!(got_line, line);
        assert_eq!(message, expected);
      }
      other => panic!("expected a syntax error, got {other:?}"),
    }
  }

  #[test]
  fn empty_token_stream_is_an_error() {
    assert!(parse(Vec::new()).is_err());
  }
}
